//! Statement objects handed out by `prepare` and `query`.
//!
//! The heavy lifting (describe, fetch, row conversion) belongs to the
//! native statement layer. This type carries what that layer needs from
//! the adapter core: the parsed native handle, the generated placeholder
//! order, the effective options, and the autocommit state in force at
//! execution time.
//!
//! A statement holds a mutable borrow of its connection, so at most one
//! statement drives a connection at a time. The borrow ends when the
//! statement is dropped or closed.

use std::fmt;

use crate::connection::{Connection, Options};
use crate::error::{Error, Result};
use crate::native::{NativeConnection, NativeDriver, NativeStatement, Value};

/// A prepared statement bound to a [`Connection`].
pub struct Statement<'conn, D: NativeDriver> {
    /// Owning connection, borrowed for the statement's lifetime.
    conn: &'conn mut Connection<D>,
    /// Parsed native statement handle.
    stmt: <D::Conn as NativeConnection>::Stmt,
    /// Generated placeholder names, in positional order.
    names: Vec<String>,
    /// Effective options this statement was prepared with.
    options: Options,
}

impl<'conn, D: NativeDriver> fmt::Debug for Statement<'conn, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("names", &self.names)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'conn, D: NativeDriver> Statement<'conn, D> {
    /// Called by `Connection::prepare`.
    pub(crate) fn new(
        conn: &'conn mut Connection<D>,
        stmt: <D::Conn as NativeConnection>::Stmt,
        names: Vec<String>,
        options: Options,
    ) -> Self {
        Self {
            conn,
            stmt,
            names,
            options,
        }
    }

    /// Generated placeholder names (no leading colon), in positional order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Number of positional placeholders in the statement.
    pub fn param_count(&self) -> usize {
        self.names.len()
    }

    /// Effective options this statement was prepared with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Bind a value to a positional placeholder.
    ///
    /// `index` is 1-based and addresses placeholders in their original
    /// occurrence order; the generated name is resolved internally.
    pub fn bind_value(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 || index > self.names.len() {
            return Err(Error::Bind {
                index,
                count: self.names.len(),
            });
        }
        let name = self.names[index - 1].clone();
        self.bind_by_name(&name, value)
    }

    /// Bind a value to a named placeholder. A leading colon is accepted
    /// and stripped.
    pub fn bind_by_name(&mut self, name: &str, value: Value) -> Result<()> {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.stmt.bind_by_name(name, value).map_err(Error::native)
    }

    /// Execute the statement and report the affected-row count.
    ///
    /// While the owning connection is inside an emulated transaction the
    /// native per-call commit is suppressed; the work stays pending until
    /// the connection commits or rolls back.
    pub fn execute(&mut self) -> Result<u64> {
        let commit_on_success = self.conn.autocommit();
        self.stmt
            .execute(commit_on_success)
            .map_err(Error::native)?;
        Ok(self.stmt.row_count())
    }

    /// Rows affected by the last execution.
    pub fn row_count(&self) -> u64 {
        self.stmt.row_count()
    }

    /// Release the statement through the native free primitive and end the
    /// borrow of the connection.
    ///
    /// Dropping the statement instead releases the handle through its own
    /// destructor; `close` is for native layers that distinguish the two.
    pub fn close(self) {
        let Statement { conn, stmt, .. } = self;
        conn.native_mut().free_statement(stmt);
    }
}
