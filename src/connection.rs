//! Connection manager: the generic-interface surface over a native driver.
//!
//! [`Connection`] owns one native session handle and layers on top of it
//! everything the native convention lacks: DSN-to-descriptor translation at
//! construction, positional-placeholder rewriting before parse, an emulated
//! transaction state machine (the native layer has no explicit begin), and
//! normalization of connection-level diagnostics into the two-level
//! state-code contract.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dsn::{DsnLookup, DsnParams};
use crate::error::{Error, ErrorInfo, Result};
use crate::native::{ConnectSpec, DescriptorKind, NativeConnection, NativeDriver};
use crate::sql;
use crate::statement::Statement;

// Attribute keys of the generic interface. The numeric values are part of
// the caller-side contract and must not change.
pub const ATTR_AUTOCOMMIT: u32 = 0;
pub const ATTR_PREFETCH: u32 = 1;
pub const ATTR_TIMEOUT: u32 = 2;
pub const ATTR_ERRMODE: u32 = 3;
pub const ATTR_SERVER_VERSION: u32 = 4;
pub const ATTR_CLIENT_VERSION: u32 = 5;
pub const ATTR_SERVER_INFO: u32 = 6;
pub const ATTR_CONNECTION_STATUS: u32 = 7;
pub const ATTR_CASE: u32 = 8;
pub const ATTR_CURSOR_NAME: u32 = 9;
pub const ATTR_CURSOR: u32 = 10;
pub const ATTR_ORACLE_NULLS: u32 = 11;
pub const ATTR_PERSISTENT: u32 = 12;

/// Extra DSN parameter keys the connection recognizes.
const DSN_WHITELIST: &[&str] = &["charset"];

/// Value stored under an attribute key or statement option.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
}

impl AttrValue {
    /// Read the value as a flag, with the usual truthiness coercions.
    pub fn as_bool(&self) -> bool {
        match self {
            AttrValue::Bool(flag) => *flag,
            AttrValue::Int(value) => *value != 0,
            AttrValue::Str(value) => !value.is_empty(),
        }
    }
}

/// Option map handed to the constructor and to [`Connection::prepare`].
pub type Options = HashMap<u32, AttrValue>;

/// The vendor-neutral client contract.
///
/// Code written against this trait stays portable across database drivers;
/// [`Connection`] is the Oracle implementation. The cursor and descriptor
/// passthroughs are non-standard extensions and live as inherent methods
/// on the concrete type instead.
pub trait DriverConnection {
    /// Statement object produced by [`prepare`](Self::prepare) and
    /// [`query`](Self::query).
    type Stmt<'a>
    where
        Self: 'a;

    /// Prepare a statement, with per-statement options or the connection
    /// defaults.
    fn prepare<'a>(&'a mut self, sql: &str, options: Option<Options>) -> Result<Self::Stmt<'a>>;

    /// Prepare and execute without bound parameters; report affected rows.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Prepare and execute, returning the statement for row retrieval.
    fn query<'a>(&'a mut self, sql: &str) -> Result<Self::Stmt<'a>>;

    /// Enter a transaction. Fails if one is already active.
    fn begin_transaction(&mut self) -> Result<bool>;

    /// Commit the active transaction. Fails if none is active.
    fn commit(&mut self) -> Result<bool>;

    /// Roll back the active transaction. Fails if none is active.
    fn roll_back(&mut self) -> Result<bool>;

    /// Store an attribute. Reports whether the attribute was accepted.
    fn set_attribute(&mut self, key: u32, value: AttrValue) -> bool;

    /// Look up an attribute; absent keys read as null.
    fn get_attribute(&self, key: u32) -> Option<&AttrValue>;

    /// State-code component of [`error_info`](Self::error_info).
    fn error_code(&self) -> String;

    /// Two-level error report for the most recent native failure.
    fn error_info(&self) -> ErrorInfo;

    /// Quote a string literal for interpolation into SQL text.
    fn quote(&self, value: &str, hint: u32) -> String;

    /// Report the row id of the last inserted row, where supported.
    fn last_insert_id(&self, name: Option<&str>);
}

/// A connection to an Oracle database through a native OCI-style driver.
///
/// Owns the native session handle, the attribute map, and the emulated
/// transaction flag; all three die with the connection. Every operation is
/// a synchronous blocking call into the native layer.
///
/// One logical caller drives one instance at a time. The type provides no
/// internal synchronization; sharing an instance across threads requires
/// external locking, or one instance per thread.
pub struct Connection<D: NativeDriver> {
    /// Native session handle, exclusively owned.
    native: D::Conn,
    /// Attribute storage, arbitrary caller-defined keys included.
    attributes: HashMap<u32, AttrValue>,
    /// Default options for statements prepared without explicit options.
    stmt_options: Options,
    /// True only between a successful begin and the next successful
    /// commit or rollback.
    in_transaction: bool,
}

impl<D: NativeDriver> Connection<D> {
    /// Connect using a generic DSN.
    ///
    /// The DSN is destructured into host, port, service name, optional SID
    /// and charset, rendered as a native connect descriptor, and handed to
    /// the driver's connect primitive. A truthy [`ATTR_PERSISTENT`] option
    /// selects the persistent variant. `lookup` serves the alias and
    /// `uri:` DSN forms.
    ///
    /// Connect failures are fatal: the native message is surfaced in
    /// [`Error::Connect`] and no retry is attempted.
    pub fn connect(
        driver: &D,
        dsn: &str,
        username: &str,
        password: &str,
        options: Options,
        lookup: &dyn DsnLookup,
    ) -> Result<Self> {
        let params = DsnParams::parse(dsn, DSN_WHITELIST, lookup).ok_or_else(|| {
            Error::InvalidDsn {
                dsn: dsn.to_string(),
            }
        })?;
        let persistent = options
            .get(&ATTR_PERSISTENT)
            .map(AttrValue::as_bool)
            .unwrap_or(false);
        let spec = ConnectSpec {
            descriptor: params.to_descriptor(),
            username: username.to_string(),
            password: password.to_string(),
            charset: params.charset().map(str::to_string),
            persistent,
        };
        debug!(
            host = %params.hostname,
            port = params.port,
            service = %params.dbname,
            persistent,
            "connecting"
        );
        let native = driver.connect(&spec).map_err(|err| Error::Connect {
            message: err.message,
        })?;
        Ok(Self {
            native,
            attributes: options.clone(),
            stmt_options: options,
            in_transaction: false,
        })
    }

    /// Prepare a statement for execution.
    ///
    /// Positional `?` markers are rewritten to uniquely named placeholders
    /// before the text reaches the native parse primitive; the returned
    /// statement keeps the generated order so positional binds still line
    /// up. With no explicit `options` the connection's stored defaults
    /// apply.
    pub fn prepare(&mut self, sql: &str, options: Option<Options>) -> Result<Statement<'_, D>> {
        let rewritten = sql::rewrite_placeholders(sql);
        debug!(params = rewritten.param_count(), "preparing statement");
        let stmt = self.native.parse(&rewritten.text).map_err(|err| Error::Prepare {
            code: err.code,
            message: err.message,
        })?;
        let options = options.unwrap_or_else(|| self.stmt_options.clone());
        Ok(Statement::new(self, stmt, rewritten.names, options))
    }

    /// Execute a statement in one call and report the affected-row count.
    pub fn exec(&mut self, sql: &str) -> Result<u64> {
        let mut stmt = self.prepare(sql, None)?;
        stmt.execute()
    }

    /// Prepare and execute in one call, returning the statement for row
    /// retrieval.
    ///
    /// Fetch-mode customization through extra arguments is not supported
    /// here; callers configure fetching on the returned statement.
    pub fn query(&mut self, sql: &str) -> Result<Statement<'_, D>> {
        let mut stmt = self.prepare(sql, None)?;
        stmt.execute()?;
        Ok(stmt)
    }

    /// Enter a transaction.
    ///
    /// The native layer has no explicit begin. Entering a transaction only
    /// suppresses per-statement autocommit until the next successful
    /// [`commit`](Self::commit) or [`roll_back`](Self::roll_back).
    pub fn begin_transaction(&mut self) -> Result<bool> {
        if self.in_transaction {
            return Err(Error::transaction("There is already an active transaction"));
        }
        self.in_transaction = true;
        Ok(true)
    }

    /// Commit the active transaction.
    ///
    /// A native commit failure is routine: the transaction stays active,
    /// `Ok(false)` is returned, and the caller may retry or consult
    /// [`error_info`](Self::error_info).
    pub fn commit(&mut self) -> Result<bool> {
        if !self.in_transaction {
            return Err(Error::transaction("There is no active transaction"));
        }
        match self.native.commit() {
            Ok(()) => {
                self.in_transaction = false;
                Ok(true)
            }
            Err(err) => {
                warn!(code = err.code, message = %err.message, "native commit failed");
                Ok(false)
            }
        }
    }

    /// Roll back the active transaction.
    ///
    /// Failure reporting matches [`commit`](Self::commit): the transaction
    /// stays active and `Ok(false)` is returned.
    pub fn roll_back(&mut self) -> Result<bool> {
        if !self.in_transaction {
            return Err(Error::transaction("There is no active transaction"));
        }
        match self.native.rollback() {
            Ok(()) => {
                self.in_transaction = false;
                Ok(true)
            }
            Err(err) => {
                warn!(code = err.code, message = %err.message, "native rollback failed");
                Ok(false)
            }
        }
    }

    /// Whether an emulated transaction is active.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Store a connection attribute. Unknown keys are kept verbatim.
    pub fn set_attribute(&mut self, key: u32, value: AttrValue) -> bool {
        self.attributes.insert(key, value);
        true
    }

    /// Look up a connection attribute; absent keys read as null.
    pub fn get_attribute(&self, key: u32) -> Option<&AttrValue> {
        self.attributes.get(&key)
    }

    /// State-code component of [`error_info`](Self::error_info).
    pub fn error_code(&self) -> String {
        self.error_info().state.to_string()
    }

    /// Two-level error report for the most recent native failure.
    ///
    /// Queries the connection-level error retrieval primitive: a recorded
    /// diagnostic maps to the generic-failure state with the native code
    /// and message attached, no diagnostic maps to the success state.
    pub fn error_info(&self) -> ErrorInfo {
        match self.native.last_error() {
            Some(err) => ErrorInfo::general(err.code, err.message),
            None => ErrorInfo::ok(),
        }
    }

    /// Quote a string literal for interpolation into SQL text.
    ///
    /// The parameter-type hint is accepted for interface compatibility and
    /// ignored.
    pub fn quote(&self, value: &str, _hint: u32) -> String {
        sql::quote_literal(value)
    }

    /// The native database has no last-insert-id concept; this emits a
    /// non-fatal diagnostic and produces no value.
    pub fn last_insert_id(&self, name: Option<&str>) {
        warn!(
            sequence = name.unwrap_or_default(),
            "driver does not support lastInsertId()"
        );
    }

    /// Allocate a native statement handle suitable for use as a REF CURSOR.
    pub fn new_cursor(&mut self) -> Result<<D::Conn as NativeConnection>::Stmt> {
        self.native.new_cursor().map_err(Error::native)
    }

    /// Allocate a native descriptor of the given kind.
    pub fn new_descriptor(
        &mut self,
        kind: DescriptorKind,
    ) -> Result<<D::Conn as NativeConnection>::Descriptor> {
        self.native.new_descriptor(kind).map_err(Error::native)
    }

    /// Release a statement handle through the native free primitive.
    pub fn close_cursor(&mut self, stmt: <D::Conn as NativeConnection>::Stmt) {
        self.native.free_statement(stmt);
    }

    /// Whether statements should ask the native layer to commit per call.
    pub(crate) fn autocommit(&self) -> bool {
        !self.in_transaction
    }

    /// Native session handle, for the statement layer.
    pub(crate) fn native_mut(&mut self) -> &mut D::Conn {
        &mut self.native
    }
}

impl<D: NativeDriver> DriverConnection for Connection<D> {
    type Stmt<'a>
        = Statement<'a, D>
    where
        Self: 'a;

    fn prepare<'a>(&'a mut self, sql: &str, options: Option<Options>) -> Result<Statement<'a, D>> {
        Connection::prepare(self, sql, options)
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        Connection::exec(self, sql)
    }

    fn query<'a>(&'a mut self, sql: &str) -> Result<Statement<'a, D>> {
        Connection::query(self, sql)
    }

    fn begin_transaction(&mut self) -> Result<bool> {
        Connection::begin_transaction(self)
    }

    fn commit(&mut self) -> Result<bool> {
        Connection::commit(self)
    }

    fn roll_back(&mut self) -> Result<bool> {
        Connection::roll_back(self)
    }

    fn set_attribute(&mut self, key: u32, value: AttrValue) -> bool {
        Connection::set_attribute(self, key, value)
    }

    fn get_attribute(&self, key: u32) -> Option<&AttrValue> {
        Connection::get_attribute(self, key)
    }

    fn error_code(&self) -> String {
        Connection::error_code(self)
    }

    fn error_info(&self) -> ErrorInfo {
        Connection::error_info(self)
    }

    fn quote(&self, value: &str, hint: u32) -> String {
        Connection::quote(self, value, hint)
    }

    fn last_insert_id(&self, name: Option<&str>) {
        Connection::last_insert_id(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsn::NoLookup;
    use crate::native::{NativeError, NativeStatement, Value};

    #[derive(Default)]
    struct MockDriver {
        fail_connect: bool,
    }

    struct MockConn {
        spec: ConnectSpec,
        fail_commit: bool,
        fail_parse: bool,
        commits: u32,
        rollbacks: u32,
        parsed: Vec<String>,
        freed: u32,
        last_error: Option<NativeError>,
    }

    struct MockStmt {
        rows: u64,
    }

    impl NativeDriver for MockDriver {
        type Conn = MockConn;

        fn connect(&self, spec: &ConnectSpec) -> std::result::Result<MockConn, NativeError> {
            if self.fail_connect {
                return Err(NativeError::new(
                    12154,
                    "TNS:could not resolve the connect identifier specified",
                ));
            }
            Ok(MockConn {
                spec: spec.clone(),
                fail_commit: false,
                fail_parse: false,
                commits: 0,
                rollbacks: 0,
                parsed: Vec::new(),
                freed: 0,
                last_error: None,
            })
        }
    }

    impl NativeConnection for MockConn {
        type Stmt = MockStmt;
        type Descriptor = u64;

        fn parse(&mut self, sql: &str) -> std::result::Result<MockStmt, NativeError> {
            if self.fail_parse {
                let err = NativeError::new(900, "invalid SQL statement");
                self.last_error = Some(err.clone());
                return Err(err);
            }
            self.parsed.push(sql.to_string());
            Ok(MockStmt { rows: 3 })
        }

        fn commit(&mut self) -> std::result::Result<(), NativeError> {
            if self.fail_commit {
                let err = NativeError::new(2091, "transaction rolled back");
                self.last_error = Some(err.clone());
                return Err(err);
            }
            self.commits += 1;
            Ok(())
        }

        fn rollback(&mut self) -> std::result::Result<(), NativeError> {
            self.rollbacks += 1;
            Ok(())
        }

        fn last_error(&self) -> Option<NativeError> {
            self.last_error.clone()
        }

        fn new_cursor(&mut self) -> std::result::Result<MockStmt, NativeError> {
            Ok(MockStmt { rows: 0 })
        }

        fn new_descriptor(
            &mut self,
            kind: DescriptorKind,
        ) -> std::result::Result<u64, NativeError> {
            Ok(kind.code() as u64)
        }

        fn free_statement(&mut self, _stmt: MockStmt) {
            self.freed += 1;
        }
    }

    impl NativeStatement for MockStmt {
        fn execute(&mut self, _commit_on_success: bool) -> std::result::Result<(), NativeError> {
            Ok(())
        }

        fn row_count(&self) -> u64 {
            self.rows
        }

        fn bind_by_name(
            &mut self,
            _name: &str,
            _value: Value,
        ) -> std::result::Result<(), NativeError> {
            Ok(())
        }
    }

    fn connect() -> Connection<MockDriver> {
        Connection::connect(
            &MockDriver::default(),
            "oci://dbhost/XE",
            "scott",
            "tiger",
            Options::new(),
            &NoLookup,
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_dsn_is_fatal() {
        let result = Connection::connect(
            &MockDriver::default(),
            "mysql://dbhost/test",
            "scott",
            "tiger",
            Options::new(),
            &NoLookup,
        );
        assert!(matches!(result, Err(Error::InvalidDsn { .. })));
    }

    #[test]
    fn test_connect_failure_surfaces_native_message() {
        let driver = MockDriver { fail_connect: true };
        let result = Connection::connect(
            &driver,
            "oci://dbhost/XE",
            "scott",
            "tiger",
            Options::new(),
            &NoLookup,
        );
        match result {
            Err(Error::Connect { message }) => assert!(message.contains("TNS")),
            other => panic!("expected connect failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_connect_builds_descriptor_and_charset() {
        let conn = Connection::connect(
            &MockDriver::default(),
            "oci://dbhost:1522/SERVICE;charset=UTF8",
            "scott",
            "tiger",
            Options::new(),
            &NoLookup,
        )
        .unwrap();
        assert!(conn.native.spec.descriptor.contains("(HOST=dbhost)"));
        assert!(conn.native.spec.descriptor.contains("(PORT=1522)"));
        assert!(conn.native.spec.descriptor.contains("(SERVICE_NAME=SERVICE)"));
        assert_eq!(conn.native.spec.charset.as_deref(), Some("UTF8"));
        assert!(!conn.native.spec.persistent);
    }

    #[test]
    fn test_persistent_attribute_selects_persistent_connect() {
        let mut options = Options::new();
        options.insert(ATTR_PERSISTENT, AttrValue::Bool(true));
        let conn = Connection::connect(
            &MockDriver::default(),
            "oci://dbhost/XE",
            "scott",
            "tiger",
            options,
            &NoLookup,
        )
        .unwrap();
        assert!(conn.native.spec.persistent);
        assert!(conn.get_attribute(ATTR_PERSISTENT).unwrap().as_bool());
    }

    #[test]
    fn test_begin_twice_fails() {
        let mut conn = connect();
        assert!(conn.begin_transaction().unwrap());
        let err = conn.begin_transaction().unwrap_err();
        assert_eq!(err.to_string(), "There is already an active transaction");
        assert!(conn.in_transaction());
    }

    #[test]
    fn test_commit_without_transaction_fails() {
        let mut conn = connect();
        let err = conn.commit().unwrap_err();
        assert_eq!(err.to_string(), "There is no active transaction");
    }

    #[test]
    fn test_rollback_without_transaction_fails() {
        let mut conn = connect();
        assert!(matches!(
            conn.roll_back(),
            Err(Error::Transaction { .. })
        ));
    }

    #[test]
    fn test_commit_clears_state() {
        let mut conn = connect();
        conn.begin_transaction().unwrap();
        assert!(conn.commit().unwrap());
        assert!(!conn.in_transaction());
        assert_eq!(conn.native.commits, 1);
        // Back to idle, so another commit is a state violation.
        assert!(conn.commit().is_err());
    }

    #[test]
    fn test_rollback_clears_state() {
        let mut conn = connect();
        conn.begin_transaction().unwrap();
        assert!(conn.roll_back().unwrap());
        assert!(!conn.in_transaction());
        assert_eq!(conn.native.rollbacks, 1);
    }

    #[test]
    fn test_native_commit_failure_keeps_state() {
        let mut conn = connect();
        conn.begin_transaction().unwrap();
        conn.native.fail_commit = true;
        assert!(!conn.commit().unwrap());
        assert!(conn.in_transaction());
        // The failure is retryable once the native condition clears.
        conn.native.fail_commit = false;
        assert!(conn.commit().unwrap());
        assert!(!conn.in_transaction());
    }

    #[test]
    fn test_error_info_without_error() {
        let conn = connect();
        assert_eq!(conn.error_info(), ErrorInfo::ok());
        assert_eq!(conn.error_code(), "00000");
    }

    #[test]
    fn test_error_info_with_native_error() {
        let mut conn = connect();
        conn.native.last_error = Some(NativeError::new(942, "table or view does not exist"));
        let info = conn.error_info();
        assert_eq!(info.state, "HY000");
        assert_eq!(info.code, Some(942));
        assert_eq!(info.message.as_deref(), Some("table or view does not exist"));
        assert_eq!(conn.error_code(), "HY000");
    }

    #[test]
    fn test_prepare_rewrites_placeholders() {
        let mut conn = connect();
        let stmt = conn
            .prepare("SELECT * FROM t WHERE a=? AND b=?", None)
            .unwrap();
        assert_eq!(stmt.param_names(), ["autoparam0", "autoparam1"]);
        drop(stmt);
        assert_eq!(
            conn.native.parsed,
            ["SELECT * FROM t WHERE a=:autoparam0 AND b=:autoparam1"]
        );
    }

    #[test]
    fn test_prepare_failure_maps_native_error() {
        let mut conn = connect();
        conn.native.fail_parse = true;
        let err = conn.prepare("SELEC 1 FROM dual", None).unwrap_err();
        assert!(matches!(err, Error::Prepare { code: 900, .. }));
        assert_eq!(conn.error_info().code, Some(900));
    }

    #[test]
    fn test_exec_reports_affected_rows() {
        let mut conn = connect();
        assert_eq!(conn.exec("DELETE FROM t").unwrap(), 3);
    }

    #[test]
    fn test_attributes_round_trip() {
        let mut conn = connect();
        assert!(conn.get_attribute(ATTR_PREFETCH).is_none());
        assert!(conn.set_attribute(ATTR_PREFETCH, AttrValue::Int(100)));
        assert_eq!(
            conn.get_attribute(ATTR_PREFETCH),
            Some(&AttrValue::Int(100))
        );
    }

    #[test]
    fn test_quote_ignores_hint() {
        let conn = connect();
        assert_eq!(conn.quote("O'Brien", 2), "'O''Brien'");
    }

    #[test]
    fn test_cursor_passthrough() {
        let mut conn = connect();
        let cursor = conn.new_cursor().unwrap();
        conn.close_cursor(cursor);
        assert_eq!(conn.native.freed, 1);
        assert_eq!(
            conn.new_descriptor(DescriptorKind::Lob).unwrap(),
            DescriptorKind::Lob.code() as u64
        );
    }
}
