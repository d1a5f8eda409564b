//! Generic database-interface adapter for Oracle OCI-style drivers.
//!
//! Application code written against the vendor-neutral [`DriverConnection`]
//! contract talks to an Oracle database through whatever native client
//! implements the [`native`] capability traits. The adapter translates the
//! generic `oci://host:port/service` DSN into the structured connect
//! descriptor the native layer wants, rewrites positional `?` placeholders
//! into uniquely named ones, emulates transactions over a driver that has
//! no explicit begin, and normalizes connection-level diagnostics into the
//! two-level state-code contract.
//!
//! # Example
//!
//! ```no_run
//! use oci_dbal_rs::{Connection, DsnRegistry, NativeDriver, Options, Result};
//!
//! fn transfer<D: NativeDriver>(driver: &D) -> Result<()> {
//!     let mut conn = Connection::connect(
//!         driver,
//!         "oci://localhost:1521/XE;charset=AL32UTF8",
//!         "scott",
//!         "tiger",
//!         Options::new(),
//!         &DsnRegistry::new(),
//!     )?;
//!
//!     conn.begin_transaction()?;
//!     conn.exec("UPDATE accounts SET balance = balance - 100 WHERE id = 1")?;
//!     conn.exec("UPDATE accounts SET balance = balance + 100 WHERE id = 2")?;
//!     if !conn.commit()? {
//!         // Routine native failure: still in the transaction, roll it back.
//!         conn.roll_back()?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dsn;
pub mod error;
pub mod native;
pub mod sql;
pub mod statement;

// Re-export main types
pub use connection::{
    AttrValue, Connection, DriverConnection, Options, ATTR_AUTOCOMMIT, ATTR_CASE,
    ATTR_CLIENT_VERSION, ATTR_CONNECTION_STATUS, ATTR_CURSOR, ATTR_CURSOR_NAME, ATTR_ERRMODE,
    ATTR_ORACLE_NULLS, ATTR_PERSISTENT, ATTR_PREFETCH, ATTR_SERVER_INFO, ATTR_SERVER_VERSION,
    ATTR_TIMEOUT,
};
pub use dsn::{DsnLookup, DsnParams, DsnRegistry, NoLookup};
pub use error::{Error, ErrorInfo, Result, SQLSTATE_GENERAL_ERROR, SQLSTATE_OK};
pub use native::{
    ConnectSpec, DescriptorKind, NativeConnection, NativeDriver, NativeError, NativeStatement,
    Value,
};
pub use sql::{quote_literal, rewrite_placeholders, RewrittenSql};
pub use statement::Statement;
