//! Capability traits for the native Oracle client.
//!
//! The adapter never speaks the wire protocol itself; it drives an opaque
//! native library through the traits below. Handles follow an explicit
//! lifecycle (open, use, free) and are owned by exactly one holder: the
//! [`Connection`](crate::Connection) owns the session handle, statement
//! handles move into the statement layer and come back only to be freed.

use std::fmt;

/// Diagnostic pair retrieved from the native layer.
///
/// The native convention is connection-level error retrieval rather than
/// per-call exceptions: after a failed primitive the latest diagnostic is
/// readable from the session handle until the next call replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Numeric native error code.
    pub code: i32,
    /// Human-readable native error text.
    pub message: String,
}

impl NativeError {
    /// Create a native diagnostic.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORA-{:05}: {}", self.code, self.message)
    }
}

/// Connect request handed to [`NativeDriver::connect`].
///
/// Empty credentials are passed through unchanged; a native layer may treat
/// them as a request for external authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSpec {
    /// Structured connect descriptor, see [`DsnParams::to_descriptor`](crate::DsnParams::to_descriptor).
    pub descriptor: String,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Client-side character set, when the DSN named one.
    pub charset: Option<String>,
    /// Select the persistent connect primitive instead of the transient one.
    pub persistent: bool,
}

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Character value (VARCHAR2, CHAR, CLOB input).
    Text(String),
    /// Binary value (RAW, BLOB input).
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Descriptor kinds accepted by [`NativeConnection::new_descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// LOB locator.
    Lob,
    /// BFILE locator.
    File,
    /// ROWID descriptor.
    Rowid,
}

impl DescriptorKind {
    /// The native dtype code for this descriptor kind.
    pub fn code(self) -> u32 {
        match self {
            DescriptorKind::Lob => 50,
            DescriptorKind::Rowid => 54,
            DescriptorKind::File => 56,
        }
    }
}

/// Entry point of a native client: opens sessions.
pub trait NativeDriver {
    /// Session handle type produced by a successful connect.
    type Conn: NativeConnection;

    /// Open a session described by `spec`.
    ///
    /// Blocks until the session is established or the attempt fails. The
    /// returned handle is the only reference to the session; dropping it
    /// releases the native resources.
    fn connect(&self, spec: &ConnectSpec) -> Result<Self::Conn, NativeError>;
}

/// An open native session.
///
/// All operations are synchronous blocking calls and cannot be cancelled
/// once issued. Timeout behavior, if any, belongs to the implementation.
pub trait NativeConnection {
    /// Statement handle type produced by [`parse`](Self::parse).
    type Stmt: NativeStatement;
    /// Opaque descriptor handle type.
    type Descriptor;

    /// Parse SQL text into an executable statement handle.
    ///
    /// The text must already use named placeholders; the native layer does
    /// not understand positional markers.
    fn parse(&mut self, sql: &str) -> Result<Self::Stmt, NativeError>;

    /// Commit the work performed on this session.
    fn commit(&mut self) -> Result<(), NativeError>;

    /// Roll back the work performed on this session.
    fn rollback(&mut self) -> Result<(), NativeError>;

    /// Latest diagnostic recorded on this session, if any.
    fn last_error(&self) -> Option<NativeError>;

    /// Allocate a statement handle suitable for use as a REF CURSOR.
    fn new_cursor(&mut self) -> Result<Self::Stmt, NativeError>;

    /// Allocate a descriptor of the given kind.
    fn new_descriptor(&mut self, kind: DescriptorKind) -> Result<Self::Descriptor, NativeError>;

    /// Release a statement handle through the explicit free primitive.
    fn free_statement(&mut self, stmt: Self::Stmt);
}

/// An executable native statement.
///
/// Row description and fetching are the statement layer's concern and are
/// not part of the adapter core.
pub trait NativeStatement {
    /// Execute the statement.
    ///
    /// `commit_on_success` asks the native layer to commit as part of the
    /// call; the adapter clears it while an emulated transaction is active.
    fn execute(&mut self, commit_on_success: bool) -> Result<(), NativeError>;

    /// Rows affected by the last execution.
    fn row_count(&self) -> u64;

    /// Bind a value to a named placeholder. `name` carries no leading colon.
    fn bind_by_name(&mut self, name: &str, value: Value) -> Result<(), NativeError>;
}
