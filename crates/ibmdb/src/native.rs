//! Native CLI client capability.
//!
//! The process-wide native client library is modelled as an injected
//! [`NativeDriver`]. Everything above this module talks to the server only
//! through these traits, so tests run against [`crate::testing::MockDriver`]
//! without a live database.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{ColumnDescription, ServerInfo, Value};

/// Options handed to the native connect call.
pub type NativeOptions = BTreeMap<String, serde_json::Value>;

/// Native diagnostic record (SQLSTATE, SQLCODE, message text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    sqlstate: Option<String>,
    sqlcode: Option<i32>,
    message: String,
}

impl NativeError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sqlstate: None,
            sqlcode: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    #[must_use]
    pub const fn with_sqlcode(mut self, sqlcode: i32) -> Self {
        self.sqlcode = Some(sqlcode);
        self
    }

    #[must_use]
    pub fn sqlstate(&self) -> Option<&str> {
        self.sqlstate.as_deref()
    }

    #[must_use]
    pub const fn sqlcode(&self) -> Option<i32> {
        self.sqlcode
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NativeError {}

/// What the native connect call connects to.
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// A database alias catalogued on the client.
    Catalogued(String),
    /// A `KEY=value;` connection string.
    ConnectionString(String),
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalogued(alias) => f.debug_tuple("Catalogued").field(alias).finish(),
            Self::ConnectionString(dsn) => f
                .debug_tuple("ConnectionString")
                .field(&redact_pwd(dsn))
                .finish(),
        }
    }
}

/// Replace the value of a `PWD=` entry.
fn redact_pwd(dsn: &str) -> String {
    dsn.split(';')
        .map(|entry| match entry.split_once('=') {
            Some((key, _)) if key.trim().eq_ignore_ascii_case("PWD") => format!("{key}=***"),
            _ => entry.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Credentials passed alongside a catalogued target.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Statement cursor type requested at prepare time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorType {
    #[default]
    ForwardOnly,
    KeysetDriven,
}

/// Catalog function request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    Tables {
        schema: Option<String>,
        table: Option<String>,
    },
    Columns {
        schema: Option<String>,
        table: Option<String>,
        column: Option<String>,
    },
}

/// Entry point of the native client.
pub trait NativeDriver: Send + Sync + fmt::Debug {
    fn connect(
        &self,
        target: &ConnectTarget,
        credentials: &Credentials,
        options: &NativeOptions,
    ) -> Result<Box<dyn NativeSession>, NativeError>;
}

/// One native connection handle.
pub trait NativeSession: Send + fmt::Debug {
    fn server_info(&mut self) -> Result<ServerInfo, NativeError>;

    fn prepare(
        &mut self,
        sql: &str,
        cursor_type: CursorType,
    ) -> Result<Box<dyn NativeStatement>, NativeError>;

    fn catalog(&mut self, request: &CatalogRequest)
    -> Result<Box<dyn NativeStatement>, NativeError>;

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeError>;

    fn commit(&mut self) -> Result<(), NativeError>;

    fn rollback(&mut self) -> Result<(), NativeError>;

    /// Release the handle. Called at most once.
    fn close(&mut self) -> Result<(), NativeError>;
}

/// One native statement handle.
pub trait NativeStatement: Send + fmt::Debug {
    fn execute(&mut self, params: &[Value]) -> Result<(), NativeError>;

    /// Column metadata with server-native names.
    fn columns(&self) -> Vec<ColumnDescription>;

    /// Next row, `None` once the result set is exhausted.
    fn fetch(&mut self) -> Result<Option<Vec<Value>>, NativeError>;

    /// Rows affected by the last DML, `-1` when unknown.
    fn row_count(&self) -> i64;
}
