//! Error types and native diagnostic translation.
//!
//! Maps native CLI diagnostics to four kinds:
//! - `Configuration`: malformed or incomplete connection parameters
//! - `Connection`: connect failure, lost link, use after close
//! - `DialectUnsupported`: feature the detected server does not provide
//! - `Query`: prepare/execute/fetch failure, categorized by SQLSTATE class

use std::fmt;

use thiserror::Error;

use crate::dialect::{Dialect, Feature};
use crate::native::NativeError;

/// Query failure category derived from the SQLSTATE class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryCategory {
    /// SQL syntax, unknown object, authorization (class 42).
    Programming,
    /// Constraint violation (class 23).
    Integrity,
    /// Value conversion, truncation, overflow (class 22).
    Data,
    /// Feature not supported by the server (class 0A).
    NotSupported,
    /// Everything else.
    Operational,
}

impl QueryCategory {
    /// Classify a five-character SQLSTATE.
    #[must_use]
    pub fn from_sqlstate(sqlstate: &str) -> Self {
        match sqlstate.get(..2) {
            Some("42") => Self::Programming,
            Some("23") => Self::Integrity,
            Some("22") => Self::Data,
            Some("0A") => Self::NotSupported,
            _ => Self::Operational,
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Programming => "programming",
            Self::Integrity => "integrity",
            Self::Data => "data",
            Self::NotSupported => "not supported",
            Self::Operational => "operational",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{feature} is not supported by {dialect}")]
    DialectUnsupported { dialect: Dialect, feature: Feature },

    #[error("Query error ({category}): {message}")]
    Query {
        category: QueryCategory,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Operation attempted on a closed or dropped connection.
    #[must_use]
    pub fn closed() -> Self {
        Self::Connection("connection is closed".into())
    }

    #[must_use]
    pub const fn dialect_unsupported(dialect: Dialect, feature: Feature) -> Self {
        Self::DialectUnsupported { dialect, feature }
    }

    #[must_use]
    pub fn query(category: QueryCategory, msg: impl Into<String>) -> Self {
        Self::Query {
            category,
            message: msg.into(),
        }
    }

    /// Translate a failed native connect attempt.
    ///
    /// Every connect-phase diagnostic is a connection error regardless of
    /// its SQLSTATE (bad credentials report class 28, unknown aliases 42).
    #[must_use]
    pub fn connect_failed(err: &NativeError) -> Self {
        Self::Connection(err.message().to_string())
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    #[must_use]
    pub const fn is_dialect_unsupported(&self) -> bool {
        matches!(self, Self::DialectUnsupported { .. })
    }

    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Category of a query error, `None` for the other kinds.
    #[must_use]
    pub const fn query_category(&self) -> Option<QueryCategory> {
        match self {
            Self::Query { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Statement-phase translation. SQLSTATE class 08 means the link is gone.
impl From<NativeError> for Error {
    fn from(err: NativeError) -> Self {
        let sqlstate = err
            .sqlstate()
            .map(str::to_string)
            .or_else(|| extract_sqlstate(err.message()));

        match sqlstate.as_deref() {
            Some(state) if state.starts_with("08") => Self::Connection(err.into_message()),
            Some(state) => Self::query(QueryCategory::from_sqlstate(state), err.into_message()),
            None => Self::query(QueryCategory::Operational, err.into_message()),
        }
    }
}

/// Extract `SQLSTATE=xxxxx` from a CLI diagnostic message.
fn extract_sqlstate(msg: &str) -> Option<String> {
    let pos = msg.find("SQLSTATE=")?;
    let code: String = msg[pos + 9..]
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    (code.len() == 5).then_some(code)
}

pub type Result<T> = std::result::Result<T, Error>;
