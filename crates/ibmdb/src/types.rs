//! Values, column metadata and server identification.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, QueryCategory, Result};

/// A single column value as delivered by the native layer.
///
/// Temporal values keep the ISO text the CLI client renders them as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// Exact numeric kept as text to avoid precision loss.
    Decimal(String),
    String(String),
    Binary(Vec<u8>),
    Date(String),
    Time(String),
    Timestamp(String),
    Xml(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow textual content (strings, decimals, temporals, XML).
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s)
            | Self::Decimal(s)
            | Self::Date(s)
            | Self::Time(s)
            | Self::Timestamp(s)
            | Self::Xml(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(v) => serde_json::json!(v),
            Self::Integer(v) => serde_json::json!(v),
            Self::Double(v) => serde_json::json!(v),
            Self::Binary(v) => serde_json::json!(v),
            other => other
                .as_str()
                .map_or(serde_json::Value::Null, |s| serde_json::json!(s)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// SQL data type of a result column, from the CLI type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SqlType {
    Char,
    VarChar,
    LongVarChar,
    Graphic,
    VarGraphic,
    Clob,
    DbClob,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    Blob,
    Xml,
    Other(i16),
}

impl SqlType {
    /// Map a CLI `SQL_*` type code.
    #[must_use]
    pub const fn from_code(code: i16) -> Self {
        match code {
            1 => Self::Char,
            12 => Self::VarChar,
            -1 => Self::LongVarChar,
            -95 => Self::Graphic,
            -96 => Self::VarGraphic,
            -99 => Self::Clob,
            -350 => Self::DbClob,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            7 => Self::Real,
            6 | 8 => Self::Double,
            3 => Self::Decimal,
            2 => Self::Numeric,
            16 => Self::Boolean,
            91 => Self::Date,
            92 => Self::Time,
            93 => Self::Timestamp,
            -2 => Self::Binary,
            -3 | -4 => Self::VarBinary,
            -98 => Self::Blob,
            -370 => Self::Xml,
            other => Self::Other(other),
        }
    }

    /// Coarse type name in the vocabulary of the classic `field_type` call.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::SmallInt | Self::Integer => "int",
            Self::BigInt => "bigint",
            Self::Real | Self::Double => "real",
            Self::Decimal | Self::Numeric => "decimal",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Binary | Self::VarBinary | Self::Blob => "blob",
            Self::Clob | Self::DbClob => "clob",
            Self::Xml => "xml",
            Self::Boolean => "boolean",
            Self::Char
            | Self::VarChar
            | Self::LongVarChar
            | Self::Graphic
            | Self::VarGraphic
            | Self::Other(_) => "string",
        }
    }
}

/// Result column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub sql_type: SqlType,
    pub display_size: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub nullable: bool,
}

impl ColumnDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            display_size: None,
            precision: None,
            scale: None,
            nullable: true,
        }
    }
}

/// Server identification reported right after connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// `SQL_DBMS_NAME`, e.g. `DB2/LINUXX8664`.
    pub dbms_name: String,
    /// `SQL_DBMS_VER`, e.g. `11.05.0900`.
    pub dbms_version: String,
}

impl ServerInfo {
    #[must_use]
    pub fn new(dbms_name: impl Into<String>, dbms_version: impl Into<String>) -> Self {
        Self {
            dbms_name: dbms_name.into(),
            dbms_version: dbms_version.into(),
        }
    }

    pub fn version(&self) -> Result<VersionInfo> {
        self.dbms_version.parse()
    }
}

/// Numeric server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionInfo {
    pub major: u32,
    pub minor: u32,
    pub fix: u32,
}

impl VersionInfo {
    #[must_use]
    pub const fn new(major: u32, minor: u32, fix: u32) -> Self {
        Self { major, minor, fix }
    }
}

impl std::str::FromStr for VersionInfo {
    type Err = Error;

    /// Parses `09.07.0000` style strings. Each component contributes its
    /// leading digits; missing components are zero.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.').map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        });

        let major = parts.next().flatten().ok_or_else(|| {
            Error::query(QueryCategory::Data, format!("invalid server version '{s}'"))
        })?;
        let minor = parts.next().flatten().unwrap_or(0);
        let fix = parts.next().flatten().unwrap_or(0);

        Ok(Self { major, minor, fix })
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.fix)
    }
}
