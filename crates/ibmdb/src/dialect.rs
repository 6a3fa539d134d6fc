//! Server dialect detection and per-dialect capabilities.
//!
//! The dialect is derived once per connection from the server identification
//! string (`SQL_DBMS_NAME`) and cached. Dialect-sensitive code consults
//! [`Dialect::capabilities`] instead of matching on server names itself.

use std::fmt;

use serde::Serialize;

use crate::case::CasePolicy;

/// Server dialect reachable through the CLI client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Dialect {
    /// DB2 for Linux, UNIX and Windows.
    #[default]
    Primary,
    /// DB2 for z/OS.
    Mainframe,
    /// DB2 for i.
    Midrange,
    /// Informix Dynamic Server.
    InformixFamily,
}

/// Ordered prefix table, first match wins.
///
/// `DB2/` must precede `DB2`: LUW servers report `DB2/<platform>` while
/// z/OS reports the bare `DB2`.
const DIALECT_PREFIXES: &[(&str, Dialect)] = &[
    ("DB2/", Dialect::Primary),
    ("IDS", Dialect::InformixFamily),
    ("AS", Dialect::Midrange),
    ("DB2", Dialect::Mainframe),
];

impl Dialect {
    /// Classify a server identification string. Unknown strings map to
    /// [`Dialect::Primary`].
    #[must_use]
    pub fn detect(server_identification: &str) -> Self {
        DIALECT_PREFIXES
            .iter()
            .find(|(prefix, _)| server_identification.starts_with(prefix))
            .map_or(Self::Primary, |&(_, dialect)| dialect)
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Primary => "DB2 for LUW",
            Self::Mainframe => "DB2 for z/OS",
            Self::Midrange => "DB2 for i",
            Self::InformixFamily => "Informix",
        }
    }

    #[must_use]
    pub fn capabilities(self) -> &'static DialectCapabilities {
        match self {
            Self::Primary => &PRIMARY,
            Self::Mainframe => &MAINFRAME,
            Self::Midrange => &MIDRANGE,
            Self::InformixFamily => &INFORMIX,
        }
    }

    #[must_use]
    pub fn supports(self, feature: Feature) -> bool {
        let caps = self.capabilities();
        match feature {
            Feature::NativeXml => caps.native_xml,
            Feature::NumericLiterals => caps.numeric_literals,
            Feature::KeysetCursors => caps.keyset_cursors,
            Feature::Savepoints => caps.savepoints,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Optional server features checked against the cached dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Feature {
    /// `XML` as a native column type.
    NativeXml,
    /// Replacement of quoted numeric literals by the CLI layer.
    NumericLiterals,
    /// Keyset-driven scrollable cursors.
    KeysetCursors,
    /// `SAVEPOINT` / `ROLLBACK TO SAVEPOINT`.
    Savepoints,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NativeXml => "native XML columns",
            Self::NumericLiterals => "numeric literal replacement",
            Self::KeysetCursors => "keyset-driven cursors",
            Self::Savepoints => "savepoints",
        };
        f.write_str(name)
    }
}

/// How a dialect limits the number of returned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowLimitStyle {
    /// `... FETCH FIRST n ROWS ONLY`
    FetchFirst,
    /// `SELECT FIRST n ...`
    SelectFirst,
}

impl RowLimitStyle {
    /// Apply a row limit to a SELECT statement.
    #[must_use]
    pub fn apply(self, select: &str, limit: u32) -> String {
        let select = select.trim_end().trim_end_matches(';');
        match self {
            Self::FetchFirst => format!("{select} FETCH FIRST {limit} ROWS ONLY"),
            Self::SelectFirst => {
                let trimmed = select.trim_start();
                match trimmed.get(..7) {
                    Some(head) if head.eq_ignore_ascii_case("SELECT ") => {
                        format!("SELECT FIRST {limit} {}", &trimmed[7..])
                    }
                    _ => format!("SELECT FIRST {limit} * FROM ({select})"),
                }
            }
        }
    }
}

/// Static capability record for one dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialectCapabilities {
    pub native_xml: bool,
    pub numeric_literals: bool,
    pub keyset_cursors: bool,
    pub savepoints: bool,
    /// Folding applied to identifiers passed to catalog functions.
    pub catalog_case: CasePolicy,
    /// Cheapest statement that proves the session is alive.
    pub validation_query: &'static str,
    pub row_limit: RowLimitStyle,
}

const SYSDUMMY: &str = "SELECT 1 FROM SYSIBM.SYSDUMMY1";

static PRIMARY: DialectCapabilities = DialectCapabilities {
    native_xml: true,
    numeric_literals: true,
    keyset_cursors: true,
    savepoints: true,
    catalog_case: CasePolicy::Upper,
    validation_query: SYSDUMMY,
    row_limit: RowLimitStyle::FetchFirst,
};

static MAINFRAME: DialectCapabilities = DialectCapabilities {
    native_xml: true,
    numeric_literals: true,
    keyset_cursors: true,
    savepoints: true,
    catalog_case: CasePolicy::Upper,
    validation_query: SYSDUMMY,
    row_limit: RowLimitStyle::FetchFirst,
};

static MIDRANGE: DialectCapabilities = DialectCapabilities {
    native_xml: false,
    numeric_literals: true,
    keyset_cursors: true,
    savepoints: true,
    catalog_case: CasePolicy::Upper,
    validation_query: SYSDUMMY,
    row_limit: RowLimitStyle::FetchFirst,
};

static INFORMIX: DialectCapabilities = DialectCapabilities {
    native_xml: false,
    numeric_literals: false,
    keyset_cursors: false,
    savepoints: true,
    catalog_case: CasePolicy::Lower,
    validation_query: "SELECT 1 FROM systables WHERE tabid = 1",
    row_limit: RowLimitStyle::SelectFirst,
};
