//! SQL fragments the ORM asks the backend for.

use ibmdb::{Connection, Dialect, Feature, Result};

/// Lookup operators and their SQL right-hand sides.
///
/// Case-insensitive and pattern lookups go through `LIKE` with a backslash
/// escape; the ORM folds case on both sides itself.
pub const OPERATORS: &[(&str, &str)] = &[
    ("exact", "= %s"),
    ("iexact", "LIKE %s ESCAPE '\\'"),
    ("contains", "LIKE %s ESCAPE '\\'"),
    ("icontains", "LIKE %s ESCAPE '\\'"),
    ("gt", "> %s"),
    ("gte", ">= %s"),
    ("lt", "< %s"),
    ("lte", "<= %s"),
    ("startswith", "LIKE %s ESCAPE '\\'"),
    ("endswith", "LIKE %s ESCAPE '\\'"),
    ("istartswith", "LIKE %s ESCAPE '\\'"),
    ("iendswith", "LIKE %s ESCAPE '\\'"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOperations {
    dialect: Dialect,
}

impl DatabaseOperations {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub fn operator(lookup: &str) -> Option<&'static str> {
        OPERATORS
            .iter()
            .find(|(name, _)| *name == lookup)
            .map(|&(_, sql)| sql)
    }

    /// Double-quote an identifier. Already quoted names pass through.
    #[must_use]
    pub fn quote_name(name: &str) -> String {
        if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
            return name.to_string();
        }
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Limit a SELECT to `limit` rows in the dialect's syntax.
    #[must_use]
    pub fn limit_query(self, select: &str, limit: u32) -> String {
        self.dialect.capabilities().row_limit.apply(select, limit)
    }

    /// Validate a column type against the connected server.
    ///
    /// XML columns need native XML support; everything else is accepted.
    pub fn check_column_type(connection: &Connection, column_type: &str) -> Result<()> {
        if column_type.eq_ignore_ascii_case("xml") {
            connection.require(Feature::NativeXml)?;
        }
        Ok(())
    }
}
