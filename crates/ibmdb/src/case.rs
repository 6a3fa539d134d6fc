//! Column-name case folding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How result-column names are exposed to callers.
///
/// The active policy is read when a row is fetched or a description is
/// built; rows fetched earlier keep the names they were built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasePolicy {
    /// Names exactly as the server reports them.
    #[default]
    Natural,
    Upper,
    Lower,
}

impl CasePolicy {
    /// Fold a column name or identifier.
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Natural => name.to_string(),
            Self::Upper => name.to_uppercase(),
            Self::Lower => name.to_lowercase(),
        }
    }
}

impl FromStr for CasePolicy {
    type Err = Error;

    /// Accepts `natural`, `upper`, `lower` in any case, with or without the
    /// `CASE_` prefix used by CLI attribute names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("CASE_").unwrap_or(&upper) {
            "NATURAL" => Ok(Self::Natural),
            "UPPER" => Ok(Self::Upper),
            "LOWER" => Ok(Self::Lower),
            _ => Err(Error::configuration(format!(
                "case policy must be one of NATURAL, UPPER or LOWER, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for CasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Natural => "NATURAL",
            Self::Upper => "UPPER",
            Self::Lower => "LOWER",
        };
        f.write_str(name)
    }
}
