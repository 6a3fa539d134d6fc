//! Settings resolution across framework schema generations.
//!
//! The framework has described database settings three ways over its
//! history. Each shape is a variant of [`SettingsRecord`] with its own
//! resolver; all three share one extraction routine driven by a key table.
//!
//! Optional fields are lenient: `USER`, `PASSWORD`, `HOST` and `PORT` are
//! used only when they are strings and `OPTIONS` only when it is a table.
//! Values of any other type are dropped without an error, so a numeric
//! `PORT = 50000` is ignored and the client default applies.

use std::fmt;
use std::str::FromStr;

use ibmdb::{ConnectionParameters, Error, NativeOptions, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Raw settings dictionary.
pub type SettingsMap = serde_json::Map<String, Value>;

/// Settings shape used by a framework release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaGeneration {
    /// Module-level `DATABASE_*` attributes (framework 1.0 and earlier).
    Legacy,
    /// Per-connection dict with `DATABASE_*` keys (framework 1.1).
    Intermediate,
    /// Per-connection dict with `NAME`, `USER`, ... keys.
    Current,
}

impl SchemaGeneration {
    /// Generation used by framework release `major.minor`.
    #[must_use]
    pub const fn for_framework_version(major: u32, minor: u32) -> Self {
        match (major, minor) {
            (0, _) | (1, 0) => Self::Legacy,
            (1, 1) => Self::Intermediate,
            _ => Self::Current,
        }
    }

    /// Keys this generation stores each field under.
    #[must_use]
    pub const fn keys(self) -> &'static SettingsKeys {
        match self {
            Self::Legacy | Self::Intermediate => &DATABASE_KEYS,
            Self::Current => &CURRENT_KEYS,
        }
    }
}

impl FromStr for SchemaGeneration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "intermediate" => Ok(Self::Intermediate),
            "current" => Ok(Self::Current),
            _ => Err(Error::configuration(format!(
                "unknown settings schema '{s}', expected legacy, intermediate or current"
            ))),
        }
    }
}

impl fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Legacy => "legacy",
            Self::Intermediate => "intermediate",
            Self::Current => "current",
        };
        f.write_str(name)
    }
}

/// Key names of one generation.
#[derive(Debug, PartialEq, Eq)]
pub struct SettingsKeys {
    pub name: &'static str,
    pub user: &'static str,
    pub password: &'static str,
    pub host: &'static str,
    pub port: &'static str,
    pub options: &'static str,
}

impl SettingsKeys {
    const fn all(&self) -> [&'static str; 6] {
        [
            self.name,
            self.user,
            self.password,
            self.host,
            self.port,
            self.options,
        ]
    }

    fn any_present(&self, map: &SettingsMap) -> bool {
        self.all().iter().any(|key| map.contains_key(*key))
    }
}

const DATABASE_KEYS: SettingsKeys = SettingsKeys {
    name: "DATABASE_NAME",
    user: "DATABASE_USER",
    password: "DATABASE_PASSWORD",
    host: "DATABASE_HOST",
    port: "DATABASE_PORT",
    options: "DATABASE_OPTIONS",
};

const CURRENT_KEYS: SettingsKeys = SettingsKeys {
    name: "NAME",
    user: "USER",
    password: "PASSWORD",
    host: "HOST",
    port: "PORT",
    options: "OPTIONS",
};

/// Module-level settings attributes of the oldest framework releases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LegacySettings {
    pub database_name: Value,
    pub database_user: Value,
    pub database_password: Value,
    pub database_host: Value,
    pub database_port: Value,
    pub database_options: Value,
}

impl LegacySettings {
    fn attribute(&self, key: &str) -> Option<&Value> {
        let value = match key {
            "DATABASE_NAME" => &self.database_name,
            "DATABASE_USER" => &self.database_user,
            "DATABASE_PASSWORD" => &self.database_password,
            "DATABASE_HOST" => &self.database_host,
            "DATABASE_PORT" => &self.database_port,
            "DATABASE_OPTIONS" => &self.database_options,
            _ => return None,
        };
        (!value.is_null()).then_some(value)
    }
}

/// Settings in one of the three generation shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsRecord {
    Legacy(LegacySettings),
    Intermediate(SettingsMap),
    Current(SettingsMap),
}

impl SettingsRecord {
    /// Tag `map` with an explicitly chosen generation.
    pub fn with_generation(generation: SchemaGeneration, map: SettingsMap) -> Result<Self> {
        match generation {
            SchemaGeneration::Legacy => serde_json::from_value(Value::Object(map))
                .map(Self::Legacy)
                .map_err(|e| Error::configuration(format!("invalid legacy settings: {e}"))),
            SchemaGeneration::Intermediate => Ok(Self::Intermediate(map)),
            SchemaGeneration::Current => Ok(Self::Current(map)),
        }
    }

    /// Tag `map` from its key family.
    ///
    /// `NAME`-family keys select [`SchemaGeneration::Current`], `DATABASE_*`
    /// keys select [`SchemaGeneration::Intermediate`]. A map carrying both
    /// families or neither is rejected. Legacy is never inferred.
    pub fn infer(map: SettingsMap) -> Result<Self> {
        let current = CURRENT_KEYS.any_present(&map);
        let database = DATABASE_KEYS.any_present(&map);
        match (current, database) {
            (true, false) => Ok(Self::Current(map)),
            (false, true) => Ok(Self::Intermediate(map)),
            (true, true) => Err(Error::configuration(
                "ambiguous settings: both NAME and DATABASE_* keys are present",
            )),
            (false, false) => Err(Error::configuration(
                "unrecognized settings: expected NAME or DATABASE_NAME keys",
            )),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> SchemaGeneration {
        match self {
            Self::Legacy(_) => SchemaGeneration::Legacy,
            Self::Intermediate(_) => SchemaGeneration::Intermediate,
            Self::Current(_) => SchemaGeneration::Current,
        }
    }

    /// Canonical connection parameters. Pure, performs no I/O.
    pub fn resolve(&self) -> Result<ConnectionParameters> {
        match self {
            Self::Legacy(settings) => resolve_legacy(settings),
            Self::Intermediate(map) => resolve_intermediate(map),
            Self::Current(map) => resolve_current(map),
        }
    }
}

fn resolve_legacy(settings: &LegacySettings) -> Result<ConnectionParameters> {
    extract(&DATABASE_KEYS, |key| settings.attribute(key))
}

fn resolve_intermediate(map: &SettingsMap) -> Result<ConnectionParameters> {
    extract(&DATABASE_KEYS, |key| map.get(key))
}

fn resolve_current(map: &SettingsMap) -> Result<ConnectionParameters> {
    extract(&CURRENT_KEYS, |key| map.get(key))
}

fn extract<'a>(
    keys: &SettingsKeys,
    lookup: impl Fn(&'static str) -> Option<&'a Value>,
) -> Result<ConnectionParameters> {
    let name = match lookup(keys.name) {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(Error::configuration("missing database name")),
    };
    let mut params = ConnectionParameters::new(name)?;

    let text = |key: &'static str| match lookup(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            debug!(key, kind = value_kind(other), "ignoring non-string setting");
            None
        }
        None => None,
    };

    if let Some(user) = text(keys.user) {
        params = params.with_user(user);
    }
    if let Some(password) = text(keys.password) {
        params = params.with_password(password);
    }
    if let Some(host) = text(keys.host) {
        params = params.with_host(host);
    }
    if let Some(port) = text(keys.port) {
        params = params.with_port(port);
    }

    match lookup(keys.options) {
        Some(Value::Object(map)) => {
            let options: NativeOptions =
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            params = params.with_options(options);
        }
        Some(other) => {
            debug!(key = keys.options, kind = value_kind(other), "ignoring non-table options");
        }
        None => {}
    }

    Ok(params)
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
