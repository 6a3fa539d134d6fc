//! Configuration builder

use ibmdb::Result;
use serde_json::Value;

use crate::settings::{SchemaGeneration, SettingsMap, SettingsRecord};

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: SettingsRecord,
    pub logging: LoggingConfig,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Single-field overrides, written under the keys of the settings
/// generation in effect.
#[derive(Debug, Default)]
struct FieldOverrides {
    name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<String>,
}

/// Configuration builder with fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    schema: Option<SchemaGeneration>,
    database: SettingsMap,
    overrides: FieldOverrides,
    logging: LoggingConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the settings generation instead of inferring it.
    #[must_use]
    pub const fn schema(mut self, schema: SchemaGeneration) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Raw settings dictionary, replacing any earlier one.
    #[must_use]
    pub fn database(mut self, database: SettingsMap) -> Self {
        self.database = database;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.overrides.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.overrides.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.overrides.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.overrides.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.overrides.port = Some(port.into());
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, json: bool) -> Self {
        self.logging.json = json;
        self
    }

    /// Tag the settings and fold the overrides in.
    ///
    /// The generation is the pinned one, else inferred from the dictionary,
    /// else [`SchemaGeneration::Current`] when the dictionary is empty.
    pub fn build(self) -> Result<Config> {
        let generation = match self.schema {
            Some(generation) => generation,
            None if self.database.is_empty() => SchemaGeneration::Current,
            None => SettingsRecord::infer(self.database.clone())?.generation(),
        };

        let keys = generation.keys();
        let mut database = self.database;
        let overrides = [
            (keys.name, self.overrides.name),
            (keys.user, self.overrides.user),
            (keys.password, self.overrides.password),
            (keys.host, self.overrides.host),
            (keys.port, self.overrides.port),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                database.insert(key.to_string(), Value::String(value));
            }
        }

        Ok(Config {
            database: SettingsRecord::with_generation(generation, database)?,
            logging: self.logging,
        })
    }
}
