//! TOML configuration file loading

use std::path::{Path, PathBuf};

use ibmdb::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

use super::builder::ConfigBuilder;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./ibmdb-orm.toml",
    "~/.config/ibmdb-orm/config.toml",
    "/etc/ibmdb-orm/config.toml",
];

/// Key in `[database]` that pins the settings generation.
const SCHEMA_KEY: &str = "schema";

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    CONFIG_PATHS
        .iter()
        .filter_map(|path| expand_home(path))
        .find(|path| path.exists())
}

fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(format!("{home}{rest}"))),
        None => Some(PathBuf::from(path)),
    }
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::configuration(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        Error::configuration(format!(
            "Failed to parse config file {}: {e}",
            path.display()
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(mut database) = config.database {
        if let Some(schema) = database.remove(SCHEMA_KEY) {
            let schema = schema.as_str().ok_or_else(|| {
                Error::configuration(format!("[database] {SCHEMA_KEY} must be a string"))
            })?;
            builder = builder.schema(schema.parse()?);
        }

        let Value::Object(map) = serde_json::to_value(&database)
            .map_err(|e| Error::configuration(format!("Invalid [database] table: {e}")))?
        else {
            return Err(Error::configuration("[database] must be a table"));
        };
        builder = builder.database(map);
    }

    if let Some(logging) = config.logging {
        if let Some(level) = logging.level {
            builder = builder.log_level(level);
        }

        if let Some(json) = logging.json {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    database: Option<toml::Table>,
    logging: Option<LoggingFileConfig>,
}

#[derive(Debug, Deserialize)]
struct LoggingFileConfig {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::settings::SchemaGeneration;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[database]
NAME = "SAMPLE"
USER = "db2inst1"
PASSWORD = "secret"
HOST = "db.example.com"
PORT = "50000"

[database.OPTIONS]
ATTR_CASE = "UPPER"

[logging]
level = "debug"
json = true
"#;

        let file = create_temp_config(toml_content);
        let config = load_from_file(file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.database.generation(), SchemaGeneration::Current);
        let params = config.database.resolve().unwrap();
        assert_eq!(params.name(), "SAMPLE");
        assert_eq!(params.host(), Some("db.example.com"));
        assert_eq!(params.port(), Some("50000"));
        assert_eq!(
            params.options().unwrap().get("ATTR_CASE"),
            Some(&serde_json::json!("UPPER"))
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_schema_marker_pins_generation() {
        let file = create_temp_config(
            r#"
[database]
schema = "legacy"
DATABASE_NAME = "SAMPLE"
"#,
        );
        let config = load_from_file(file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.database.generation(), SchemaGeneration::Legacy);
        assert_eq!(config.database.resolve().unwrap().name(), "SAMPLE");
    }

    #[test]
    fn test_invalid_schema_marker() {
        let file = create_temp_config("[database]\nschema = \"django\"\n");
        let err = load_from_file(file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.is_configuration());

        let file = create_temp_config("[database]\nschema = 3\n");
        assert!(load_from_file(file.path(), ConfigBuilder::new()).is_err());
    }

    #[test]
    fn test_integer_port_is_ignored() {
        let file = create_temp_config("[database]\nNAME = \"SAMPLE\"\nPORT = 50000\n");
        let config = load_from_file(file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.database.resolve().unwrap().port(), None);
    }

    #[test]
    fn test_empty_file() {
        let file = create_temp_config("");
        let builder = load_from_file(file.path(), ConfigBuilder::new()).unwrap();
        let config = builder.name("SAMPLE").build().unwrap();
        assert_eq!(config.database.generation(), SchemaGeneration::Current);
    }

    #[test]
    fn test_invalid_toml() {
        let file = create_temp_config("[database\nNAME = ");
        let err = load_from_file(file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file(
            Path::new("/nonexistent/ibmdb-orm.toml"),
            ConfigBuilder::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(
            expand_home("/etc/ibmdb-orm/config.toml"),
            Some(PathBuf::from("/etc/ibmdb-orm/config.toml"))
        );
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(
                expand_home("~/.config/ibmdb-orm/config.toml"),
                Some(PathBuf::from(format!("{home}/.config/ibmdb-orm/config.toml")))
            );
        }
    }
}
