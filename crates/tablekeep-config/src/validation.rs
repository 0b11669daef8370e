// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Checks the constraints serde cannot express. All failures are collected;
//! validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::TablekeepConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &TablekeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "log_level `{}` is not one of {}",
            config.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.connection.name.trim().is_empty() {
        errors.push(ConfigError::validation("connection.name must not be empty"));
    }

    if config.connection.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "connection.database_path must not be empty",
        ));
    }

    if config.demo.batch_rows == 0 {
        errors.push(ConfigError::validation("demo.batch_rows must be at least 1"));
    }

    // The demo table name is spliced into statements, so it must pass the
    // configured policy.
    if let Err(e) = config.guard.identifier_policy.check(&config.demo.table) {
        errors.push(ConfigError::validation(format!("demo.table: {e}")));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablekeep_core::IdentifierPolicy;

    fn messages(config: &TablekeepConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TablekeepConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let mut config = TablekeepConfig::default();
        config.log_level = "loud".to_string();
        config.connection.name = " ".to_string();
        config.connection.database_path = String::new();
        config.demo.batch_rows = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 4, "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("log_level")));
        assert!(msgs.iter().any(|m| m.contains("connection.name")));
        assert!(msgs.iter().any(|m| m.contains("database_path")));
        assert!(msgs.iter().any(|m| m.contains("batch_rows")));
    }

    #[test]
    fn demo_table_follows_identifier_policy() {
        let mut config = TablekeepConfig::default();
        config.demo.table = "scores; DROP TABLE x".to_string();
        assert!(messages(&config)[0].contains("demo.table"));

        config.guard.identifier_policy = IdentifierPolicy::Verbatim;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn sections_deny_unknown_fields() {
        let toml_str = r#"
[demo]
table = "t"
batch_size = 5
"#;
        assert!(toml::from_str::<TablekeepConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml_str = r#"
[demo]
batch_rows = 5
"#;
        let config: TablekeepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.demo.batch_rows, 5);
        assert_eq!(config.demo.table, "scores");
        assert_eq!(config.demo.updater_interval_ms, 10);
    }
}
