// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails at
//! startup instead of being silently ignored.

use serde::{Deserialize, Serialize};
use tablekeep_core::IdentifierPolicy;

/// Top-level tablekeep configuration. Every section is optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TablekeepConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database handle settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Statement construction settings.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Demo worker settings.
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for TablekeepConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connection: ConnectionConfig::default(),
            guard: GuardConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database handle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Process-unique connection name. Two guards may not hold the same name
    /// at once.
    #[serde(default = "default_connection_name")]
    pub name: String,

    /// Path to the SQLite database file. Created on first open.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Issue `PRAGMA synchronous = OFF` after opening.
    #[serde(default = "default_true")]
    pub synchronous_off: bool,

    /// SQLite busy timeout in milliseconds. Unset leaves SQLite's default.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: default_connection_name(),
            database_path: default_database_path(),
            synchronous_off: true,
            busy_timeout_ms: None,
        }
    }
}

fn default_connection_name() -> String {
    "tablekeep".to_string()
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("tablekeep").join("tablekeep.db"))
        .unwrap_or_else(|| "tablekeep.db".into())
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// `strict` admits plain identifiers only; `verbatim` passes names through.
    #[serde(default)]
    pub identifier_policy: IdentifierPolicy,
}

/// Demo worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Table the workers write to. Created if missing.
    #[serde(default = "default_demo_table")]
    pub table: String,

    /// Rows per batch insert.
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,

    /// Pause between writer batches.
    #[serde(default = "default_writer_interval_ms")]
    pub writer_interval_ms: u64,

    /// Pause between updater passes.
    #[serde(default = "default_updater_interval_ms")]
    pub updater_interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            table: default_demo_table(),
            batch_rows: default_batch_rows(),
            writer_interval_ms: default_writer_interval_ms(),
            updater_interval_ms: default_updater_interval_ms(),
        }
    }
}

fn default_demo_table() -> String {
    "scores".to_string()
}

fn default_batch_rows() -> usize {
    100
}

fn default_writer_interval_ms() -> u64 {
    100
}

fn default_updater_interval_ms() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = TablekeepConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.connection.name, "tablekeep");
        assert!(config.connection.database_path.ends_with("tablekeep.db"));
        assert!(config.connection.synchronous_off);
        assert_eq!(config.connection.busy_timeout_ms, None);
        assert_eq!(config.guard.identifier_policy, IdentifierPolicy::Strict);
        assert_eq!(config.demo.table, "scores");
        assert_eq!(config.demo.batch_rows, 100);
    }
}
