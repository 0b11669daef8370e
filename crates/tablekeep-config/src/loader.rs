// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/tablekeep/tablekeep.toml`
//! 3. `~/.config/tablekeep/tablekeep.toml`
//! 4. `./tablekeep.toml`
//! 5. `TABLEKEEP_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TablekeepConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/tablekeep/tablekeep.toml";
pub const LOCAL_CONFIG_PATH: &str = "tablekeep.toml";

/// `~/.config/tablekeep/tablekeep.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tablekeep").join("tablekeep.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<TablekeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the defaults. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<TablekeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TablekeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TablekeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TablekeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full provider stack before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(TablekeepConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `TABLEKEEP_<SECTION>_<KEY>` to `section.key`.
///
/// Uses an explicit section map rather than `split("_")`: keys contain
/// underscores, so `TABLEKEEP_CONNECTION_DATABASE_PATH` must become
/// `connection.database_path`, not `connection.database.path`.
fn env_provider() -> Env {
    Env::prefixed("TABLEKEEP_").map(|key| {
        // Keys arrive in the variable's own case.
        let key = key.as_str().to_ascii_lowercase();
        for section in ["connection", "guard", "demo"] {
            if let Some(rest) = key
                .strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn env_overrides_nested_keys_with_underscores() {
        Jail::expect_with(|jail| {
            jail.set_env("TABLEKEEP_CONNECTION_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("TABLEKEEP_DEMO_BATCH_ROWS", "7");
            jail.set_env("TABLEKEEP_GUARD_IDENTIFIER_POLICY", "verbatim");
            jail.set_env("TABLEKEEP_LOG_LEVEL", "debug");
            let config = load_config()?;
            assert_eq!(config.connection.database_path, "/tmp/env.db");
            assert_eq!(config.demo.batch_rows, 7);
            assert_eq!(
                config.guard.identifier_policy,
                tablekeep_core::IdentifierPolicy::Verbatim
            );
            assert_eq!(config.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults_and_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_PATH,
                r#"
                [connection]
                name = "from-file"
                busy_timeout_ms = 250
                "#,
            )?;
            jail.set_env("TABLEKEEP_CONNECTION_NAME", "from-env");
            let config = load_config()?;
            assert_eq!(config.connection.name, "from-env");
            assert_eq!(config.connection.busy_timeout_ms, Some(250));
            Ok(())
        });
    }
}
