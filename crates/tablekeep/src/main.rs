// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tablekeep - serialized access to a single SQLite database.

mod check;
mod demo;
mod shutdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tablekeep_config::TablekeepConfig;
use tablekeep_core::GuardError;
use tablekeep_storage::ConnectionGuard;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tablekeep", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard config hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding `connection.database_path`.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the writer and updater workers until Ctrl+C.
    Demo {
        /// Stop after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Run an integrity check and list tables with row counts.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
        /// Print the effective configuration as TOML first.
        #[arg(long)]
        print_config: bool,
    },
    /// Copy a table, replacing the destination's rows.
    Copy {
        /// Source table.
        src: String,
        /// Destination table in the open database.
        dst: String,
        /// Read the source table from this database file.
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tablekeep_config::load_and_validate_path(path),
        None => tablekeep_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tablekeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    if let Some(database) = &cli.database {
        config.connection.database_path = database.display().to_string();
    }

    init_tracing(&config.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("tablekeep: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &TablekeepConfig) -> Result<(), GuardError> {
    let guard = Arc::new(open_guard(config)?);

    match command {
        Commands::Demo { duration_secs } => {
            let shutdown = shutdown::install_signal_handler();
            demo::run_demo(
                guard,
                &config.demo,
                shutdown,
                duration_secs.map(Duration::from_secs),
            )
            .await
        }
        Commands::Check {
            plain,
            print_config,
        } => {
            if print_config {
                let rendered = toml::to_string_pretty(config)
                    .map_err(|e| GuardError::Config(e.to_string()))?;
                println!("{rendered}");
            }
            check::run_check(&guard, plain)
        }
        Commands::Copy { src, dst, from } => {
            match from {
                Some(path) => guard.copy_table_from(&path, &src, &dst)?,
                None => guard.copy_table(&src, &dst)?,
            }
            info!(%src, %dst, "copy complete");
            Ok(())
        }
    }
}

/// Build a guard from `config` and open its database, creating the parent
/// directory if needed.
fn open_guard(config: &TablekeepConfig) -> Result<ConnectionGuard, GuardError> {
    let path = Path::new(&config.connection.database_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            GuardError::connection(format!("cannot create `{}`: {e}", parent.display()))
        })?;
    }
    let guard = ConnectionGuard::from_config(config);
    guard.open(path)?;
    Ok(guard)
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tablekeep={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn copy_subcommand_parses_source_file() {
        let cli = Cli::try_parse_from(["tablekeep", "copy", "aa", "bb", "--from", "other.db"])
            .unwrap();
        match cli.command {
            Commands::Copy { src, dst, from } => {
                assert_eq!(src, "aa");
                assert_eq!(dst, "bb");
                assert_eq!(from, Some(PathBuf::from("other.db")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn open_guard_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TablekeepConfig::default();
        config.connection.name = "main-open-guard".to_string();
        config.connection.database_path = dir
            .path()
            .join("nested")
            .join("tablekeep.db")
            .display()
            .to_string();

        let guard = open_guard(&config).unwrap();
        assert!(guard.is_open());
        assert!(dir.path().join("nested").join("tablekeep.db").exists());
    }

    #[tokio::test]
    async fn copy_command_copies_within_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TablekeepConfig::default();
        config.connection.name = "main-copy".to_string();
        config.connection.database_path = dir.path().join("copy.db").display().to_string();
        {
            let guard = open_guard(&config).unwrap();
            guard.create_table("aa", &["id"], &["int"], None).unwrap();
            guard.insert_sql("INSERT INTO aa VALUES (1),(2),(3);").unwrap();
        }

        run(
            Commands::Copy {
                src: "aa".into(),
                dst: "bb".into(),
                from: None,
            },
            &config,
        )
        .await
        .unwrap();

        let guard = open_guard(&config).unwrap();
        assert_eq!(
            guard
                .row_count("bb", tablekeep_storage::Filter::All)
                .unwrap(),
            3
        );
    }
}
