// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tablekeep check`: integrity check and table inventory.

use std::io::IsTerminal;

use tablekeep_core::GuardError;
use tablekeep_storage::{ConnectionGuard, Filter};
use tracing::warn;

/// Outcome of a check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub healthy: bool,
    /// Every user table with its row count, `None` where it could not be
    /// counted.
    pub tables: Vec<(String, Option<i64>)>,
}

pub fn collect(guard: &ConnectionGuard) -> Result<CheckReport, GuardError> {
    let healthy = guard.integrity_check();
    let tables = guard
        .list_tables()?
        .into_iter()
        .map(|table| {
            let rows = match guard.row_count(&table, Filter::All) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!(%table, error = %e, "could not count rows");
                    None
                }
            };
            (table, rows)
        })
        .collect();
    Ok(CheckReport { healthy, tables })
}

/// Run the check and print the report. Fails if the integrity check does.
pub fn run_check(guard: &ConnectionGuard, plain: bool) -> Result<(), GuardError> {
    let report = collect(guard)?;
    let use_color = !plain && std::io::stdout().is_terminal();

    println!();
    println!("  tablekeep check ({})", guard.name());
    println!("  {}", "-".repeat(50));
    let status = match (report.healthy, use_color) {
        (true, true) => {
            use colored::Colorize;
            "ok".green().to_string()
        }
        (false, true) => {
            use colored::Colorize;
            "FAILED".red().to_string()
        }
        (true, false) => "ok".to_string(),
        (false, false) => "FAILED".to_string(),
    };
    println!("    {:<20} {status}", "integrity");
    for (table, rows) in &report.tables {
        match rows {
            Some(rows) => println!("    {table:<20} {rows} rows"),
            None => println!("    {table:<20} (not countable)"),
        }
    }
    println!();

    if report.healthy {
        Ok(())
    } else {
        Err(GuardError::Internal("database failed its integrity check".into()))
    }
}
