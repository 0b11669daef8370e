// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only queries. All of them hold the access lock in read mode.

use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params_from_iter};
use tablekeep_core::GuardError;
use tracing::debug;

use crate::guard::{ConnectionGuard, engine_error};
use crate::sql::{self, Filter};

impl ConnectionGuard {
    /// First value of `column` among the rows `filter` selects, or `None`
    /// when no row matches.
    pub fn select_value(
        &self,
        table: &str,
        column: &str,
        filter: Filter<'_>,
    ) -> Result<Option<Value>, GuardError> {
        let stmt = sql::select(self.policy(), table, &[column], &filter, false)?;
        let value = self.read(|conn| {
            conn.query_row(&stmt, params_from_iter(filter.bound()), |row| row.get(0))
                .optional()
                .map_err(|e| engine_error("select", &stmt, e))
        })?;
        if value.is_none() {
            debug!(sql = %stmt, "no matching row");
        }
        Ok(value)
    }

    /// The listed columns of the first matching row, or `None` when no row
    /// matches. An empty `column_names` returns the whole row.
    pub fn select_row<S: AsRef<str>>(
        &self,
        table: &str,
        column_names: &[S],
        filter: Filter<'_>,
    ) -> Result<Option<Vec<Value>>, GuardError> {
        let stmt = sql::select(self.policy(), table, column_names, &filter, false)?;
        let row = self.read(|conn| {
            let mut prepared = conn
                .prepare(&stmt)
                .map_err(|e| engine_error("select", &stmt, e))?;
            let width = prepared.column_count();
            prepared
                .query_row(params_from_iter(filter.bound()), |row| {
                    (0..width).map(|i| row.get(i)).collect::<Result<Vec<Value>, _>>()
                })
                .optional()
                .map_err(|e| engine_error("select", &stmt, e))
        })?;
        if row.is_none() {
            debug!(sql = %stmt, "no matching row");
        }
        Ok(row)
    }

    /// Every value of `column` among the rows `filter` selects, with
    /// duplicates removed when `distinct` is set.
    pub fn select_column(
        &self,
        table: &str,
        column: &str,
        filter: Filter<'_>,
        distinct: bool,
    ) -> Result<Vec<Value>, GuardError> {
        let stmt = sql::select(self.policy(), table, &[column], &filter, distinct)?;
        self.read(|conn| {
            let mut prepared = conn
                .prepare(&stmt)
                .map_err(|e| engine_error("select", &stmt, e))?;
            let rows = prepared
                .query_map(params_from_iter(filter.bound()), |row| row.get(0))
                .map_err(|e| engine_error("select", &stmt, e))?;
            rows.collect::<Result<Vec<Value>, _>>()
                .map_err(|e| engine_error("select", &stmt, e))
        })
    }

    /// Number of rows `filter` selects.
    pub fn row_count(&self, table: &str, filter: Filter<'_>) -> Result<i64, GuardError> {
        let stmt = sql::count(self.policy(), table, &filter)?;
        self.read(|conn| {
            conn.query_row(&stmt, params_from_iter(filter.bound()), |row| row.get(0))
                .map_err(|e| engine_error("count rows", &stmt, e))
        })
    }

    /// Whether a table named `table` exists in the main database.
    pub fn table_exists(&self, table: &str) -> Result<bool, GuardError> {
        const SQL: &str =
            "SELECT count(*) FROM main.sqlite_master WHERE type = 'table' AND name = ?1 \
             COLLATE NOCASE";
        self.read(|conn| {
            conn.query_row(SQL, [table], |row| row.get::<_, i64>(0))
                .map(|n| n > 0)
                .map_err(|e| engine_error("table exists", SQL, e))
        })
    }
}
