// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row writes: insert, batch insert, update and delete.

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tablekeep_core::GuardError;
use tracing::{debug, warn};

use crate::guard::{ConnectionGuard, engine_error};
use crate::sql::{self, Filter};

impl ConnectionGuard {
    /// Insert one row. With an empty `column_names`, `values` must cover every
    /// column of the table in declaration order.
    pub fn insert_row<S: AsRef<str>>(
        &self,
        table: &str,
        values: &[Value],
        column_names: &[S],
    ) -> Result<(), GuardError> {
        let stmt = sql::insert(self.policy(), table, values.len(), column_names)?;
        self.write(|_scope, conn| {
            conn.execute(&stmt, params_from_iter(values))
                .map_err(|e| engine_error("insert", &stmt, e))
        })?;
        Ok(())
    }

    /// Insert many rows from column-oriented lists, one `Vec` per column and
    /// one entry per row. Returns the number of rows inserted.
    ///
    /// The batch runs inside a transaction when one can be started: a failing
    /// row rolls the whole batch back. If the handle is already inside a
    /// transaction (opened through raw SQL, for instance) the rows are inserted
    /// one statement at a time without a transaction of their own, so a
    /// failure part-way leaves the earlier rows in place.
    pub fn insert_batch<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[Vec<Value>],
        column_names: &[S],
    ) -> Result<usize, GuardError> {
        let stmt = sql::insert(self.policy(), table, columns.len(), column_names)?;
        let rows = batch_len(columns)?;

        self.write(|_scope, conn| {
            if !conn.is_autocommit() {
                warn!(table, "transaction already open, inserting batch without one");
                return insert_rows(conn, &stmt, columns, rows);
            }
            match conn.transaction() {
                Ok(tx) => {
                    return match insert_rows(&tx, &stmt, columns, rows) {
                        Ok(inserted) => {
                            tx.commit()
                                .map_err(|e| engine_error("commit batch insert", &stmt, e))?;
                            debug!(table, rows = inserted, "batch committed");
                            Ok(inserted)
                        }
                        Err(e) => {
                            if let Err(rollback) = tx.rollback() {
                                warn!(table, error = %rollback, "rollback of failed batch failed");
                            }
                            Err(e)
                        }
                    };
                }
                Err(e) => {
                    warn!(table, error = %e, "could not begin transaction, inserting batch without one");
                }
            }
            insert_rows(conn, &stmt, columns, rows)
        })
    }

    /// Run a caller-written `INSERT` statement verbatim.
    pub fn insert_sql(&self, insert_sql: &str) -> Result<(), GuardError> {
        self.write(|_scope, conn| {
            conn.execute_batch(insert_sql)
                .map_err(|e| engine_error("insert", insert_sql, e))
        })
    }

    /// Set `column_names` to `values` on the rows `filter` selects. Returns
    /// the number of rows changed.
    pub fn update_row<S: AsRef<str>>(
        &self,
        table: &str,
        column_names: &[S],
        values: &[Value],
        filter: Filter<'_>,
    ) -> Result<usize, GuardError> {
        if column_names.len() != values.len() {
            return Err(GuardError::schema(format!(
                "{} column names but {} values",
                column_names.len(),
                values.len()
            )));
        }
        let stmt = sql::update(self.policy(), table, column_names, &filter)?;
        self.write(|_scope, conn| {
            conn.execute(&stmt, params_from_iter(values.iter().chain(filter.bound())))
                .map_err(|e| engine_error("update", &stmt, e))
        })
    }

    /// Set one column on the rows `filter` selects.
    pub fn update_value(
        &self,
        table: &str,
        column: &str,
        value: impl Into<Value>,
        filter: Filter<'_>,
    ) -> Result<usize, GuardError> {
        self.update_row(table, &[column], &[value.into()], filter)
    }

    /// Run a caller-written `UPDATE` statement verbatim.
    pub fn update_sql(&self, update_sql: &str) -> Result<(), GuardError> {
        self.write(|_scope, conn| {
            conn.execute_batch(update_sql)
                .map_err(|e| engine_error("update", update_sql, e))
        })
    }

    /// Delete the rows `filter` selects. Returns the number of rows removed.
    pub fn delete_rows(&self, table: &str, filter: Filter<'_>) -> Result<usize, GuardError> {
        let stmt = sql::delete(self.policy(), table, &filter)?;
        self.write(|_scope, conn| {
            conn.execute(&stmt, params_from_iter(filter.bound()))
                .map_err(|e| engine_error("delete", &stmt, e))
        })
    }
}

/// Row count of a column-oriented batch; every column must have it.
fn batch_len(columns: &[Vec<Value>]) -> Result<usize, GuardError> {
    let rows = columns.first().map(Vec::len).unwrap_or(0);
    if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows) {
        return Err(GuardError::schema(format!(
            "column {i} holds {} values, expected {rows}",
            col.len()
        )));
    }
    Ok(rows)
}

fn insert_rows(
    conn: &Connection,
    stmt: &str,
    columns: &[Vec<Value>],
    rows: usize,
) -> Result<usize, GuardError> {
    let mut prepared = conn
        .prepare_cached(stmt)
        .map_err(|e| engine_error("batch insert", stmt, e))?;
    for row in 0..rows {
        prepared
            .execute(params_from_iter(columns.iter().map(|col| &col[row])))
            .map_err(|e| engine_error("batch insert", stmt, e))?;
    }
    Ok(rows)
}
