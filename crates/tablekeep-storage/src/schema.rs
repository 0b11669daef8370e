// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table definition: create, alter and drop.

use tablekeep_core::GuardError;
use tracing::debug;

use crate::guard::{ConnectionGuard, engine_error};
use crate::sql;

impl ConnectionGuard {
    /// Create `table` from parallel name and type lists, unless it exists.
    ///
    /// `constraint` is an optional table-level constraint appended after the
    /// columns, e.g. `primary key(id, name)`. Calling this again for an
    /// existing table changes nothing.
    pub fn create_table<S: AsRef<str>, T: AsRef<str>>(
        &self,
        table: &str,
        column_names: &[S],
        column_types: &[T],
        constraint: Option<&str>,
    ) -> Result<(), GuardError> {
        let stmt = sql::create_table(
            self.policy(),
            table,
            column_names,
            column_types,
            constraint,
        )?;
        self.write(|_scope, conn| {
            conn.execute_batch(&stmt)
                .map_err(|e| engine_error("create table", &stmt, e))
        })?;
        debug!(table, "table created");
        Ok(())
    }

    /// Run a caller-written `CREATE TABLE` statement verbatim.
    pub fn create_table_sql(&self, create_sql: &str) -> Result<(), GuardError> {
        self.write(|_scope, conn| {
            conn.execute_batch(create_sql)
                .map_err(|e| engine_error("create table", create_sql, e))
        })
    }

    /// Run a caller-written `ALTER TABLE` statement verbatim. SQLite only
    /// supports renaming tables and columns and adding or dropping columns.
    pub fn alter_table(&self, alter_sql: &str) -> Result<(), GuardError> {
        self.write(|_scope, conn| {
            conn.execute_batch(alter_sql)
                .map_err(|e| engine_error("alter table", alter_sql, e))
        })
    }

    /// Drop `table` if it exists.
    pub fn drop_table(&self, table: &str) -> Result<(), GuardError> {
        let stmt = sql::drop_table(self.policy(), table)?;
        self.write(|_scope, conn| {
            conn.execute_batch(&stmt)
                .map_err(|e| engine_error("drop table", &stmt, e))
        })?;
        debug!(table, "table dropped");
        Ok(())
    }
}
