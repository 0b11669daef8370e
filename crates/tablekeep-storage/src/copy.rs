// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table copy within one database file or from another file.
//!
//! A copy is several statements (truncate or create, then insert-select, plus
//! attach/detach across files). SQLite does not run them as one unit, so the
//! whole procedure holds the access lock in write mode and readers never see
//! the destination half-filled. The helpers below run inside that scope and
//! take a [`WriteScope`] rather than locking again: the lock is not
//! re-entrant, and a nested read would deadlock.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tablekeep_core::GuardError;
use tracing::{debug, warn};

use crate::guard::{ConnectionGuard, engine_error};
use crate::lock::WriteScope;
use crate::sql;

/// Alias under which the source file is attached during a cross-file copy.
pub const SOURCE_ALIAS: &str = "source_db";

impl ConnectionGuard {
    /// Copy `src` into `dst` inside the open database.
    ///
    /// An existing `dst` keeps its schema and loses its rows before the copy.
    /// A missing `dst` is created from `src`'s stored `CREATE TABLE`
    /// statement. Copying a table onto itself is a [`GuardError::Schema`].
    pub fn copy_table(&self, src: &str, dst: &str) -> Result<(), GuardError> {
        self.policy().check(src)?;
        self.policy().check(dst)?;
        // Table names are case-insensitive; copying onto itself would empty it.
        if src.eq_ignore_ascii_case(dst) {
            return Err(GuardError::schema(format!(
                "cannot copy table `{src}` onto itself"
            )));
        }
        self.write(|scope, conn| {
            prepare_destination_locked(scope, conn, "main", src, dst)?;
            copy_rows_locked(scope, conn, src, dst)?;
            debug!(src, dst, "table copied");
            Ok(())
        })
    }

    /// Copy table `src` of the database file `src_db` into `dst` of the open
    /// database. The source file is attached for the duration of the copy and
    /// detached again on every path, including failures. A missing `src_db`
    /// is [`GuardError::NotFound`] and is never created.
    pub fn copy_table_from(
        &self,
        src_db: impl AsRef<Path>,
        src: &str,
        dst: &str,
    ) -> Result<(), GuardError> {
        self.policy().check(src)?;
        self.policy().check(dst)?;
        let src_db = src_db.as_ref();
        // ATTACH would create a missing file.
        if !src_db.exists() {
            return Err(GuardError::not_found(format!(
                "database file `{}`",
                src_db.display()
            )));
        }
        self.write(|scope, conn| {
            let conn: &Connection = conn;
            attach_locked(scope, conn, src_db)?;
            let copied = prepare_destination_locked(scope, conn, SOURCE_ALIAS, src, dst)
                .and_then(|()| {
                    copy_rows_locked(scope, conn, &format!("{SOURCE_ALIAS}.{src}"), dst)
                });
            let detached = detach_locked(scope, conn);
            copied?;
            detached?;
            debug!(src_db = %src_db.display(), src, dst, "table copied across databases");
            Ok(())
        })
    }
}

/// Empty or create `dst` so it can receive `schema.src`'s rows.
///
/// The source definition is looked up first, so a missing source leaves an
/// existing destination untouched.
fn prepare_destination_locked(
    scope: &WriteScope<'_>,
    conn: &Connection,
    schema: &str,
    src: &str,
    dst: &str,
) -> Result<(), GuardError> {
    let create = creation_sql_locked(scope, conn, schema, src)?
        .ok_or_else(|| GuardError::not_found(format!("table `{schema}.{src}`")))?;

    if table_exists_locked(scope, conn, dst)? {
        let stmt = format!("DELETE FROM main.{dst}");
        conn.execute(&stmt, [])
            .map_err(|e| engine_error("truncate copy destination", &stmt, e))?;
        return Ok(());
    }

    let renamed = sql::rename_create_statement(&create, src, dst).ok_or_else(|| {
        warn!(sql = %create, src, "stored definition does not name the source table");
        GuardError::schema(format!("cannot derive a definition for `{dst}` from `{src}`"))
    })?;
    conn.execute_batch(&renamed)
        .map_err(|e| engine_error("create copy destination", &renamed, e))
}

/// Existence check for use under a held write lock only.
pub(crate) fn table_exists_locked(
    _scope: &WriteScope<'_>,
    conn: &Connection,
    table: &str,
) -> Result<bool, GuardError> {
    const SQL: &str =
        "SELECT count(*) FROM main.sqlite_master WHERE type = 'table' AND name = ?1 \
             COLLATE NOCASE";
    conn.query_row(SQL, [table], |row| row.get::<_, i64>(0))
        .map(|n| n > 0)
        .map_err(|e| engine_error("table exists", SQL, e))
}

/// Stored `CREATE TABLE` text of `schema.table`, for use under a held write
/// lock only.
pub(crate) fn creation_sql_locked(
    _scope: &WriteScope<'_>,
    conn: &Connection,
    schema: &str,
    table: &str,
) -> Result<Option<String>, GuardError> {
    let stmt = format!(
        "SELECT sql FROM {schema}.sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE"
    );
    conn.query_row(&stmt, [table], |row| row.get::<_, String>(0))
        .optional()
        .map_err(|e| engine_error("read table definition", &stmt, e))
}

fn copy_rows_locked(
    _scope: &WriteScope<'_>,
    conn: &Connection,
    src: &str,
    dst: &str,
) -> Result<(), GuardError> {
    let stmt = format!("INSERT INTO main.{dst} SELECT * FROM {src}");
    let copied = conn
        .execute(&stmt, [])
        .map_err(|e| engine_error("copy rows", &stmt, e))?;
    debug!(src, dst, rows = copied, "rows copied");
    Ok(())
}

fn attach_locked(_scope: &WriteScope<'_>, conn: &Connection, path: &Path) -> Result<(), GuardError> {
    let stmt = format!("ATTACH DATABASE ?1 AS {SOURCE_ALIAS}");
    conn.execute(&stmt, [path.to_string_lossy()])
        .map_err(|e| engine_error("attach database", &stmt, e))?;
    Ok(())
}

fn detach_locked(_scope: &WriteScope<'_>, conn: &Connection) -> Result<(), GuardError> {
    let stmt = format!("DETACH DATABASE {SOURCE_ALIAS}");
    conn.execute(&stmt, [])
        .map_err(|e| engine_error("detach database", &stmt, e))?;
    Ok(())
}
