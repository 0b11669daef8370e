// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle: open, close, integrity check and maintenance.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use tablekeep_config::TablekeepConfig;
use tablekeep_core::{GuardError, IdentifierPolicy};
use tracing::{debug, warn};

use crate::lock::{AccessLock, WriteScope};
use crate::registry;

/// Behaviour knobs applied when a guard opens its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    /// How table and column names are vetted.
    pub identifier_policy: IdentifierPolicy,
    /// Issue `PRAGMA synchronous = OFF` after opening. Faster writes, at the
    /// risk of a corrupt file if the machine loses power mid-write.
    pub synchronous_off: bool,
    /// How long SQLite retries a locked database before giving up.
    pub busy_timeout: Option<Duration>,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            identifier_policy: IdentifierPolicy::Strict,
            synchronous_off: true,
            busy_timeout: None,
        }
    }
}

impl GuardOptions {
    pub fn from_config(config: &TablekeepConfig) -> Self {
        Self {
            identifier_policy: config.guard.identifier_policy,
            synchronous_off: config.connection.synchronous_off,
            busy_timeout: config.connection.busy_timeout_ms.map(Duration::from_millis),
        }
    }
}

struct Handle {
    conn: Connection,
    path: PathBuf,
}

/// Owns one named SQLite handle and serializes access to it.
///
/// The handle is invalid until [`open`](Self::open) succeeds and again after
/// [`close`](Self::close). Dropping the guard closes an open handle.
pub struct ConnectionGuard {
    name: String,
    options: GuardOptions,
    handle: Mutex<Option<Handle>>,
    lock: AccessLock,
}

impl ConnectionGuard {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, GuardOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: GuardOptions) -> Self {
        Self {
            name: name.into(),
            options,
            handle: Mutex::new(None),
            lock: AccessLock::default(),
        }
    }

    /// Build an unopened guard named and tuned by `config`.
    pub fn from_config(config: &TablekeepConfig) -> Self {
        Self::with_options(
            config.connection.name.clone(),
            GuardOptions::from_config(config),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    pub(crate) fn policy(&self) -> IdentifierPolicy {
        self.options.identifier_policy
    }

    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Path of the open database file, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.slot().as_ref().map(|h| h.path.clone())
    }

    /// Open the database file at `path` under this guard's name.
    ///
    /// Succeeds immediately if this guard already holds a handle. Fails with
    /// [`GuardError::Connection`] if another guard holds the name or the file
    /// cannot be opened.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<(), GuardError> {
        let path = path.as_ref();
        let _scope = self.lock.write();
        let mut slot = self.slot();
        if slot.is_some() {
            return Ok(());
        }
        if !registry::claim(&self.name) {
            warn!(name = %self.name, "connection name already in use");
            return Err(GuardError::connection(format!(
                "connection name `{}` is held by another guard",
                self.name
            )));
        }

        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(e) => {
                registry::release(&self.name);
                warn!(name = %self.name, path = %path.display(), error = %e, "open database failed");
                return Err(GuardError::connection(format!(
                    "failed to open `{}`",
                    path.display()
                )));
            }
        };

        if let Some(timeout) = self.options.busy_timeout
            && let Err(e) = conn.busy_timeout(timeout)
        {
            warn!(name = %self.name, error = %e, "busy_timeout rejected");
        }
        if self.options.synchronous_off
            && let Err(e) = conn.execute_batch("PRAGMA synchronous = OFF;")
        {
            warn!(name = %self.name, error = %e, "pragma synchronous rejected");
        }

        debug!(name = %self.name, path = %path.display(), "connection opened");
        *slot = Some(Handle {
            conn,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Close the handle and release the connection name. Repeated calls are
    /// no-ops.
    pub fn close(&self) {
        let _scope = self.lock.write();
        let Some(handle) = self.slot().take() else {
            return;
        };
        if let Err((_conn, e)) = handle.conn.close() {
            warn!(name = %self.name, error = %e, "close reported an error, dropping handle");
        }
        registry::release(&self.name);
        debug!(name = %self.name, "connection closed");
    }

    /// Run `PRAGMA quick_check`.
    ///
    /// Returns `false` only when SQLite explicitly reports a problem. When the
    /// check itself cannot run (closed guard, unsupported pragma, I/O error)
    /// the database is assumed healthy and `true` is returned.
    pub fn integrity_check(&self) -> bool {
        let outcome = self.read(|conn| {
            conn.query_row("PRAGMA quick_check;", [], |row| row.get::<_, String>(0))
                .optional()
                .map_err(|e| engine_error("quick_check", "PRAGMA quick_check;", e))
        });
        match outcome {
            Ok(Some(report)) if report == "ok" => true,
            Ok(Some(report)) => {
                warn!(name = %self.name, %report, "database failed integrity check");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(name = %self.name, error = %e, "integrity check could not run, assuming healthy");
                true
            }
        }
    }

    /// Rebuild the database file, returning free pages to the filesystem.
    pub fn vacuum(&self) -> Result<(), GuardError> {
        self.write(|_scope, conn| {
            conn.execute_batch("VACUUM;")
                .map_err(|e| engine_error("vacuum", "VACUUM;", e))
        })
    }

    /// Names of the user tables in the main database, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, GuardError> {
        const SQL: &str = "SELECT name FROM sqlite_master
                           WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                           ORDER BY name";
        self.read(|conn| {
            let mut stmt = conn
                .prepare(SQL)
                .map_err(|e| engine_error("list tables", SQL, e))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| engine_error("list tables", SQL, e))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| engine_error("list tables", SQL, e))
        })
    }

    /// Run `f` on the handle with the access lock held in read mode.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, GuardError>,
    ) -> Result<T, GuardError> {
        let _scope = self.lock.read();
        self.with_handle(|conn| f(&*conn))
    }

    /// Run `f` on the handle with the access lock held in write mode for the
    /// whole call.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&WriteScope<'_>, &mut Connection) -> Result<T, GuardError>,
    ) -> Result<T, GuardError> {
        let scope = self.lock.write();
        self.with_handle(|conn| f(&scope, conn))
    }

    fn with_handle<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, GuardError>,
    ) -> Result<T, GuardError> {
        let mut slot = self.slot();
        let handle = slot.as_mut().ok_or_else(|| {
            GuardError::connection(format!("connection `{}` is not open", self.name))
        })?;
        f(&mut handle.conn)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Handle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("path", &self.path())
            .finish()
    }
}

/// Log a rejected statement and wrap the engine error.
pub(crate) fn engine_error(op: &'static str, sql: &str, err: rusqlite::Error) -> GuardError {
    warn!(op, sql = %sql, error = %err, "statement failed");
    GuardError::execution(format!("{op} failed"), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open_guard, unique_name};
    use tempfile::tempdir;

    #[test]
    fn open_creates_file_and_registers_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let guard = ConnectionGuard::new(unique_name("open"));

        assert!(!guard.is_open());
        guard.open(&path).unwrap();
        assert!(guard.is_open());
        assert!(path.exists(), "database file should be created");
        assert!(registry::is_registered(guard.name()));
        assert_eq!(guard.path().as_deref(), Some(path.as_path()));
    }

    #[test]
    fn open_twice_is_a_noop() {
        let (guard, dir) = open_guard("reopen");
        let first = guard.path();
        guard.open(dir.path().join("other.db")).unwrap();
        assert_eq!(guard.path(), first, "second open must keep the first handle");
    }

    #[test]
    fn open_failure_releases_name() {
        let dir = tempdir().unwrap();
        let guard = ConnectionGuard::new(unique_name("badpath"));
        let err = guard
            .open(dir.path().join("missing").join("nested").join("x.db"))
            .unwrap_err();
        assert!(matches!(err, GuardError::Connection { .. }));
        assert!(!guard.is_open());
        assert!(!registry::is_registered(guard.name()));
    }

    #[test]
    fn second_guard_cannot_claim_a_held_name() {
        let (first, dir) = open_guard("shared");
        let second = ConnectionGuard::new(first.name());
        let err = second.open(dir.path().join("second.db")).unwrap_err();
        assert!(matches!(err, GuardError::Connection { .. }));

        first.close();
        second.open(dir.path().join("second.db")).unwrap();
        assert!(second.is_open());
    }

    #[test]
    fn close_is_idempotent_and_releases_name() {
        let (guard, _dir) = open_guard("close");
        guard.close();
        guard.close();
        assert!(!guard.is_open());
        assert!(!registry::is_registered(guard.name()));
    }

    #[test]
    fn drop_releases_name() {
        let (guard, _dir) = open_guard("drop");
        let name = guard.name().to_string();
        drop(guard);
        assert!(!registry::is_registered(&name));
    }

    #[test]
    fn operations_on_closed_guard_fail_with_connection_error() {
        let guard = ConnectionGuard::new(unique_name("closed"));
        assert!(matches!(
            guard.list_tables(),
            Err(GuardError::Connection { .. })
        ));
        assert!(matches!(guard.vacuum(), Err(GuardError::Connection { .. })));
    }

    #[test]
    fn synchronous_is_switched_off_by_default() {
        let (guard, _dir) = open_guard("sync");
        let mode: i64 = guard
            .read(|conn| {
                conn.query_row("PRAGMA synchronous;", [], |row| row.get(0))
                    .map_err(|e| engine_error("read pragma", "PRAGMA synchronous;", e))
            })
            .unwrap();
        assert_eq!(mode, 0);
    }

    #[test]
    fn synchronous_left_alone_when_disabled() {
        let options = GuardOptions {
            synchronous_off: false,
            ..GuardOptions::default()
        };
        let (guard, _dir) = crate::testing::open_guard_with("sync-on", options);
        let mode: i64 = guard
            .read(|conn| {
                conn.query_row("PRAGMA synchronous;", [], |row| row.get(0))
                    .map_err(|e| engine_error("read pragma", "PRAGMA synchronous;", e))
            })
            .unwrap();
        assert_ne!(mode, 0);
    }

    #[test]
    fn integrity_check_passes_on_fresh_database() {
        let (guard, _dir) = open_guard("integrity");
        guard
            .create_table("t", &["id"], &["int"], None)
            .unwrap();
        assert!(guard.integrity_check());
    }

    #[test]
    fn integrity_check_fails_open_when_check_cannot_run() {
        let guard = ConnectionGuard::new(unique_name("integrity-closed"));
        assert!(guard.integrity_check(), "unrunnable check must report healthy");
    }

    #[test]
    fn integrity_check_fails_open_when_the_pragma_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"not a database, just text ".repeat(64)).unwrap();

        // Opening is lazy, so the handle is live until the first real read.
        let guard = ConnectionGuard::new(unique_name("integrity-garbage"));
        guard.open(&path).unwrap();
        assert!(guard.is_open());
        assert!(matches!(
            guard.list_tables(),
            Err(GuardError::Execution { .. })
        ));
        assert!(guard.integrity_check(), "a failing pragma must report healthy");
    }

    #[test]
    fn list_tables_and_vacuum() {
        let (guard, _dir) = open_guard("tables");
        guard.create_table("b", &["id"], &["int"], None).unwrap();
        guard.create_table("a", &["id"], &["int"], None).unwrap();
        assert_eq!(guard.list_tables().unwrap(), vec!["a", "b"]);
        guard.vacuum().unwrap();
    }

    #[test]
    #[tracing_test::traced_test]
    fn rejected_statement_is_logged_with_its_sql() {
        let (guard, _dir) = open_guard("logged");
        let err = guard.alter_table("ALTER TABLE ghost ADD COLUMN x").unwrap_err();
        assert!(matches!(err, GuardError::Execution { .. }));
        assert!(logs_contain("statement failed"));
        assert!(logs_contain("ALTER TABLE ghost ADD COLUMN x"));
    }

    #[test]
    fn options_follow_config() {
        let mut config = TablekeepConfig::default();
        config.connection.name = "from-config".to_string();
        config.connection.synchronous_off = false;
        config.connection.busy_timeout_ms = Some(2500);
        config.guard.identifier_policy = IdentifierPolicy::Verbatim;

        let guard = ConnectionGuard::from_config(&config);
        assert_eq!(guard.name(), "from-config");
        assert_eq!(
            guard.options(),
            &GuardOptions {
                identifier_policy: IdentifierPolicy::Verbatim,
                synchronous_off: false,
                busy_timeout: Some(Duration::from_millis(2500)),
            }
        );
    }
}
