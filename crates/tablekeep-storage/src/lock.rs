// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reader/writer access lock guarding the connection handle.
//!
//! The lock is not re-entrant. Taking it twice from the same thread, in any
//! mode combination, may deadlock. Code that already holds write mode calls
//! the `*_locked` helpers in [`crate::copy`], which demand a [`WriteScope`]
//! instead of locking again.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub(crate) struct AccessLock {
    inner: RwLock<()>,
}

/// Proof that read mode is held. Released on drop.
pub(crate) struct ReadScope<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

/// Proof that write mode is held. Released on drop.
///
/// Functions that must only run under an exclusive lock take `&WriteScope`.
pub(crate) struct WriteScope<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
}

impl AccessLock {
    pub(crate) fn read(&self) -> ReadScope<'_> {
        // The lock guards no data; a panic in another holder leaves nothing torn.
        ReadScope {
            _guard: self.inner.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub(crate) fn write(&self) -> WriteScope<'_> {
        WriteScope {
            _guard: self.inner.write().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn readers_share_the_lock() {
        let lock = AccessLock::default();
        let _a = lock.read();
        let _b = lock.read();
        assert!(lock.inner.try_write().is_err());
    }

    #[test]
    fn writer_excludes_readers_until_scope_ends() {
        let lock = Arc::new(AccessLock::default());
        let released = Arc::new(AtomicBool::new(false));

        let scope = lock.write();
        let reader = {
            let lock = Arc::clone(&lock);
            let released = Arc::clone(&released);
            std::thread::spawn(move || {
                let _r = lock.read();
                assert!(released.load(Ordering::SeqCst), "reader ran inside write scope");
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(scope);
        reader.join().unwrap();
    }
}
