// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide registry of connection names that currently hold a handle.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex, PoisonError};

static NAMES: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Claim `name`. Returns `false` if another guard already holds it.
pub(crate) fn claim(name: &str) -> bool {
    NAMES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string())
}

pub(crate) fn release(name: &str) {
    NAMES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name);
}

/// Returns `true` while some guard holds an open handle under `name`.
pub fn is_registered(name: &str) -> bool {
    NAMES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(name)
}
