// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection guard for a single SQLite database.
//!
//! A [`ConnectionGuard`] owns one named `rusqlite` handle and funnels every
//! operation through a reader/writer access lock: schema changes, row writes,
//! attach/detach and table copies take it in write mode, queries in read mode.
//! Multi-statement procedures ([`ConnectionGuard::copy_table`],
//! [`ConnectionGuard::insert_batch`]) hold write mode from start to finish, so
//! concurrent readers observe either the state before or after them.
//!
//! Share a guard between threads or tasks by wrapping it in an `Arc`.

pub mod copy;
pub mod guard;
mod lock;
mod registry;
pub mod rows;
pub mod schema;
pub mod select;
pub mod sql;

pub use guard::{ConnectionGuard, GuardOptions};
pub use registry::is_registered;
pub use rusqlite::types::Value;
pub use sql::Filter;
