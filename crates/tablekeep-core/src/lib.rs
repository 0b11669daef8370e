// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for tablekeep.
//!
//! Holds the error taxonomy returned by every guard operation and the small
//! set of types shared between the storage, configuration and binary crates.

pub mod error;
pub mod types;

pub use error::GuardError;
pub use types::IdentifierPolicy;
