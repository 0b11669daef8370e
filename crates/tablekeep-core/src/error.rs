// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tablekeep connection guard.

use thiserror::Error;

/// The error type returned by every fallible guard operation.
///
/// Engine detail (native error text, the rejected SQL) is logged at the
/// failure site; the variant tells the caller which class of failure occurred.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Opening or closing the handle failed, the guard is not open, or the
    /// connection name is held by another guard.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Malformed or mismatched column, type, value or identifier input.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The engine rejected or failed a statement.
    #[error("execution error: {message}")]
    Execution {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lookup that must produce a row produced none.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuardError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Wrap an engine error, keeping it as the error source.
    pub fn execution<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Execution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}
