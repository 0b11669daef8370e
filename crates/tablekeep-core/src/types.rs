// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the guard, its configuration and the binary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::GuardError;

/// How table and column names are vetted before they are spliced into SQL.
///
/// Names cannot be bound as parameters, so they end up in the statement text.
/// `Strict` only admits plain identifiers, optionally qualified by one schema
/// name (`main.t`). `Verbatim` passes names through untouched and leaves
/// quoting and injection safety to the caller.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IdentifierPolicy {
    #[default]
    Strict,
    Verbatim,
}

impl IdentifierPolicy {
    /// Check a table or column name against this policy.
    pub fn check(self, ident: &str) -> Result<(), GuardError> {
        match self {
            IdentifierPolicy::Verbatim => {
                if ident.trim().is_empty() {
                    return Err(GuardError::schema("identifier must not be empty"));
                }
                Ok(())
            }
            IdentifierPolicy::Strict => {
                let mut parts = ident.split('.');
                let valid = match (parts.next(), parts.next(), parts.next()) {
                    (Some(name), None, None) => is_plain_identifier(name),
                    (Some(schema), Some(name), None) => {
                        is_plain_identifier(schema) && is_plain_identifier(name)
                    }
                    _ => false,
                };
                if valid {
                    Ok(())
                } else {
                    Err(GuardError::schema(format!(
                        "`{ident}` is not a plain identifier"
                    )))
                }
            }
        }
    }

    /// Check every name in `idents`, stopping at the first rejection.
    pub fn check_all<S: AsRef<str>>(self, idents: &[S]) -> Result<(), GuardError> {
        idents.iter().try_for_each(|i| self.check(i.as_ref()))
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
