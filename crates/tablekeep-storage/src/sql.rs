// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statement text for the structured operations.
//!
//! Values are always bound as numbered parameters (`?1`, `?2`, ...). Table and
//! column names cannot be bound, so they are vetted by the guard's
//! [`IdentifierPolicy`] before they reach the statement text.

use rusqlite::types::Value;
use tablekeep_core::{GuardError, IdentifierPolicy};

/// Which rows an update, delete or query addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<'a> {
    /// Every row of the table.
    All,
    /// A caller-written `WHERE` body, spliced in verbatim. An empty or
    /// whitespace-only fragment behaves like [`Filter::All`].
    Where(&'a str),
    /// Rows whose column equals a bound value.
    Eq(&'a str, Value),
}

impl<'a> Filter<'a> {
    pub fn eq(column: &'a str, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    /// The bound value, if this filter carries one.
    pub fn bound(&self) -> Option<&Value> {
        match self {
            Filter::Eq(_, value) => Some(value),
            _ => None,
        }
    }

    /// Render the ` WHERE ...` suffix. `param` is the number of the placeholder
    /// the equality value binds to.
    fn clause(&self, policy: IdentifierPolicy, param: usize) -> Result<String, GuardError> {
        match self {
            Filter::All => Ok(String::new()),
            Filter::Where(body) if body.trim().is_empty() => Ok(String::new()),
            Filter::Where(body) => Ok(format!(" WHERE {}", body.trim())),
            Filter::Eq(column, _) => {
                policy.check(column)?;
                Ok(format!(" WHERE {column} = ?{param}"))
            }
        }
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn create_table<S: AsRef<str>, T: AsRef<str>>(
    policy: IdentifierPolicy,
    table: &str,
    column_names: &[S],
    column_types: &[T],
    constraint: Option<&str>,
) -> Result<String, GuardError> {
    if column_names.len() != column_types.len() {
        return Err(GuardError::schema(format!(
            "{} column names but {} column types",
            column_names.len(),
            column_types.len()
        )));
    }
    if column_names.is_empty() {
        return Err(GuardError::schema("a table needs at least one column"));
    }
    policy.check(table)?;
    policy.check_all(column_names)?;

    let mut defs = Vec::with_capacity(column_names.len() + 1);
    for (name, ty) in column_names.iter().zip(column_types) {
        let ty = ty.as_ref().trim();
        if ty.is_empty() {
            return Err(GuardError::schema(format!(
                "column `{}` has no type",
                name.as_ref()
            )));
        }
        defs.push(format!("{} {ty}", name.as_ref()));
    }
    if let Some(constraint) = constraint.map(str::trim).filter(|c| !c.is_empty()) {
        defs.push(constraint.to_string());
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        defs.join(", ")
    ))
}

pub(crate) fn drop_table(policy: IdentifierPolicy, table: &str) -> Result<String, GuardError> {
    policy.check(table)?;
    Ok(format!("DROP TABLE IF EXISTS {table}"))
}

/// `INSERT` binding `value_count` values, into `column_names` when given.
pub(crate) fn insert<S: AsRef<str>>(
    policy: IdentifierPolicy,
    table: &str,
    value_count: usize,
    column_names: &[S],
) -> Result<String, GuardError> {
    if value_count == 0 {
        return Err(GuardError::schema("an insert needs at least one value"));
    }
    policy.check(table)?;
    let columns = if column_names.is_empty() {
        String::new()
    } else {
        if column_names.len() != value_count {
            return Err(GuardError::schema(format!(
                "{} column names but {value_count} values",
                column_names.len()
            )));
        }
        policy.check_all(column_names)?;
        let names: Vec<&str> = column_names.iter().map(AsRef::as_ref).collect();
        format!(" ({})", names.join(", "))
    };
    Ok(format!(
        "INSERT INTO {table}{columns} VALUES ({})",
        placeholders(1, value_count)
    ))
}

pub(crate) fn update<S: AsRef<str>>(
    policy: IdentifierPolicy,
    table: &str,
    column_names: &[S],
    filter: &Filter<'_>,
) -> Result<String, GuardError> {
    if column_names.is_empty() {
        return Err(GuardError::schema("an update needs at least one column"));
    }
    policy.check(table)?;
    policy.check_all(column_names)?;
    let assignments: Vec<String> = column_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ?{}", name.as_ref(), i + 1))
        .collect();
    Ok(format!(
        "UPDATE {table} SET {}{}",
        assignments.join(", "),
        filter.clause(policy, column_names.len() + 1)?
    ))
}

pub(crate) fn delete(
    policy: IdentifierPolicy,
    table: &str,
    filter: &Filter<'_>,
) -> Result<String, GuardError> {
    policy.check(table)?;
    Ok(format!("DELETE FROM {table}{}", filter.clause(policy, 1)?))
}

/// `SELECT`; an empty column list selects every column.
pub(crate) fn select<S: AsRef<str>>(
    policy: IdentifierPolicy,
    table: &str,
    column_names: &[S],
    filter: &Filter<'_>,
    distinct: bool,
) -> Result<String, GuardError> {
    policy.check(table)?;
    let columns = if column_names.is_empty() {
        "*".to_string()
    } else {
        policy.check_all(column_names)?;
        column_names
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let distinct = if distinct { "DISTINCT " } else { "" };
    Ok(format!(
        "SELECT {distinct}{columns} FROM {table}{}",
        filter.clause(policy, 1)?
    ))
}

pub(crate) fn count(
    policy: IdentifierPolicy,
    table: &str,
    filter: &Filter<'_>,
) -> Result<String, GuardError> {
    policy.check(table)?;
    Ok(format!("SELECT count(*) FROM {table}{}", filter.clause(policy, 1)?))
}

/// Point a stored `CREATE TABLE` statement at a new table name.
///
/// Only the name in the statement header (before the column list) is
/// rewritten; column names that happen to contain the old table name stay as
/// they are. Returns `None` when the header does not name `src`.
pub(crate) fn rename_create_statement(sql: &str, src: &str, dst: &str) -> Option<String> {
    let header = sql[..sql.find('(')?].trim_end();
    let start = header
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    let token = &header[start..];
    let unquoted = token.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']' | '\''));
    let name = unquoted.rsplit('.').next().unwrap_or(unquoted);
    let name = name.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']' | '\''));
    if !name.eq_ignore_ascii_case(src) {
        return None;
    }
    Some(format!("{}{dst}{}", &sql[..start], &sql[header.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: IdentifierPolicy = IdentifierPolicy::Strict;
    const NO_COLUMNS: &[&str] = &[];

    #[test]
    fn create_table_joins_columns_and_constraint() {
        let sql = create_table(
            STRICT,
            "scores",
            &["id", "name"],
            &["int ", "varchar(20)"],
            Some("primary key(id)"),
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS scores (id int, name varchar(20), primary key(id))"
        );
    }

    #[test]
    fn create_table_without_constraint() {
        let sql = create_table(STRICT, "t", &["id"], &["int"], None).unwrap();
        assert_eq!(sql, "CREATE TABLE IF NOT EXISTS t (id int)");
        let blank = create_table(STRICT, "t", &["id"], &["int"], Some("  ")).unwrap();
        assert_eq!(blank, sql);
    }

    #[test]
    fn create_table_rejects_mismatched_or_empty_lists() {
        assert!(matches!(
            create_table(STRICT, "t", &["id", "name"], &["int"], None),
            Err(GuardError::Schema { .. })
        ));
        assert!(matches!(
            create_table(STRICT, "t", NO_COLUMNS, NO_COLUMNS, None),
            Err(GuardError::Schema { .. })
        ));
        assert!(matches!(
            create_table(STRICT, "t", &["id"], &[" "], None),
            Err(GuardError::Schema { .. })
        ));
    }

    #[test]
    fn insert_with_and_without_column_names() {
        assert_eq!(
            insert(STRICT, "t", 3, NO_COLUMNS).unwrap(),
            "INSERT INTO t VALUES (?1, ?2, ?3)"
        );
        assert_eq!(
            insert(STRICT, "t", 2, &["id", "score"]).unwrap(),
            "INSERT INTO t (id, score) VALUES (?1, ?2)"
        );
        assert!(insert(STRICT, "t", 2, &["id"]).is_err());
        assert!(insert(STRICT, "t", 0, NO_COLUMNS).is_err());
    }

    #[test]
    fn update_numbers_the_filter_parameter_after_assignments() {
        let filter = Filter::eq("id", 7);
        assert_eq!(
            update(STRICT, "t", &["name", "score"], &filter).unwrap(),
            "UPDATE t SET name = ?1, score = ?2 WHERE id = ?3"
        );
        assert_eq!(
            update(STRICT, "t", &["name"], &Filter::Where("name = 'd'")).unwrap(),
            "UPDATE t SET name = ?1 WHERE name = 'd'"
        );
        assert_eq!(
            update(STRICT, "t", &["id"], &Filter::All).unwrap(),
            "UPDATE t SET id = ?1"
        );
    }

    #[test]
    fn empty_where_fragment_addresses_all_rows() {
        assert_eq!(
            delete(STRICT, "t", &Filter::Where("   ")).unwrap(),
            "DELETE FROM t"
        );
        assert_eq!(
            count(STRICT, "t", &Filter::Where("")).unwrap(),
            "SELECT count(*) FROM t"
        );
    }

    #[test]
    fn select_variants() {
        assert_eq!(
            select(STRICT, "t", NO_COLUMNS, &Filter::Where("id = 1"), false).unwrap(),
            "SELECT * FROM t WHERE id = 1"
        );
        assert_eq!(
            select(STRICT, "t", &["name"], &Filter::eq("id", 1), true).unwrap(),
            "SELECT DISTINCT name FROM t WHERE id = ?1"
        );
    }

    #[test]
    fn strict_policy_rejects_injected_names() {
        assert!(delete(STRICT, "t; DROP TABLE x", &Filter::All).is_err());
        assert!(select(STRICT, "t", &["count(*)"], &Filter::All, false).is_err());
        assert!(delete(STRICT, "t", &Filter::eq("id = 1 OR 1", 0)).is_err());
    }

    #[test]
    fn verbatim_policy_passes_expressions_through() {
        let sql = select(
            IdentifierPolicy::Verbatim,
            "t",
            &["count(*)"],
            &Filter::Where("id != 1"),
            false,
        )
        .unwrap();
        assert_eq!(sql, "SELECT count(*) FROM t WHERE id != 1");
    }

    #[test]
    fn rename_rewrites_only_the_header() {
        let sql = "CREATE TABLE t(id int, t_name text)";
        assert_eq!(
            rename_create_statement(sql, "t", "t_copy").unwrap(),
            "CREATE TABLE t_copy(id int, t_name text)"
        );
    }

    #[test]
    fn rename_handles_quoting_and_spacing() {
        assert_eq!(
            rename_create_statement("CREATE TABLE \"scores\" (id int)", "scores", "backup")
                .unwrap(),
            "CREATE TABLE backup (id int)"
        );
        assert_eq!(
            rename_create_statement("CREATE TABLE main.scores(id int)", "scores", "b").unwrap(),
            "CREATE TABLE b(id int)"
        );
    }

    #[test]
    fn rename_refuses_statements_for_other_tables() {
        assert!(rename_create_statement("CREATE TABLE other(id int)", "t", "x").is_none());
        assert!(rename_create_statement("no parenthesis here", "t", "x").is_none());
    }
}
