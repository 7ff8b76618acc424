//! Row-limit injection, statement validation and guarded execution.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::db::{DataStore, ResultSet};
use crate::error::Result;

use super::parser::SqlClassifier;
use super::Rejection;

/// Matches a whitespace-bounded `LIMIT` keyword anywhere in the statement.
static LIMIT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|\s)limit(\s|$)").expect("LIMIT pattern is valid"));

/// Returns true if the statement already carries a `LIMIT` clause.
pub fn has_limit_clause(sql: &str) -> bool {
    LIMIT_TOKEN.is_match(sql)
}

/// Appends ` LIMIT <n>;` when a limit is requested and none is present.
///
/// Trailing semicolons are stripped before appending. A statement that already
/// has a `LIMIT` is returned unchanged whatever the requested limit.
pub fn apply_row_limit(sql: &str, limit: Option<u32>) -> String {
    let Some(limit) = limit else {
        return sql.to_string();
    };
    if has_limit_clause(sql) {
        return sql.to_string();
    }
    let base = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{base} LIMIT {limit};")
}

/// Skips leading `--` line comments and `/* */` block comments.
fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(idx) => after[idx + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(idx) => after[idx + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

/// The statement, once unwrapped, must start with `select`.
fn check_select_only(sql: &str) -> std::result::Result<(), Rejection> {
    let core = strip_leading_comments(sql)
        .trim()
        .trim_end_matches(';')
        .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
        .trim_end_matches(|c: char| c == ')' || c.is_whitespace());

    if core.to_lowercase().starts_with("select") {
        Ok(())
    } else {
        Err(Rejection::NotSelect)
    }
}

/// After dropping one trailing `;`, no separator may remain.
fn check_single_statement(sql: &str) -> std::result::Result<(), Rejection> {
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        Err(Rejection::MultipleStatements)
    } else {
        Ok(())
    }
}

/// Validates and executes single read-only statements.
#[derive(Debug, Default)]
pub struct SafetyGate {
    strict: Option<SqlClassifier>,
}

impl SafetyGate {
    /// Creates a gate using the lightweight prefix/separator checks.
    pub fn new() -> Self {
        Self { strict: None }
    }

    /// Creates a gate that additionally parses every statement.
    pub fn strict() -> Self {
        Self {
            strict: Some(SqlClassifier::new()),
        }
    }

    /// Creates a gate from the `strict_safety` configuration flag.
    pub fn with_strict(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::new()
        }
    }

    /// Returns true if statements are also checked by the SQL parser.
    pub fn is_strict(&self) -> bool {
        self.strict.is_some()
    }

    /// Checks a statement against every gate rule without executing it.
    pub fn validate(&self, sql: &str) -> std::result::Result<(), Rejection> {
        check_select_only(sql)?;
        check_single_statement(sql)?;
        if let Some(classifier) = &self.strict {
            classifier.check(sql)?;
        }
        Ok(())
    }

    /// Applies the row limit and validates, returning the statement to run.
    pub fn prepare(&self, sql: &str, limit: Option<u32>) -> Result<String> {
        let statement = apply_row_limit(sql, limit);
        if let Err(rejection) = self.validate(&statement) {
            debug!(rule = rejection.rule(), "Statement rejected by safety gate");
            return Err(rejection.into());
        }
        Ok(statement)
    }

    /// Prepares the statement and runs it against the store.
    ///
    /// The store is never touched when validation fails.
    pub async fn execute(
        &self,
        store: &dyn DataStore,
        sql: &str,
        limit: Option<u32>,
    ) -> Result<ResultSet> {
        let statement = self.prepare(sql, limit)?;
        debug!("Executing: {}", statement);
        store.execute_query(&statement).await
    }
}
