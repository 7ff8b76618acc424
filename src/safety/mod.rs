//! Read-only execution boundary.
//!
//! Every statement produced by the model passes through the [`SafetyGate`]
//! before it reaches the data store: a row limit is injected, the statement is
//! checked to be a single `SELECT`, and only then is it executed.

mod gate;
mod parser;

pub use gate::{apply_row_limit, has_limit_clause, SafetyGate};
pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// The gate rule a statement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The statement does not start with `SELECT`.
    NotSelect,
    /// A second statement follows the first one.
    MultipleStatements,
    /// Strict mode only: the statement could not be parsed.
    Unparseable,
}

impl Rejection {
    /// Returns a short rule name, useful in logs.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::NotSelect => "select_only",
            Self::MultipleStatements => "single_statement",
            Self::Unparseable => "parseable",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelect => write!(f, "Only SELECT queries are allowed."),
            Self::MultipleStatements => write!(f, "Multiple statements are not allowed."),
            Self::Unparseable => write!(f, "SQL could not be parsed as a single query."),
        }
    }
}
