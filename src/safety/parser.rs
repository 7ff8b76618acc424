//! Parser-backed statement classification.
//!
//! Uses sqlparser-rs with the SQLite dialect to confirm that a statement is a
//! single query with no data-modifying parts. Only consulted in strict mode.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::Rejection;

/// SQL classifier that parses statements and accepts only read-only queries.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Accepts exactly one read-only query.
    pub fn check(&self, sql: &str) -> Result<(), Rejection> {
        let statements = Parser::parse_sql(&self.dialect, sql).map_err(|e| {
            debug!("SQL parse error: {}", e);
            Rejection::Unparseable
        })?;

        match statements.as_slice() {
            [] => Err(Rejection::Unparseable),
            [Statement::Query(query)] if query_is_read_only(query) => Ok(()),
            [_] => Err(Rejection::NotSelect),
            _ => Err(Rejection::MultipleStatements),
        }
    }
}

/// Convenience function to check SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> Result<(), Rejection> {
    SqlClassifier::new().check(sql)
}

/// Walks CTEs and the query body looking for data-modifying operations.
fn query_is_read_only(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .map(|with| with.cte_tables.iter().all(|cte| query_is_read_only(&cte.query)))
        .unwrap_or(true);

    ctes_read_only && set_expr_is_read_only(&query.body)
}

fn set_expr_is_read_only(set_expr: &SetExpr) -> bool {
    match set_expr {
        SetExpr::Select(select) => select_is_read_only(select),
        SetExpr::Query(query) => query_is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_is_read_only(left) && set_expr_is_read_only(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        // INSERT/UPDATE bodies and anything else that may write
        _ => false,
    }
}

fn select_is_read_only(select: &Select) -> bool {
    select.from.iter().all(table_with_joins_is_read_only)
}

fn table_with_joins_is_read_only(twj: &TableWithJoins) -> bool {
    table_factor_is_read_only(&twj.relation)
        && twj
            .joins
            .iter()
            .all(|join| table_factor_is_read_only(&join.relation))
}

fn table_factor_is_read_only(factor: &TableFactor) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => query_is_read_only(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_is_read_only(table_with_joins),
        _ => true,
    }
}
