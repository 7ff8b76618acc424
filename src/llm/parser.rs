//! SQL extraction from LLM outputs.
//!
//! Models reply in many shapes: fenced code blocks, JSON envelopes, SQL
//! behind a "Here's the SQL:" prefix, or SQL followed by an explanation.
//! [`SqlExtractor`] strips any fence and then tries an ordered list of
//! [`ExtractionStrategy`] implementations; the first match wins.
//!
//! Extraction never judges whether the statement is safe to run.

use crate::error::{Result, Text2SqlError};
use tracing::debug;

const NO_SQL_FOUND: &str = "No valid SQL query found in model output";

const FENCE: &str = "```";

/// Leading boilerplate removed before the statement (at most one).
const PREFIXES: &[&str] = &[
    "sql query:",
    "query:",
    "sql:",
    "answer:",
    "result:",
    "here's the sql:",
    "here is the sql:",
    "the sql query is:",
];

/// Line openings that mark the end of the statement.
const STOP_MARKERS: &[&str] = &[
    "this query",
    "explanation:",
    "this will",
    "note:",
    "the above",
    "this sql",
    "//",
    "--",
    "#",
];

/// One way of recognizing a SQL statement in model text.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the statement, or `None` when this strategy does not apply.
    fn extract(&self, text: &str) -> Option<String>;
}

/// Matches `{"sql_query": "..."}` and returns the field trimmed.
///
/// A `sql_query` that is not a string yields an empty statement, which the
/// extractor reports as a failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEnvelope;

impl ExtractionStrategy for JsonEnvelope {
    fn name(&self) -> &'static str {
        "json_envelope"
    }

    fn extract(&self, text: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
        let field = value.as_object()?.get("sql_query")?;
        Some(field.as_str().map(str::trim).unwrap_or_default().to_string())
    }
}

/// Treats the text as SQL surrounded by prose and trims the prose away.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProseTrimmed;

impl ExtractionStrategy for ProseTrimmed {
    fn name(&self) -> &'static str {
        "prose_trimmed"
    }

    fn extract(&self, text: &str) -> Option<String> {
        let body = strip_prefix(text.trim());

        let mut lines: Vec<&str> = Vec::new();
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if starts_with_marker(line) {
                break;
            }
            match split_trailing_prose(line) {
                Some(statement) => {
                    lines.push(statement);
                    break;
                }
                None => lines.push(line),
            }
        }

        let joined = lines.join(" ");
        let statement = joined.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        if statement.is_empty() {
            return None;
        }
        Some(format!("{statement};"))
    }
}

/// Ordered extraction pipeline.
pub struct SqlExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for SqlExtractor {
    fn default() -> Self {
        Self::new(vec![Box::new(JsonEnvelope), Box::new(ProseTrimmed)])
    }
}

impl std::fmt::Debug for SqlExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("SqlExtractor")
            .field("strategies", &names)
            .finish()
    }
}

impl SqlExtractor {
    /// Creates an extractor that tries `strategies` in order.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts a single bare SQL statement from raw model output.
    pub fn extract(&self, raw: &str) -> Result<String> {
        let body = strip_fence(raw);

        for strategy in &self.strategies {
            if let Some(sql) = strategy.extract(&body) {
                debug!("SQL extracted by {} strategy", strategy.name());
                if sql.is_empty() || sql == ";" {
                    break;
                }
                return Ok(sql);
            }
        }

        Err(Text2SqlError::extraction(NO_SQL_FOUND))
    }
}

/// Extracts SQL with the default strategy order.
pub fn extract_sql(raw: &str) -> Result<String> {
    SqlExtractor::default().extract(raw)
}

/// Keeps only the lines inside the fenced block, if the text has one.
///
/// Unfenced text loses any lines that are just a stray marker.
fn strip_fence(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let Some(open) = find_opening(&lines) else {
        let kept: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| line.trim() != FENCE)
            .collect();
        return kept.join("\n").trim().to_string();
    };

    let opening = lines[open].trim()[FENCE.len()..].trim();
    let (opening, closed) = match opening.strip_suffix(FENCE) {
        Some(inner) => (inner.trim(), true),
        None => (opening, false),
    };
    let bare_marker = opening.is_empty();

    let mut kept: Vec<&str> = Vec::new();
    if let Some((tag, statement)) = opening.split_once(char::is_whitespace) {
        // Statement starts on the opening line, e.g. "```sql SELECT 1```".
        if is_language_tag(tag) {
            kept.push(statement.trim_start());
        } else {
            kept.push(opening);
        }
    }
    if closed {
        return kept.join("\n").trim().to_string();
    }

    for (idx, line) in lines[open + 1..].iter().enumerate() {
        let trimmed = line.trim();
        if idx == 0 && bare_marker && is_language_tag(trimmed) {
            continue;
        }
        if let Some(before) = trimmed.strip_suffix(FENCE) {
            kept.push(before);
            break;
        }
        kept.push(line);
    }

    kept.join("\n").trim().to_string()
}

/// Finds the opening marker line.
///
/// Text that starts with a marker is fenced. After leading prose, a block
/// counts only when it opens with a bare or tagged marker and closes later.
fn find_opening(lines: &[&str]) -> Option<usize> {
    let first = lines.iter().position(|line| !line.trim().is_empty())?;
    if lines[first].trim_start().starts_with(FENCE) {
        return Some(first);
    }

    for (idx, line) in lines.iter().enumerate().skip(first + 1) {
        let Some(rest) = line.trim().strip_prefix(FENCE) else {
            continue;
        };
        let rest = rest.trim();
        let opens = rest.is_empty() || is_language_tag(rest);
        if opens && lines[idx + 1..].iter().any(|l| l.trim().ends_with(FENCE)) {
            return Some(idx);
        }
    }
    None
}

fn is_language_tag(token: &str) -> bool {
    ["sql", "sqlite", "json"]
        .iter()
        .any(|tag| token.eq_ignore_ascii_case(tag))
}

fn strip_prefix(text: &str) -> &str {
    for prefix in PREFIXES {
        if let Some(head) = text.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return text[prefix.len()..].trim_start();
            }
        }
    }
    text
}

fn starts_with_marker(text: &str) -> bool {
    STOP_MARKERS.iter().any(|marker| {
        text.get(..marker.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(marker))
    })
}

/// Cuts a line after the first unquoted `;` that is followed by prose.
///
/// Returns the line up to and including that `;`, or `None` when no such
/// split exists.
fn split_trailing_prose(line: &str) -> Option<&str> {
    let mut quote: Option<char> = None;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, ';') => {
                let after = line[idx + 1..].trim_start();
                if starts_with_marker(after) {
                    return Some(&line[..=idx]);
                }
            }
            (None, _) => {}
        }
    }
    None
}
