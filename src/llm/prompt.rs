//! Prompt construction for LLM requests.
//!
//! Builds the SQL-generation and explanation message lists.

use crate::llm::types::Message;

/// System prompt template for SQL generation.
const SQL_PROMPT_TEMPLATE: &str = r#"You are a senior SQL expert. Convert the user's natural language question into a SQL query for a SQLite database with this schema:

{schema}

Guidelines:
- SQLite-compatible SQL only.
- Generate a single SELECT statement; never modify data.
- Use JOINs when the question spans tables.
- For substring search use LIKE '%term%'.
- For ranges use comparison operators or BETWEEN.
- Calculate percentages with ROUND(100.0 * part / total, 2).
- If the question is ambiguous, choose the most reasonable interpretation.

Respond ONLY with a valid SQL query. No explanation, no markdown, no extra text - just the SQL query."#;

/// Schema description used when no schema file is configured.
pub const DEFAULT_SCHEMA: &str = r#"TABLE products (
  product_id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  category TEXT NOT NULL,        -- e.g., 'Living Room', 'Bedroom', 'Dining Room', 'Office', 'Storage'
  material TEXT,
  length_in INTEGER,
  width_in INTEGER,
  height_in INTEGER,
  color TEXT,
  price REAL NOT NULL,
  weight_lb REAL,
  requires_assembly BOOLEAN,     -- 1 = requires assembly, 0 = ready to use
  warranty_years INTEGER,
  stock_quantity INTEGER NOT NULL,
  stock_status TEXT,             -- e.g., 'In Stock', 'Low Stock'
  created_date DATE DEFAULT CURRENT_DATE,
  updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

TABLE categories (
  category_name TEXT PRIMARY KEY,
  description TEXT,
  created_date DATE DEFAULT CURRENT_DATE
);

-- products.category = categories.category_name"#;

/// Template for the explanation request.
const EXPLANATION_PROMPT_TEMPLATE: &str = r#"You are a data analyst explaining query results to users. Given:
1. Original question: {question}
2. SQL query executed: {sql_query}
3. Query results: {results_summary}

Provide a clear, concise explanation of what the results show in relation to the original question. Focus on:
- What the data reveals
- Key patterns or insights
- A direct answer to the user's question

Keep the explanation conversational and accessible to non-technical users."#;

/// System message for the explanation request.
pub const EXPLANATION_SYSTEM_PROMPT: &str = "You are a helpful data analyst.";

/// Builds the SQL-generation system prompt for the given schema description.
pub fn build_sql_prompt(schema: &str) -> String {
    SQL_PROMPT_TEMPLATE.replace("{schema}", schema.trim())
}

/// Builds the user message content: the question plus optional assumptions.
pub fn build_user_content(question: &str, assumptions: Option<&str>) -> String {
    match assumptions.map(str::trim).filter(|a| !a.is_empty()) {
        Some(notes) => format!("{question}\n\nAdditional assumptions/notes: {notes}"),
        None => question.to_string(),
    }
}

/// Builds the message list for the SQL-generation call.
pub fn build_sql_messages(
    system_prompt: &str,
    question: &str,
    assumptions: Option<&str>,
) -> Vec<Message> {
    vec![
        Message::system(system_prompt),
        Message::user(build_user_content(question, assumptions)),
    ]
}

/// Builds the message list for the explanation call.
pub fn build_explanation_messages(question: &str, sql: &str, summary: &str) -> Vec<Message> {
    let prompt = EXPLANATION_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{sql_query}", sql)
        .replace("{results_summary}", summary);
    vec![
        Message::system(EXPLANATION_SYSTEM_PROMPT),
        Message::user(prompt),
    ]
}
