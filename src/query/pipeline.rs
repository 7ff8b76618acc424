//! The text2SQL pipeline.
//!
//! One request runs: prompt -> model -> extract -> limit + gate -> execute ->
//! summarize -> explain. Every stage returns a typed error except the
//! explanation, which falls back to a template.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{DataStore, ResultSet};
use crate::error::{Result, Text2SqlError};
use crate::llm::prompt::{
    build_explanation_messages, build_sql_messages, build_sql_prompt, DEFAULT_SCHEMA,
};
use crate::llm::{LlmClient, Message, SqlExtractor};
use crate::safety::SafetyGate;

use super::summary::{fallback_explanation, summarize};

/// Row limit applied when neither the request nor the config names one.
pub const DEFAULT_LIMIT: u32 = 200;

/// Largest row limit a request may ask for.
pub const MAX_LIMIT: u32 = 10_000;

/// Default deadline for one model call.
const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// A natural-language question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    /// Extra context appended to the question.
    #[serde(default)]
    pub assumptions: Option<String>,

    /// Row limit for the generated statement.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryRequest {
    /// Creates a request for the given question with default settings.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// Sets the assumptions note.
    pub fn with_assumptions(mut self, assumptions: impl Into<String>) -> Self {
        self.assumptions = Some(assumptions.into());
        self
    }

    /// Sets the row limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the request bounds and returns the effective row limit.
    pub fn validate(&self, default_limit: u32) -> Result<u32> {
        if self.question.trim().is_empty() {
            return Err(Text2SqlError::invalid_request("question must not be empty"));
        }
        match self.limit {
            None => Ok(default_limit),
            Some(limit) if (1..=i64::from(MAX_LIMIT)).contains(&limit) => Ok(limit as u32),
            Some(limit) => Err(Text2SqlError::invalid_request(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            ))),
        }
    }
}

/// The answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    /// The extracted statement, before any row limit was applied.
    pub sql_query: String,
    pub explanation: String,
    pub results: ResultSet,
}

/// Orchestrates model, gate and data store for each request.
///
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn DataStore>,
    gate: SafetyGate,
    extractor: SqlExtractor,
    system_prompt: String,
    default_limit: u32,
    model_timeout: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store.location())
            .field("gate", &self.gate)
            .field("default_limit", &self.default_limit)
            .field("model_timeout", &self.model_timeout)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the built-in schema and default settings.
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn DataStore>) -> Self {
        Self {
            llm,
            store,
            gate: SafetyGate::new(),
            extractor: SqlExtractor::default(),
            system_prompt: build_sql_prompt(DEFAULT_SCHEMA),
            default_limit: DEFAULT_LIMIT,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Creates a pipeline configured from `config`.
    pub fn from_config(
        config: &Config,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn DataStore>,
    ) -> Result<Self> {
        let mut pipeline = Self::new(llm, store)
            .with_gate(SafetyGate::with_strict(config.pipeline.strict_safety))
            .with_default_limit(config.pipeline.default_limit)
            .with_model_timeout(Duration::from_secs(config.llm.timeout_secs));
        if let Some(schema) = config.load_schema()? {
            pipeline = pipeline.with_schema(&schema);
        }
        Ok(pipeline)
    }

    /// Replaces the safety gate.
    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replaces the schema description given to the model.
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.system_prompt = build_sql_prompt(schema);
        self
    }

    /// Sets the row limit used when a request does not name one.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Sets the deadline for each model call.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Returns the data store.
    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    /// Returns the SQL-generation system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answers a natural-language question.
    pub async fn answer(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResponse> {
        let start = Instant::now();
        let limit = request.validate(self.default_limit)?;

        let messages = build_sql_messages(
            &self.system_prompt,
            request.question.trim(),
            request.assumptions.as_deref(),
        );
        debug!("Requesting SQL from model");
        let raw = self.call_model(&messages, cancel).await?;

        let sql_query = self.extractor.extract(&raw)?;
        debug!("Extracted SQL: {}", sql_query);

        let results = self.execute(&sql_query, Some(limit), cancel).await?;
        let summary = summarize(&results);
        debug!("Query returned {} rows", results.row_count);

        let explanation = self
            .explain(request.question.trim(), &sql_query, &summary, &results, cancel)
            .await?;

        info!(
            "Answered question with {} rows in {:?}",
            results.row_count,
            start.elapsed()
        );

        Ok(PipelineResponse {
            sql_query,
            explanation,
            results,
        })
    }

    /// Runs caller-supplied SQL through the gate without any row limit.
    pub async fn run_sql(&self, sql: &str, cancel: &CancellationToken) -> Result<ResultSet> {
        if sql.trim().is_empty() {
            return Err(Text2SqlError::invalid_request("query must not be empty"));
        }
        self.execute(sql, None, cancel).await
    }

    async fn call_model(&self, messages: &[Message], cancel: &CancellationToken) -> Result<String> {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(Text2SqlError::Cancelled),
            result = tokio::time::timeout(self.model_timeout, self.llm.complete(messages)) => {
                result.map_err(|_| {
                    Text2SqlError::timeout(format!(
                        "Model did not respond within {} seconds",
                        self.model_timeout.as_secs()
                    ))
                })?
            }
        }
    }

    async fn execute(
        &self,
        sql: &str,
        limit: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(Text2SqlError::Cancelled),
            result = self.gate.execute(self.store.as_ref(), sql, limit) => result,
        }
    }

    /// Asks the model to explain the result, falling back to a template.
    ///
    /// Only cancellation is propagated.
    async fn explain(
        &self,
        question: &str,
        sql: &str,
        summary: &str,
        results: &ResultSet,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let messages = build_explanation_messages(question, sql, summary);
        match self.call_model(&messages, cancel).await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => {
                warn!("Model returned an empty explanation, using fallback");
                Ok(fallback_explanation(results.row_count))
            }
            Err(Text2SqlError::Cancelled) => Err(Text2SqlError::Cancelled),
            Err(e) => {
                warn!("Explanation failed, using fallback: {}", e);
                Ok(fallback_explanation(results.row_count))
            }
        }
    }
}
