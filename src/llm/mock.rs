//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus an optional
//! script of replies and failures consumed in order.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{Result, Text2SqlError};
use crate::llm::prompt::EXPLANATION_SYSTEM_PROMPT;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Canned reply to explanation requests.
pub const MOCK_EXPLANATION: &str = "The results answer the question directly.";

/// One scripted outcome.
#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit and integration testing without making real API calls. Every
/// call is recorded and can be inspected with [`MockLlmClient::calls`].
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Outcomes returned before any pattern matching, front first.
    script: Mutex<VecDeque<Scripted>>,
    /// Artificial latency applied to every call.
    delay: Option<Duration>,
    /// Message lists received, in call order.
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Queues a reply for the next unscripted call.
    pub fn then_reply(mut self, reply: impl Into<String>) -> Self {
        self.script
            .get_mut()
            .push_back(Scripted::Reply(reply.into()));
        self
    }

    /// Queues a provider failure for the next unscripted call.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.script
            .get_mut()
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Delays every call, for exercising deadlines and cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the message lists received so far.
    pub async fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().await.clone()
    }

    /// Returns the number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, messages: &[Message]) -> String {
        let input = Self::extract_user_input(messages);
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if Self::is_explanation_request(messages) {
            return MOCK_EXPLANATION.to_string();
        }

        if input_lower.contains("count") && input_lower.contains("products") {
            return "```sql\nSELECT COUNT(*) FROM products;\n```".to_string();
        }

        if input_lower.contains("categories") {
            return "```sql\nSELECT * FROM categories;\n```".to_string();
        }

        if input_lower.contains("products") {
            return "```sql\nSELECT * FROM products;\n```".to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    fn is_explanation_request(messages: &[Message]) -> bool {
        messages
            .iter()
            .any(|m| m.role == Role::System && m.content == EXPLANATION_SYSTEM_PROMPT)
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.lock().await.push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(Text2SqlError::llm(message)),
            None => Ok(self.mock_response(messages)),
        }
    }
}
