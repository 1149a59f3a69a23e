
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::store::SearchResult;
use crate::{DocChatError, Result};

/// Exact sentence the model is instructed to return, verbatim, when the
/// answer is not derivable from the provided context.
pub const NO_CONTEXT_ANSWER: &str = "I don't have enough information from the provided documents.";

/// A chat completion model. Implemented over HTTP for real providers and by
/// stubs in tests.
pub trait ChatModel: Send + Sync {
    /// Identifier of the underlying model, for logging.
    fn model_id(&self) -> &str;

    /// Complete a single prompt into an answer.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the single RAG prompt: a system instruction restricting the model to
/// the retrieved context, the concatenated chunk texts, and the question.
#[inline]
pub fn build_prompt(chunks: &[SearchResult], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI assistant for a business.\n\
         \n\
         Use ONLY the information provided in the context below to answer the question.\n\
         If the answer is not in the context, say:\n\
         \"{}\"\n\
         \n\
         Context:\n\
         {}\n\
         \n\
         Question:\n\
         {}\n\
         \n\
         Answer clearly and concisely.",
        NO_CONTEXT_ANSWER, context, question
    )
}

/// Runs the primary model and fails over to the fallback exactly once.
pub struct GenerationOrchestrator {
    primary: Box<dyn ChatModel>,
    fallback: Option<Box<dyn ChatModel>>,
}

impl GenerationOrchestrator {
    #[inline]
    pub fn new(primary: Box<dyn ChatModel>, fallback: Option<Box<dyn ChatModel>>) -> Self {
        Self { primary, fallback }
    }

    /// Build HTTP-backed models from configuration.
    #[inline]
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let primary = Box::new(HttpChatModel::new(config, &config.primary_model)?);
        let fallback = match &config.fallback_model {
            Some(model) => Some(
                Box::new(HttpChatModel::new(config, model)?) as Box<dyn ChatModel>
            ),
            None => None,
        };
        Ok(Self {
            primary,
            fallback,
        })
    }

    /// Answer `question` from `chunks`. On any primary failure the identical
    /// prompt goes to the fallback once; with no fallback configured the
    /// original error propagates. Never silently returns an empty answer.
    #[inline]
    pub fn answer(&self, chunks: &[SearchResult], question: &str) -> Result<String> {
        let prompt = build_prompt(chunks, question);

        debug!(
            model = self.primary.model_id(),
            context_chunks = chunks.len(),
            "Invoking primary model"
        );

        match self.primary.complete(&prompt) {
            Ok(answer) => Ok(answer),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        primary = self.primary.model_id(),
                        fallback = fallback.model_id(),
                        error = %primary_err,
                        "Primary model failed, invoking fallback"
                    );
                    fallback.complete(&prompt)
                }
                None => {
                    warn!(
                        primary = self.primary.model_id(),
                        error = %primary_err,
                        "Primary model failed and no fallback is configured"
                    );
                    Err(primary_err)
                }
            },
        }
    }
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint. No
/// internal retry loop: the single primary-to-fallback step is the only
/// failover, keeping end-to-end latency bounded.
#[derive(Debug, Clone)]
pub struct HttpChatModel {
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl HttpChatModel {
    #[inline]
    pub fn new(config: &GenerationConfig, model: &str) -> Result<Self> {
        let api_key = config
            .api_key()
            .map_err(|e| DocChatError::Config(e.to_string()))?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: config.temperature,
            api_key,
            agent,
        })
    }
}

impl ChatModel for HttpChatModel {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocChatError::Generation(format!("failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| DocChatError::Generation(format!("request failed: {}", e)))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| DocChatError::Generation(format!("failed to parse response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DocChatError::Generation("response contained no choices".to_string()))?;

        Ok(answer)
    }
}
