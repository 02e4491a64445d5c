pub mod models;
pub mod prompts;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    Connection(String),
    #[error("LLM response error: {0}")]
    Response(String),
    #[error("LLM configuration error: {0}")]
    Config(String),
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM returned an empty response")]
    EmptyResponse,
    #[error("Prompt rendering error: {0}")]
    Template(#[from] minijinja::Error),
}

/// A text-completion service: one prompt in, one response text out.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    completer: Box<dyn TextCompleter>,
    backend: String,
    model: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let completer: Box<dyn TextCompleter> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::Config(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self {
            completer,
            backend: config.backend.clone(),
            model: config.model.clone(),
        })
    }

    /// Wraps an arbitrary completer, e.g. an in-process fake.
    pub fn from_completer(completer: Box<dyn TextCompleter>, backend: &str, model: &str) -> Self {
        Self {
            completer,
            backend: backend.to_string(),
            model: model.to_string(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and returns the response text untouched. A blank
    /// response is an error.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let start_time = Instant::now();
        debug!("Prompt sent to {} ({}):\n{}", self.backend, self.model, prompt);

        let response = self.completer.complete(prompt).await?;
        if response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!(
            "Completion received from {} in {}ms ({} chars)",
            self.backend,
            start_time.elapsed().as_millis(),
            response.len()
        );
        Ok(response)
    }
}
