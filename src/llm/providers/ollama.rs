use crate::config::LlmConfig;
use crate::llm::providers::{build_http_client, transport_error};
use crate::llm::{LlmError, TextCompleter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    options: OllamaOptions,
    timeout: Duration,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a OllamaOptions,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: Option<bool>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            client: build_http_client(config.timeout())?,
            api_url,
            model: config.model.clone(),
            options: OllamaOptions {
                temperature: config.temperature,
                num_ctx: config.context_window,
            },
            timeout: config.timeout(),
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt,
            stream: false, // Explicitly disable streaming
            options: &self.options,
        }
    }
}

#[async_trait]
impl TextCompleter for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            // Try to get the error message from the response body
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::Response(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        debug!("Raw response from Ollama: {}", response_text);

        let ollama_response: OllamaResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
            LlmError::Response(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, response_text
            ))
        })?;

        if ollama_response.done == Some(false) {
            debug!("Ollama reported an unfinished generation");
        }

        Ok(ollama_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn request_carries_sampling_options() {
        let mut config = AppConfig::default().llm;
        config.temperature = 0.3;
        config.context_window = Some(500);
        let provider = OllamaProvider::new(&config).unwrap();

        let body = serde_json::to_value(provider.request_body("hello")).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 500);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn context_window_omitted_when_unset() {
        let provider = OllamaProvider::new(&AppConfig::default().llm).unwrap();
        let body = serde_json::to_value(provider.request_body("hello")).unwrap();
        assert!(body["options"].get("num_ctx").is_none());
        assert_eq!(provider.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn parses_generate_response() {
        let parsed: OllamaResponse = serde_json::from_str(
            r#"{"model":"llama3","created_at":"2024-01-01T00:00:00Z","response":"SELECT 1;","done":true}"#,
        )
        .unwrap();
        assert_eq!(parsed.response, "SELECT 1;");
    }
}
