//! LLM completion boundary used by the fallback intent classifier.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use thiserror::Error;

use dealdesk_core::config::{LlmConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm returned an unusable completion: {0}")]
    BadCompletion(String),
    #[error("llm configuration error: {0}")]
    Configuration(String),
}

/// One completion request per classification; the router owns the timeout.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Provider-agnostic HTTP client covering the three supported backends.
pub struct HttpLlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        match config.provider {
            LlmProvider::OpenAi | LlmProvider::Anthropic => {
                if config.api_key.is_none() {
                    return Err(LlmError::Configuration(
                        "api key is required for hosted providers".to_string(),
                    ));
                }
            }
            LlmProvider::Ollama => {
                if config.base_url.is_none() {
                    return Err(LlmError::Configuration(
                        "base_url is required for ollama".to_string(),
                    ));
                }
            }
        }

        Ok(Self { http: reqwest::Client::new(), config })
    }

    fn base_url(&self, default: &str) -> String {
        self.config
            .base_url
            .clone()
            .unwrap_or_else(|| default.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    fn api_key(&self) -> Result<String, LlmError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
            .ok_or_else(|| LlmError::Configuration("api key missing".to_string()))
    }

    async fn post_json(
        &self,
        url: String,
        headers: &[(&str, String)],
        body: Value,
    ) -> Result<Value, LlmError> {
        let mut request = self.http.post(url).json(&body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response =
            request.send().await.map_err(|err| LlmError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Transport(format!("provider returned status {status}")));
        }

        response.json::<Value>().await.map_err(|err| LlmError::BadCompletion(err.to_string()))
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url("https://api.openai.com"));
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });
        let headers = [("authorization", format!("Bearer {}", self.api_key()?))];
        let reply = self.post_json(url, &headers, body).await?;

        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::BadCompletion("missing choices[0].message.content".to_string()))
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url("https://api.anthropic.com"));
        let body = json!({
            "model": self.config.model,
            "max_tokens": 512,
            "messages": [{"role": "user", "content": prompt}],
        });
        let headers = [
            ("x-api-key", self.api_key()?),
            ("anthropic-version", "2023-06-01".to_string()),
        ];
        let reply = self.post_json(url, &headers, body).await?;

        reply["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::BadCompletion("missing content[0].text".to_string()))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url("http://localhost:11434"));
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });
        let reply = self.post_json(url, &[], body).await?;

        reply["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::BadCompletion("missing response field".to_string()))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(prompt).await,
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await,
            LlmProvider::Ollama => self.complete_ollama(prompt).await,
        }
    }
}
