use std::env;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::time::sleep;

use crate::models::ChatMessage;

use super::completer::{Completer, CompleterError, CompleterFuture};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 250;

// Sampling settings the assistant has always been tuned with.
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone)]
pub struct OpenRouterCompleterConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl OpenRouterCompleterConfig {
    pub fn from_env() -> Result<Self, OpenRouterConfigError> {
        let api_key = require_non_empty_env("OPENROUTER_API_KEY")?;
        let chat_completions_url = optional_trimmed_env("OPENROUTER_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        if !chat_completions_url.starts_with("http://")
            && !chat_completions_url.starts_with("https://")
        {
            return Err(OpenRouterConfigError::InvalidConfiguration(
                "OPENROUTER_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            chat_completions_url,
            api_key,
            model: optional_trimmed_env("OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env("OPENROUTER_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_retries: parse_u32_env("OPENROUTER_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_base_backoff_ms: parse_u64_env(
                "OPENROUTER_RETRY_BASE_BACKOFF_MS",
                DEFAULT_RETRY_BASE_BACKOFF_MS,
            )?,
        })
    }
}

#[derive(Debug, Error)]
pub enum OpenRouterConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build OpenRouter http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct OpenRouterCompleter {
    client: reqwest::Client,
    config: OpenRouterCompleterConfig,
}

impl OpenRouterCompleter {
    pub fn new(config: OpenRouterCompleterConfig) -> Result<Self, OpenRouterConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenRouterConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> Result<String, SendAttemptError> {
        let request_body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SendAttemptError::retryable(CompleterError::Timeout)
                } else {
                    SendAttemptError::retryable(CompleterError::ProviderFailure(
                        "request_unavailable".to_string(),
                    ))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            SendAttemptError::non_retryable(CompleterError::InvalidProviderPayload(
                "response_body_read_failed".to_string(),
            ))
        })?;

        if !status.is_success() {
            // 429 and 402 stay distinguishable all the way to the caller.
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    SendAttemptError::non_retryable(CompleterError::RateLimited)
                }
                StatusCode::PAYMENT_REQUIRED => {
                    SendAttemptError::non_retryable(CompleterError::QuotaExceeded)
                }
                status if is_retryable_status(status) => SendAttemptError::retryable(
                    CompleterError::ProviderFailure(format!("status={}", status.as_u16())),
                ),
                status => SendAttemptError::non_retryable(CompleterError::ProviderFailure(
                    format!("status={}", status.as_u16()),
                )),
            });
        }

        let parsed: CompletionsResponse = serde_json::from_str(&body).map_err(|_| {
            SendAttemptError::non_retryable(CompleterError::InvalidProviderPayload(
                "response_json_parse_failed".to_string(),
            ))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                SendAttemptError::non_retryable(CompleterError::InvalidProviderPayload(
                    "missing_choice".to_string(),
                ))
            })?;

        Ok(content)
    }
}

impl Completer for OpenRouterCompleter {
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> CompleterFuture<'a> {
        Box::pin(async move {
            let mut attempt = 0_u32;

            loop {
                match self.send_once(messages).await {
                    Ok(content) => return Ok(content),
                    Err(err) => {
                        if err.retryable && attempt < self.config.max_retries {
                            let backoff_multiplier = 2_u64.saturating_pow(attempt);
                            let backoff_ms = self
                                .config
                                .retry_base_backoff_ms
                                .saturating_mul(backoff_multiplier);
                            sleep(Duration::from_millis(backoff_ms)).await;
                            attempt = attempt.saturating_add(1);
                            continue;
                        }

                        return Err(err.error);
                    }
                }
            }
        })
    }
}

#[derive(Debug)]
struct SendAttemptError {
    error: CompleterError,
    retryable: bool,
}

impl SendAttemptError {
    fn retryable(error: CompleterError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn non_retryable(error: CompleterError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionsChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    message: CompletionsMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionsMessage {
    content: String,
}

fn require_non_empty_env(key: &str) -> Result<String, OpenRouterConfigError> {
    let value = env::var(key).map_err(|_| OpenRouterConfigError::MissingVar(key.to_string()))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OpenRouterConfigError::MissingVar(key.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, OpenRouterConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| OpenRouterConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32, OpenRouterConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| OpenRouterConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}
