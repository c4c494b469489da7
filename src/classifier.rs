//! Moderation Classifier Client
//!
//! Asks an OpenAI-compatible chat-completions endpoint (LM Studio, llama.cpp
//! server, etc.) whether a message seriously violates chat norms.
//! The model answers ДА/НЕТ; anything else, or any failure, is retried and
//! finally reported as `Verdict::Unknown`, which never penalizes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default endpoint for a local model server
pub const DEFAULT_API_URL: &str = "http://localhost:1234/v1/chat/completions";

const SYSTEM_PROMPT: &str = "Ты — НейроРодион, модератор чата. Твоя задача — оценить, нарушает ли сообщение серьёзно моральные нормы.

Допустимо (НЕ штрафовать):
- \"го курить\", \"как дела\", обычный сленг
- Лёгкие оскорбления, мат в дружеском контексте
- Шутки, ирония, сарказм

Штрафовать -10 (ответь только ДА):
- Серьёзные угрозы, призывы к насилию
- Откровенная дискриминация, разжигание ненависти
- Крайне оскорбительный контент
- Что-то по-настоящему ужасное и недопустимое

Отвечай только одним словом: ДА или НЕТ. ДА — если нужно штрафовать, НЕТ — если сообщение допустимо.";

/// Affirmative markers in the model reply
const AFFIRMATIVE: &[&str] = &["ДА", "YES"];

/// Classifier errors
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Response has no choices")]
    EmptyResponse,
}

/// Moderation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Penalize
    Bad,
    /// Acceptable
    Ok,
    /// No verdict after all retries
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bad => "BAD",
            Self::Ok => "OK",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a model reply
    pub fn from_reply(content: &str) -> Self {
        let normalized = content.trim().to_uppercase();
        if AFFIRMATIVE.iter().any(|marker| normalized.contains(marker)) {
            Self::Bad
        } else {
            Self::Ok
        }
    }
}

/// Chat message in the completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Completion request body
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Two-message moderation request for `text`
    pub fn moderation(text: &str) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Сообщение для проверки: {}", text),
                },
            ],
            temperature: 0.2,
            // ДА/НЕТ is two or three letters
            max_tokens: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Something that can answer a completion request with text
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClassifierError>;
}

/// HTTP backend for chat-completions endpoints
#[derive(Clone)]
pub struct HttpCompletionBackend {
    client: Client,
    url: String,
}

impl HttpCompletionBackend {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClassifierError> {
        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status { status, body });
        }

        let result: CompletionResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ClassifierError::EmptyResponse)
    }
}

/// Moderation client with retry policy
#[derive(Clone)]
pub struct ModerationClient {
    backend: Arc<dyn CompletionBackend>,
    max_retries: u32,
}

impl ModerationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, max_retries: u32) -> Self {
        Self {
            backend,
            max_retries: max_retries.max(1),
        }
    }

    /// HTTP client for `url` with a per-call timeout
    pub fn http(url: &str, timeout: Duration, max_retries: u32) -> Result<Self, ClassifierError> {
        let backend = HttpCompletionBackend::new(url, timeout)?;
        Ok(Self::new(Arc::new(backend), max_retries))
    }

    /// Total attempts per classification
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classify a message. Blank text is `Ok` without a call.
    pub async fn classify(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Ok;
        }

        let request = CompletionRequest::moderation(text);

        for attempt in 1..=self.max_retries {
            match self.backend.complete(&request).await {
                Ok(content) => {
                    let verdict = Verdict::from_reply(&content);
                    debug!("Classifier reply {:?} -> {}", content.trim(), verdict.as_str());
                    return verdict;
                }
                Err(e) => {
                    warn!(
                        "Classifier attempt {}/{} failed: {}",
                        attempt, self.max_retries, e
                    );
                }
            }
        }

        info!("Classifier gave no verdict after {} attempts", self.max_retries);
        Verdict::Unknown
    }
}
