use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::VisionClient;
use crate::pipeline::ExtractionError;

/// Ollama HTTP client for vision chat.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

impl OllamaClient {
    /// Client pointing at an Ollama-compatible server. `timeout` of `None`
    /// leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ExtractionError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }
}

/// Request body for Ollama `/api/chat` with images.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

/// Deterministic decoding for transcription.
#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Response body from Ollama `/api/chat` (stream disabled)
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl VisionClient for OllamaClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
                images: None,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
            images: Some(images),
        });

        let body = ChatRequest {
            model,
            messages,
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::ServiceConnection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::HttpClient(match self.timeout {
                    Some(t) => format!("Request timed out after {}s", t.as_secs()),
                    None => "Request timed out".to_string(),
                })
            } else {
                ExtractionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

/// Mock vision client for testing. Returns a fixed reply and records the
/// prompts it was sent.
pub struct MockVisionClient {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockVisionClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable(base_url: &str) -> Self {
        Self {
            reply: Err(base_url.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

impl VisionClient for MockVisionClient {
    fn chat_with_images(
        &self,
        _model: &str,
        prompt: &str,
        _images: &[String],
        _system: Option<&str>,
    ) -> Result<String, ExtractionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.reply
            .clone()
            .map_err(ExtractionError::ServiceConnection)
    }
}
