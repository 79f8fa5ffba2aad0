use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{EntityTagger, RawEntity, TaggedDocument};
use super::TaggingError;

/// HTTP client for a Document AI style `:process` endpoint.
///
/// The endpoint URL is the full processor URL; authentication is an optional
/// bearer token supplied by configuration.
pub struct DocumentAiClient {
    endpoint: String,
    bearer_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl DocumentAiClient {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(
        endpoint: &str,
        bearer_token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TaggingError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TaggingError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bearer_token,
            client,
        })
    }
}

/// Request body for `:process`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocument<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument<'a> {
    content: String,
    mime_type: &'a str,
}

/// Response body from `:process`
#[derive(Deserialize)]
struct ProcessResponse {
    document: ProcessedDocument,
}

#[derive(Deserialize)]
struct ProcessedDocument {
    #[serde(default)]
    text: String,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

impl EntityTagger for DocumentAiClient {
    fn tag_document(&self, image: &[u8], mime_type: &str) -> Result<TaggedDocument, TaggingError> {
        let body = ProcessRequest {
            raw_document: RawDocument {
                content: base64::engine::general_purpose::STANDARD.encode(image),
                mime_type,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                TaggingError::Connection(self.endpoint.clone())
            } else {
                TaggingError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TaggingError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProcessResponse = response
            .json()
            .map_err(|e| TaggingError::ResponseParsing(e.to_string()))?;

        Ok(TaggedDocument {
            text: parsed.document.text,
            entities: parsed.document.entities,
        })
    }
}

/// Mock tagger for testing. Returns a fixed document or a fixed failure.
pub struct MockEntityTagger {
    result: Result<TaggedDocument, String>,
}

impl MockEntityTagger {
    pub fn new(entities: Vec<RawEntity>) -> Self {
        Self {
            result: Ok(TaggedDocument {
                text: String::new(),
                entities,
            }),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        if let Ok(doc) = &mut self.result {
            doc.text = text.to_string();
        }
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

impl EntityTagger for MockEntityTagger {
    fn tag_document(&self, _image: &[u8], _mime_type: &str) -> Result<TaggedDocument, TaggingError> {
        self.result
            .clone()
            .map_err(|message| TaggingError::ServiceError {
                status: 500,
                body: message,
            })
    }
}
