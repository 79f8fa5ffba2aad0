use serde::{Deserialize, Serialize};

use super::TaggingError;

/// One typed fragment as delivered by the tagging service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub mention_text: String,
}

impl RawEntity {
    pub fn new(entity_type: &str, mention_text: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            mention_text: mention_text.to_string(),
        }
    }
}

/// Entity types the reconstructor acts on; anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEntity {
    Quantity(String),
    Amount(String),
    Item(String),
    Other { entity_type: String, text: String },
}

impl From<RawEntity> for DocumentEntity {
    fn from(raw: RawEntity) -> Self {
        let RawEntity {
            entity_type,
            mention_text,
        } = raw;
        if entity_type.eq_ignore_ascii_case("quantity") {
            DocumentEntity::Quantity(mention_text)
        } else if entity_type.eq_ignore_ascii_case("amount") {
            DocumentEntity::Amount(mention_text)
        } else if entity_type.eq_ignore_ascii_case("item") {
            DocumentEntity::Item(mention_text)
        } else {
            DocumentEntity::Other {
                entity_type,
                text: mention_text,
            }
        }
    }
}

/// Output of the tagging service for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDocument {
    /// Full recognized text, if the service returns it.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
}

/// Document-understanding collaborator (allows mocking).
pub trait EntityTagger: Send + Sync {
    fn tag_document(&self, image: &[u8], mime_type: &str) -> Result<TaggedDocument, TaggingError>;
}
