use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::upload::StagedUpload;
use crate::models::LineItemDraft;
use crate::pipeline::entities::{reconstruct_from_raw, EntityTagger};
use crate::pipeline::generative::{
    build_extraction_prompt, parse_extraction_response, ExtractionResult, VisionClient,
    RECEIPT_SYSTEM_PROMPT,
};
use crate::pipeline::validation::{normalize_extracted_items, Vocabulary};
use crate::pipeline::ExtractionError;

/// Which collaborator reads the receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    #[default]
    Generative,
    Entities,
}

impl ScanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generative => "generative",
            Self::Entities => "entities",
        }
    }
}

/// A finished scan. `extraction` is exactly what the source produced;
/// `drafts` are its items normalized against the owner's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub source: ScanSource,
    pub ocr_text: String,
    pub extraction: ExtractionResult,
    pub drafts: Vec<LineItemDraft>,
    pub warnings: Vec<String>,
}

/// Routes an upload to one extraction source and normalizes the result.
pub struct ReceiptScanner {
    vision: Arc<dyn VisionClient>,
    model: String,
    tagger: Option<Arc<dyn EntityTagger>>,
    upload_dir: PathBuf,
}

impl ReceiptScanner {
    pub fn new(vision: Arc<dyn VisionClient>, model: &str, upload_dir: &Path) -> Self {
        Self {
            vision,
            model: model.to_string(),
            tagger: None,
            upload_dir: upload_dir.to_path_buf(),
        }
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn EntityTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn has_tagger(&self) -> bool {
        self.tagger.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Stage `bytes`, extract, normalize. The staged file is gone when this
    /// returns, on success and on every error.
    pub fn scan(
        &self,
        source: ScanSource,
        bytes: &[u8],
        mime_type: &str,
        vocabulary: &Vocabulary,
    ) -> Result<ScanOutcome, ExtractionError> {
        let _span = tracing::info_span!(
            "receipt_scan",
            source = source.as_str(),
            mime_type,
            size = bytes.len()
        )
        .entered();
        let start = Instant::now();

        // Refuse early so no file is written for a source that cannot run.
        let tagger = match source {
            ScanSource::Entities => Some(self.tagger.as_ref().ok_or_else(|| {
                ExtractionError::SourceUnavailable("no entity tagging endpoint configured".into())
            })?),
            ScanSource::Generative => None,
        };

        let upload = StagedUpload::stage(&self.upload_dir, bytes, mime_type)?;
        let (ocr_text, extraction, mut warnings) = match tagger {
            Some(tagger) => self.run_entities(&**tagger, &upload)?,
            None => self.run_generative(&upload, vocabulary)?,
        };
        drop(upload);

        let (drafts, normalize_warnings) =
            normalize_extracted_items(extraction.items.clone(), vocabulary);
        warnings.extend(normalize_warnings);

        tracing::info!(
            item_count = drafts.len(),
            warning_count = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Receipt scan complete"
        );

        Ok(ScanOutcome {
            source,
            ocr_text,
            extraction,
            drafts,
            warnings,
        })
    }

    fn run_generative(
        &self,
        upload: &StagedUpload,
        vocabulary: &Vocabulary,
    ) -> Result<(String, ExtractionResult, Vec<String>), ExtractionError> {
        if !upload.mime_type().starts_with("image/") {
            return Err(ExtractionError::UnsupportedMedia(format!(
                "{} cannot be read by the generative source",
                upload.mime_type()
            )));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(upload.read()?);
        let prompt = build_extraction_prompt(&vocabulary.categories());
        let response = self.vision.chat_with_images(
            &self.model,
            &prompt,
            &[encoded],
            Some(RECEIPT_SYSTEM_PROMPT),
        )?;

        let parsed = parse_extraction_response(&response)?;
        Ok((response, parsed.result, parsed.warnings))
    }

    fn run_entities(
        &self,
        tagger: &dyn EntityTagger,
        upload: &StagedUpload,
    ) -> Result<(String, ExtractionResult, Vec<String>), ExtractionError> {
        let document = tagger.tag_document(&upload.read()?, upload.mime_type())?;
        let reconstruction = reconstruct_from_raw(document.entities);

        let mut warnings = Vec::new();
        if reconstruction.dropped_trailing {
            warnings.push("Quantity or amount after the last item was dropped".to_string());
        }
        if reconstruction.ignored_entities > 0 {
            tracing::debug!(
                ignored = reconstruction.ignored_entities,
                "Entities without a line-item role"
            );
        }

        let extraction = ExtractionResult {
            items: reconstruction.drafts,
            ..ExtractionResult::default()
        };
        Ok((document.text, extraction, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entities::{MockEntityTagger, RawEntity};
    use crate::pipeline::generative::MockVisionClient;

    const GOOD_REPLY: &str = "Here you go:\n```json\n{\"vendor_name\":\"Corner Shop\",\"items\":[\
        {\"name\":\"Eggs\",\"quantity\":1,\"unit\":\"dozen\",\"categories\":[\"Dairy\",\"Breakfast\"],\"price\":\"3.10\"}\
        ]}\n```\nEnjoy!";

    fn scanner(dir: &Path, reply: &str) -> ReceiptScanner {
        ReceiptScanner::new(Arc::new(MockVisionClient::new(reply)), "gemma3:4b", dir)
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn generative_scan_normalizes_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = scanner(dir.path(), GOOD_REPLY)
            .scan(ScanSource::Generative, b"jpeg", "image/jpeg", &Vocabulary::fixed())
            .unwrap();

        assert_eq!(outcome.extraction.vendor_name.as_deref(), Some("Corner Shop"));
        let eggs = &outcome.drafts[0];
        assert_eq!(eggs.unit.as_deref(), Some("Dozen"));
        assert_eq!(eggs.categories, vec!["Dairy"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.ocr_text, GOOD_REPLY);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn service_result_is_kept_as_returned() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = scanner(dir.path(), GOOD_REPLY)
            .scan(ScanSource::Generative, b"jpeg", "image/jpeg", &Vocabulary::fixed())
            .unwrap();

        let raw = &outcome.extraction.items[0];
        assert_eq!(raw.unit.as_deref(), Some("dozen"));
        assert_eq!(raw.categories, vec!["Dairy", "Breakfast"]);
        assert_eq!(outcome.drafts.len(), outcome.extraction.items.len());
        assert_ne!(outcome.drafts[0], *raw);
    }

    #[test]
    fn uppercase_image_type_reaches_generative_source() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(MockVisionClient::new(GOOD_REPLY));
        let scanner = ReceiptScanner::new(client.clone(), "m", dir.path());
        let outcome = scanner
            .scan(ScanSource::Generative, b"jpeg", "IMAGE/JPEG", &Vocabulary::fixed())
            .unwrap();
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn prompt_includes_owner_categories() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(MockVisionClient::new(GOOD_REPLY));
        let scanner = ReceiptScanner::new(client.clone(), "m", dir.path());
        scanner
            .scan(
                ScanSource::Generative,
                b"jpeg",
                "image/jpeg",
                &Vocabulary::with_custom(["Spices"]),
            )
            .unwrap();
        assert!(client.last_prompt().unwrap().contains("Spices"));
    }

    #[test]
    fn format_failure_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = scanner(dir.path(), "Sorry, the photo is too blurry.").scan(
            ScanSource::Generative,
            b"jpeg",
            "image/jpeg",
            &Vocabulary::fixed(),
        );
        assert!(matches!(result, Err(ExtractionError::Format(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn parse_failure_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = scanner(dir.path(), "```json\n{not json\n```").scan(
            ScanSource::Generative,
            b"jpeg",
            "image/jpeg",
            &Vocabulary::fixed(),
        );
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn service_failure_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = ReceiptScanner::new(
            Arc::new(MockVisionClient::unreachable("http://localhost:11434")),
            "m",
            dir.path(),
        );
        let result = scanner.scan(ScanSource::Generative, b"jpeg", "image/png", &Vocabulary::fixed());
        assert!(matches!(result, Err(ExtractionError::ServiceConnection(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn pdf_is_refused_by_generative_source() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(MockVisionClient::new(GOOD_REPLY));
        let scanner = ReceiptScanner::new(client.clone(), "m", dir.path());
        let result = scanner.scan(
            ScanSource::Generative,
            b"%PDF",
            "application/pdf",
            &Vocabulary::fixed(),
        );
        assert!(matches!(result, Err(ExtractionError::UnsupportedMedia(_))));
        assert_eq!(client.call_count(), 0);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn entity_scan_reconstructs_line_items() {
        let dir = tempfile::tempdir().unwrap();
        let tagger = MockEntityTagger::new(vec![
            RawEntity::new("Quantity", "2"),
            RawEntity::new("Amount", "$4.00"),
            RawEntity::new("Item", "Milk"),
            RawEntity::new("Item", "Bread"),
            RawEntity::new("Quantity", "9"),
        ])
        .with_text("MILK 2 $4.00\nBREAD");
        let scanner = scanner(dir.path(), "").with_tagger(Arc::new(tagger));

        let outcome = scanner
            .scan(ScanSource::Entities, b"%PDF", "application/pdf", &Vocabulary::fixed())
            .unwrap();
        let items = &outcome.drafts;
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].name.as_str(), items[0].quantity.as_str()), ("Milk", "2"));
        assert_eq!(items[0].amount.as_deref(), Some("$4.00"));
        assert_eq!((items[1].name.as_str(), items[1].quantity.as_str()), ("Bread", "1"));
        assert_eq!(items[1].amount, None);
        assert_eq!(outcome.extraction.vendor_name, None);
        assert_eq!(outcome.ocr_text, "MILK 2 $4.00\nBREAD");
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn tagging_failure_propagates_without_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let scanner =
            scanner(dir.path(), "").with_tagger(Arc::new(MockEntityTagger::failing("down")));
        let result = scanner.scan(ScanSource::Entities, b"jpeg", "image/jpeg", &Vocabulary::fixed());
        assert!(matches!(result, Err(ExtractionError::Tagging(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn entities_source_without_tagger_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = scanner(dir.path(), GOOD_REPLY).scan(
            ScanSource::Entities,
            b"jpeg",
            "image/jpeg",
            &Vocabulary::fixed(),
        );
        assert!(matches!(result, Err(ExtractionError::SourceUnavailable(_))));
    }

    #[test]
    fn scan_source_wire_names() {
        assert_eq!(serde_json::to_string(&ScanSource::Entities).unwrap(), "\"entities\"");
        let parsed: ScanSource = serde_json::from_str("\"generative\"").unwrap();
        assert_eq!(parsed, ScanSource::Generative);
    }
}
