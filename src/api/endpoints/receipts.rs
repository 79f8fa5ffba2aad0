//! Receipt upload endpoint.
//!
//! `POST /api/receipts/upload` runs one scan and returns the structured
//! result without keeping any state. The multipart reader here is shared
//! with the session scan endpoint.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::models::LineItemDraft;
use crate::pipeline::generative::ExtractionResult;
use crate::pipeline::scan::{ScanOutcome, ScanSource};
use crate::pipeline::validation::Vocabulary;

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub source: ScanSource,
    pub owner_id: Option<String>,
}

/// `extractedData` is the service's result as returned; `drafts` holds the
/// same items normalized against the vocabulary, ready for confirmation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub ocr_text: String,
    pub extracted_data: ExtractionResult,
    pub drafts: Vec<LineItemDraft>,
    pub warnings: Vec<String>,
}

impl From<ScanOutcome> for UploadResponse {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            message: format!(
                "Receipt processed: {} item(s) extracted",
                outcome.drafts.len()
            ),
            ocr_text: outcome.ocr_text,
            extracted_data: outcome.extraction,
            drafts: outcome.drafts,
            warnings: outcome.warnings,
        }
    }
}

/// One uploaded file from a multipart body.
pub struct ReceiptFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Read the first file field. The content type comes from the part header,
/// or is guessed from the file name.
pub async fn read_receipt_file(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<ReceiptFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(str::to_string)
            .filter(|m| m != "application/octet-stream")
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first_raw())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = field.bytes().await?;
        if bytes.len() > max_bytes {
            return Err(ApiError::BadRequest(format!(
                "File exceeds the {max_bytes} byte upload limit"
            )));
        }
        return Ok(ReceiptFile {
            bytes: bytes.to_vec(),
            mime_type,
        });
    }

    Err(ApiError::FileAccess("no file in upload".into()))
}

/// `POST /api/receipts/upload?source=generative|entities&owner_id=…`
pub async fn upload(
    State(ctx): State<ApiContext>,
    Query(query): Query<ScanQuery>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_receipt_file(multipart, ctx.core.config.max_upload_bytes).await?;

    let core = ctx.core.clone();
    let outcome = run_blocking(move || {
        let vocabulary = match &query.owner_id {
            Some(owner_id) => core.vocabulary(owner_id)?,
            None => Vocabulary::fixed(),
        };
        Ok(core
            .scanner()
            .scan(query.source, &file.bytes, &file.mime_type, &vocabulary)?)
    })
    .await?;

    Ok(Json(outcome.into()))
}
