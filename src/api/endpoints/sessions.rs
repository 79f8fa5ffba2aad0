//! Scan session endpoints.
//!
//! A session holds one confirmation buffer. Scans run without the session
//! lock held; the `Scanning` state keeps a second scan from starting.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::items::ItemsResponse;
use crate::api::endpoints::receipts::{read_receipt_file, ScanQuery};
use crate::api::error::ApiError;
use crate::api::types::{lock_session, run_blocking, ApiContext};
use crate::confirmation::{BufferError, BufferedDraft};
use crate::models::DraftField;
use crate::session::SessionSnapshot;

#[derive(Deserialize)]
pub struct OpenSessionRequest {
    #[serde(alias = "ownerId")]
    pub owner_id: String,
}

#[derive(Deserialize)]
pub struct UpdateDraftRequest {
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// `POST /api/sessions`
pub async fn open(
    State(ctx): State<ApiContext>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let core = ctx.core.clone();
    let snapshot = run_blocking(move || {
        let session = core.open_session(&request.owner_id)?;
        let snapshot = lock_session(&session)?.snapshot();
        Ok(snapshot)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /api/sessions/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = ctx.session(&id)?;
    let snapshot = lock_session(&session)?.snapshot();
    Ok(Json(snapshot))
}

/// `DELETE /api/sessions/:id`: drop the session and any pending drafts.
pub async fn close(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.core
        .close_session(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Session {id}")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/scan?source=…`: extract a receipt into the
/// session's buffer, replacing anything pending.
pub async fn scan(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScanQuery>,
    multipart: Multipart,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = ctx.session(&id)?;
    let file = read_receipt_file(multipart, ctx.core.config.max_upload_bytes).await?;

    let owner_id = {
        let mut guard = lock_session(&session)?;
        guard.begin_scan()?;
        guard.owner_id().to_string()
    };

    // The scan result is applied inside the blocking task so the session
    // leaves `Scanning` even if the client goes away mid-request.
    let core = ctx.core.clone();
    let source = query.source;
    let snapshot = run_blocking(move || {
        let result = core
            .vocabulary(&owner_id)
            .map_err(ApiError::from)
            .and_then(|vocabulary| {
                Ok(core
                    .scanner()
                    .scan(source, &file.bytes, &file.mime_type, &vocabulary)?)
            });

        let mut guard = lock_session(&session)?;
        match result {
            Ok(outcome) => {
                guard.complete_scan(outcome)?;
                Ok(guard.snapshot())
            }
            Err(e) => {
                tracing::info!(session_id = %id, error = %e, "Session scan failed");
                guard.fail_scan(&e.to_string())?;
                Err(e)
            }
        }
    })
    .await?;

    Ok(Json(snapshot))
}

/// `PATCH /api/sessions/:id/drafts/:draft_id` with `{ "field", "value" }`
pub async fn update_draft(
    State(ctx): State<ApiContext>,
    Path((id, draft_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateDraftRequest>,
) -> Result<Json<BufferedDraft>, ApiError> {
    let field: DraftField = request
        .field
        .parse()
        .map_err(|_| BufferError::UnknownField(request.field.clone()))?;
    let session = ctx.session(&id)?;
    let updated = lock_session(&session)?.update_draft(&draft_id, field, request.value)?;
    Ok(Json(updated))
}

/// `DELETE /api/sessions/:id/drafts/:draft_id`
pub async fn remove_draft(
    State(ctx): State<ApiContext>,
    Path((id, draft_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let session = ctx.session(&id)?;
    lock_session(&session)?.remove_draft(&draft_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/commit`
pub async fn commit(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ItemsResponse>), ApiError> {
    let session = ctx.session(&id)?;
    let store = ctx.core.store();
    let items = run_blocking(move || {
        let mut guard = lock_session(&session)?;
        Ok(guard.commit(store.as_ref())?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ItemsResponse { items })))
}

/// `POST /api/sessions/:id/cancel`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = ctx.session(&id)?;
    let mut guard = lock_session(&session)?;
    guard.cancel()?;
    Ok(Json(guard.snapshot()))
}
