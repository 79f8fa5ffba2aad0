//! Pantry item endpoints: stateless commit and CRUD by id.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::confirmation::commit_drafts;
use crate::models::{LineItemDraft, PantryItem};
use crate::pipeline::validation::validate_draft;

#[derive(Deserialize)]
pub struct CommitRequest {
    #[serde(alias = "ownerId")]
    pub owner_id: String,
    pub items: Vec<LineItemDraft>,
}

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<PantryItem>,
}

/// `POST /api/pantry/items`: validate and store a batch in one go.
pub async fn commit(
    State(ctx): State<ApiContext>,
    Json(request): Json<CommitRequest>,
) -> Result<(StatusCode, Json<ItemsResponse>), ApiError> {
    let store = ctx.core.store();
    let items = run_blocking(move || {
        Ok(commit_drafts(
            store.as_ref(),
            &request.owner_id,
            request.items.iter().map(|draft| (None, draft)),
        )?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ItemsResponse { items })))
}

/// `GET /api/owners/:owner_id/items`
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let store = ctx.core.store();
    let items = run_blocking(move || Ok(store.list_items(&owner_id)?)).await?;
    Ok(Json(ItemsResponse { items }))
}

/// `GET /api/items/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<PantryItem>, ApiError> {
    let store = ctx.core.store();
    let item = run_blocking(move || Ok(store.get_item(&id)?)).await?;
    Ok(Json(item))
}

/// `PUT /api/items/:id`: replace the editable fields. The body is
/// validated like a draft at commit, against the item owner's vocabulary.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(draft): Json<LineItemDraft>,
) -> Result<Json<PantryItem>, ApiError> {
    let core = ctx.core.clone();
    let item = run_blocking(move || {
        let store = core.store();
        let existing = store.get_item(&id)?;
        let vocabulary = core.vocabulary(&existing.owner_id)?;
        let validated = validate_draft(&draft, &vocabulary)?;
        Ok(store.update_item(&id, validated)?)
    })
    .await?;
    Ok(Json(item))
}

/// `DELETE /api/items/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let store = ctx.core.store();
    run_blocking(move || Ok(store.delete_item(&id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
