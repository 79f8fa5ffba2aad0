//! Owner registration and vocabulary endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::models::Owner;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterOwnerRequest {
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResponse {
    pub units: Vec<&'static str>,
    pub categories: Vec<String>,
    pub custom_categories: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddCategoryRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct AddCategoryResponse {
    pub name: String,
    pub created: bool,
}

/// `PUT /api/owners/:owner_id`: mirror an account into the pantry store.
pub async fn register(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
    body: Option<Json<RegisterOwnerRequest>>,
) -> Result<Json<Owner>, ApiError> {
    let owner_id = owner_id.trim().to_string();
    if owner_id.is_empty() {
        return Err(ApiError::BadRequest("owner id must not be empty".into()));
    }
    let display_name = body
        .and_then(|Json(b)| b.display_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let store = ctx.core.store();
    let owner =
        run_blocking(move || Ok(store.register_owner(&owner_id, display_name.as_deref())?)).await?;
    Ok(Json(owner))
}

/// `GET /api/owners/:owner_id/vocabulary`
pub async fn vocabulary(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
) -> Result<Json<VocabularyResponse>, ApiError> {
    let core = ctx.core.clone();
    let vocabulary = run_blocking(move || Ok(core.vocabulary(&owner_id)?)).await?;
    Ok(Json(VocabularyResponse {
        units: vocabulary.units(),
        categories: vocabulary.categories(),
        custom_categories: vocabulary.custom_categories().to_vec(),
    }))
}

/// `POST /api/owners/:owner_id/categories`
pub async fn add_category(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
    Json(request): Json<AddCategoryRequest>,
) -> Result<(StatusCode, Json<AddCategoryResponse>), ApiError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("category name must not be empty".into()));
    }

    let core = ctx.core.clone();
    let category = name.clone();
    let created = run_blocking(move || {
        if core.vocabulary(&owner_id)?.allows_category(&category) {
            return Ok(false);
        }
        Ok(core.store().add_custom_category(&owner_id, &category)?)
    })
    .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddCategoryResponse { name, created })))
}
