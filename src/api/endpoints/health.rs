//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub vision_model: String,
    pub entity_source: bool,
    pub open_sessions: usize,
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let scanner = ctx.core.scanner();
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        vision_model: scanner.model().to_string(),
        entity_source: scanner.has_tagger(),
        open_sessions: ctx.core.session_count(),
    })
}
