//! HTTP router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Layers (outermost → innermost): CORS, request logging, body limit.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Multipart framing allowance on top of the configured file size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the pantry API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let body_limit = core.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/receipts/upload", post(endpoints::receipts::upload))
        .route("/pantry/items", post(endpoints::items::commit))
        .route(
            "/items/:id",
            get(endpoints::items::detail)
                .put(endpoints::items::update)
                .delete(endpoints::items::remove),
        )
        .route("/owners/:owner_id", put(endpoints::owners::register))
        .route("/owners/:owner_id/items", get(endpoints::items::list))
        .route(
            "/owners/:owner_id/vocabulary",
            get(endpoints::owners::vocabulary),
        )
        .route(
            "/owners/:owner_id/categories",
            post(endpoints::owners::add_category),
        )
        .route("/sessions", post(endpoints::sessions::open))
        .route(
            "/sessions/:id",
            get(endpoints::sessions::detail).delete(endpoints::sessions::close),
        )
        .route("/sessions/:id/scan", post(endpoints::sessions::scan))
        .route(
            "/sessions/:id/drafts/:draft_id",
            patch(endpoints::sessions::update_draft).delete(endpoints::sessions::remove_draft),
        )
        .route("/sessions/:id/commit", post(endpoints::sessions::commit))
        .route("/sessions/:id/cancel", post(endpoints::sessions::cancel))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::logging::log_request));

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
}
