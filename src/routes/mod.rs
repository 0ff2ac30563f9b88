use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::{
    middleware::metrics::track_requests,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod cart;
pub mod contact;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod performance;
pub mod review;
pub mod seller_products;

/// Headroom for multipart boundaries and text fields next to the image part.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart::router())
        .nest("/contact", contact::router())
        .nest("/review", review::router())
        .nest("/seller/products", seller_products::router())
        .nest("/admin", admin_router())
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .nest("/performance", performance::router())
        .route("/contact-messages", get(contact::list_messages))
        .route("/reviews/approval", post(review::set_approval))
}

/// The full application without the outer tracing and request-id layers.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let image_root = state.images.root().join("images");

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .route_layer(from_fn_with_state(state.clone(), track_requests))
        .nest_service("/images", ServeDir::new(image_root))
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
