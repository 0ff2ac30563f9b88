use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{monitor::RequestSample, state::AppState};

/// Records method, matched route, status and latency of every request.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Route templates keep the report from exploding into one row per id.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let _active = state.monitor.request_started();
    let started = Instant::now();
    let response = next.run(request).await;

    state.monitor.record(RequestSample {
        at: Utc::now(),
        method,
        path,
        status: response.status().as_u16(),
        duration: started.elapsed(),
    });

    response
}
