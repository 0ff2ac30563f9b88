use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::performance::{
        CacheKeys, ChartData, ClearPatternRequest, ClearedCount, Dashboard, PageReport,
        PerformanceMetrics, SiteStatistics, SystemHealth,
    },
    error::AppResult,
    middleware::auth::{AuthUser, require_user},
    response::{ActionResponse, ApiResponse},
    routes::params::{ChartQuery, DateRangeQuery},
    services::performance_service,
    state::AppState,
};

/// Mounted under `/api/admin/performance`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .route("/statistics", get(statistics))
        .route("/clear-cache", post(clear_cache))
        .route("/clear-cache-pattern", post(clear_cache_pattern))
        .route("/cache-keys", get(cache_keys))
        .route("/chart-data", get(chart_data))
        .route("/page-report", get(page_report))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance",
    responses(
        (status = 200, description = "Metrics, health, cache and site statistics", body = ApiResponse<Dashboard>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let resp = performance_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/metrics",
    responses(
        (status = 200, description = "Request metrics since startup", body = ApiResponse<PerformanceMetrics>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn metrics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PerformanceMetrics>>> {
    let resp = performance_service::metrics(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/health",
    responses(
        (status = 200, description = "Component health checks", body = ApiResponse<SystemHealth>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn health(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SystemHealth>>> {
    let resp = performance_service::health(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/statistics",
    responses(
        (status = 200, description = "Catalogue and order counts", body = ApiResponse<SiteStatistics>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SiteStatistics>>> {
    let resp = performance_service::statistics(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/performance/clear-cache",
    responses((status = 200, description = "`success` tells whether the cache was cleared")),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn clear_cache(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Json<ActionResponse<()>> {
    let result = async {
        let user = require_user(user)?;
        performance_service::clear_cache(&state, &user).await
    }
    .await;
    Json(ActionResponse::from_unit(
        result,
        "Cache cleared successfully",
        "An error occurred while clearing the cache",
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/performance/clear-cache-pattern",
    request_body = ClearPatternRequest,
    responses((status = 200, description = "Number of removed cache entries", body = ClearedCount)),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn clear_cache_pattern(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<ClearPatternRequest>,
) -> Json<ActionResponse<ClearedCount>> {
    let result = async {
        let user = require_user(user)?;
        performance_service::clear_cache_pattern(&state, &user, &payload.pattern).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Matching cache entries cleared",
        "An error occurred while clearing the cache",
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/cache-keys",
    responses(
        (status = 200, description = "Live cache keys", body = ApiResponse<CacheKeys>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn cache_keys(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CacheKeys>>> {
    let resp = performance_service::cache_keys(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/chart-data",
    params(ChartQuery),
    responses(
        (status = 200, description = "Hourly series", body = ApiResponse<ChartData>),
        (status = 400, description = "Unknown series type"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn chart_data(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ChartQuery>,
) -> AppResult<Json<ApiResponse<ChartData>>> {
    let resp = performance_service::chart_data(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/performance/page-report",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Per-route timings for the window", body = ApiResponse<PageReport>),
        (status = 400, description = "`from` is after `to`"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn page_report(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<PageReport>>> {
    let resp = performance_service::page_report(&state, &user, query).await?;
    Ok(Json(resp))
}
