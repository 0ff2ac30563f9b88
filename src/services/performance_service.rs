use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
    sea_query::Expr,
};

use crate::{
    audit,
    dto::performance::{
        CacheKeys, CacheSummary, ChartData, ChartPoint, ClearedCount, ComponentHealth, Dashboard,
        HealthStatus, PageReport, PerformanceMetrics, RouteReportRow, SiteStatistics,
        SystemHealth,
    },
    entity::{
        contact_messages::Entity as ContactMessages,
        orders::{Column as OrderCol, Entity as Orders},
        product_reviews::Entity as ProductReviews,
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_SELLER, ensure_admin},
    models::OrderStatus,
    monitor::ChartSeries,
    response::{ApiResponse, Meta},
    routes::params::{ChartQuery, DateRangeQuery},
    state::AppState,
};

pub const METRICS_CACHE_KEY: &str = "current_performance_metrics";
pub const STATISTICS_CACHE_KEY: &str = "site_statistics";
pub const DEFAULT_CHART_HOURS: i64 = 24;
pub const MAX_CHART_HOURS: i64 = 24 * 7;

const SLOW_RESPONSE_MS: f64 = 500.0;
const VERY_SLOW_RESPONSE_MS: f64 = 2000.0;
const ERROR_RATE_WARN: f64 = 1.0;
const ERROR_RATE_CRITICAL: f64 = 5.0;
const CACHE_FILL_WARN: f64 = 90.0;

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Dashboard>> {
    ensure_admin(user)?;
    let data = Dashboard {
        metrics: current_metrics(state).await?,
        health: system_health(state).await,
        cache: cache_summary(state).await,
        statistics: site_statistics(state).await?,
    };
    Ok(ApiResponse::success("Performance dashboard", data, Some(Meta::empty())))
}

pub async fn metrics(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PerformanceMetrics>> {
    ensure_admin(user)?;
    let data = current_metrics(state).await?;
    Ok(ApiResponse::success("Performance metrics", data, Some(Meta::empty())))
}

/// Snapshot of the request monitor, cached for the configured TTL.
async fn current_metrics(state: &AppState) -> AppResult<PerformanceMetrics> {
    state
        .cache
        .get_or_insert(METRICS_CACHE_KEY, || async {
            let stats = state.monitor.stats();
            Ok(PerformanceMetrics {
                uptime_seconds: stats.uptime.as_secs(),
                active_requests: stats.active_requests,
                total_requests: stats.total_requests,
                total_errors: stats.total_errors,
                error_rate: error_rate(stats.total_errors, stats.total_requests),
                average_response_ms: stats.average_response_ms,
                requests_per_second: stats.requests_per_second,
                cache_entries: state.cache.entry_count().await,
                cache_hit_rate: state.cache.hit_rate(),
                collected_at: Utc::now(),
            })
        })
        .await
}

fn error_rate(errors: u64, requests: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        errors as f64 * 100.0 / requests as f64
    }
}

pub async fn health(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SystemHealth>> {
    ensure_admin(user)?;
    let data = system_health(state).await;
    Ok(ApiResponse::success("System health", data, Some(Meta::empty())))
}

/// Database reachability, cache fill, latency and error rate; overall status is the worst check.
pub async fn system_health(state: &AppState) -> SystemHealth {
    let mut checks = Vec::with_capacity(4);

    checks.push(match state.orm.ping().await {
        Ok(()) => ComponentHealth {
            name: "database".to_string(),
            status: HealthStatus::Healthy,
            detail: "Connection OK".to_string(),
        },
        Err(err) => {
            tracing::error!(error = %err, "database health check failed");
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                detail: "Database is unreachable".to_string(),
            }
        }
    });

    let cache = cache_summary(state).await;
    checks.push(ComponentHealth {
        name: "cache".to_string(),
        status: if cache.usage_percent >= CACHE_FILL_WARN {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        },
        detail: format!("{} of {} entries used", cache.entries, cache.max_entries),
    });

    let stats = state.monitor.stats();
    checks.push(ComponentHealth {
        name: "response_time".to_string(),
        status: threshold(stats.average_response_ms, SLOW_RESPONSE_MS, VERY_SLOW_RESPONSE_MS),
        detail: format!("Average {:.1} ms", stats.average_response_ms),
    });

    let rate = error_rate(stats.total_errors, stats.total_requests);
    checks.push(ComponentHealth {
        name: "error_rate".to_string(),
        status: threshold(rate, ERROR_RATE_WARN, ERROR_RATE_CRITICAL),
        detail: format!("{rate:.2}% of requests failed"),
    });

    let status = checks
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy);

    SystemHealth {
        status,
        checks,
        checked_at: Utc::now(),
    }
}

fn threshold(value: f64, warn: f64, critical: f64) -> HealthStatus {
    if value >= critical {
        HealthStatus::Unhealthy
    } else if value >= warn {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

async fn cache_summary(state: &AppState) -> CacheSummary {
    let entries = state.cache.entry_count().await;
    let max_entries = state.cache.max_entries();
    CacheSummary {
        entries,
        max_entries,
        usage_percent: if max_entries == 0 {
            0.0
        } else {
            entries as f64 * 100.0 / max_entries as f64
        },
        hit_rate: state.cache.hit_rate(),
    }
}

pub async fn statistics(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SiteStatistics>> {
    ensure_admin(user)?;
    let data = site_statistics(state).await?;
    Ok(ApiResponse::success("Site statistics", data, Some(Meta::empty())))
}

async fn site_statistics(state: &AppState) -> AppResult<SiteStatistics> {
    state
        .cache
        .get_or_insert(STATISTICS_CACHE_KEY, || count_site_statistics(&state.orm))
        .await
}

pub async fn count_site_statistics<C: ConnectionTrait>(conn: &C) -> AppResult<SiteStatistics> {
    let cancelled = OrderStatus::Cancelled.as_str();
    let revenue: Option<i64> = Orders::find()
        .select_only()
        .column_as(
            Expr::cust("CAST(COALESCE(SUM(total_amount), 0) AS BIGINT)"),
            "revenue",
        )
        .filter(OrderCol::Status.ne(cancelled))
        .into_tuple::<i64>()
        .one(conn)
        .await?;

    Ok(SiteStatistics {
        total_users: Users::find().count(conn).await? as i64,
        total_sellers: Users::find()
            .filter(UserCol::Role.eq(ROLE_SELLER))
            .count(conn)
            .await? as i64,
        total_products: Products::find().count(conn).await? as i64,
        active_products: Products::find()
            .filter(ProdCol::IsActive.eq(true))
            .count(conn)
            .await? as i64,
        total_orders: Orders::find().count(conn).await? as i64,
        pending_orders: Orders::find()
            .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
            .count(conn)
            .await? as i64,
        total_revenue: revenue.unwrap_or(0),
        total_reviews: ProductReviews::find().count(conn).await? as i64,
        contact_messages: ContactMessages::find().count(conn).await? as i64,
    })
}

pub async fn clear_cache(state: &AppState, user: &AuthUser) -> AppResult<()> {
    ensure_admin(user)?;
    let entries = state.cache.entry_count().await;
    state.cache.clear().await;

    tracing::info!(user_id = %user.user_id, entries, "cache cleared");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "cache_clear",
        Some("cache"),
        Some(serde_json::json!({ "entries": entries })),
    )
    .await;
    Ok(())
}

pub async fn clear_cache_pattern(
    state: &AppState,
    user: &AuthUser,
    pattern: &str,
) -> AppResult<ClearedCount> {
    ensure_admin(user)?;
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(AppError::bad_request("Pattern is required"));
    }
    let removed = state.cache.remove_by_pattern(pattern).await;

    tracing::info!(user_id = %user.user_id, pattern, removed, "cache entries cleared by pattern");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "cache_clear_pattern",
        Some("cache"),
        Some(serde_json::json!({ "pattern": pattern, "removed": removed })),
    )
    .await;
    Ok(ClearedCount { removed })
}

pub async fn cache_keys(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CacheKeys>> {
    ensure_admin(user)?;
    let keys = state.cache.keys().await;
    let count = keys.len();
    Ok(ApiResponse::success(
        "Cache keys",
        CacheKeys { keys, count },
        Some(Meta::empty()),
    ))
}

pub async fn chart_data(
    state: &AppState,
    user: &AuthUser,
    query: ChartQuery,
) -> AppResult<ApiResponse<ChartData>> {
    ensure_admin(user)?;
    let series_name = query.series.as_deref().unwrap_or("requests");
    let series = ChartSeries::parse(series_name).ok_or_else(|| {
        AppError::bad_request("Chart type must be one of requests, response_time, errors")
    })?;
    let hours = query
        .hours
        .unwrap_or(DEFAULT_CHART_HOURS)
        .clamp(1, MAX_CHART_HOURS);

    let points = state
        .monitor
        .hourly_series(series, hours, Utc::now())
        .into_iter()
        .map(|(time, value)| ChartPoint { time, value })
        .collect();

    Ok(ApiResponse::success(
        "Chart data",
        ChartData {
            series: series_name.trim().to_ascii_lowercase(),
            hours,
            points,
        },
        Some(Meta::empty()),
    ))
}

pub async fn page_report(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<PageReport>> {
    ensure_admin(user)?;
    let (from, to) = report_window(query.from, query.to, Utc::now())?;
    let routes = state
        .monitor
        .route_report(from, to)
        .into_iter()
        .map(|r| RouteReportRow {
            method: r.method,
            path: r.path,
            requests: r.requests,
            errors: r.errors,
            average_ms: r.average_ms,
            max_ms: r.max_ms,
        })
        .collect();

    Ok(ApiResponse::success(
        "Page performance report",
        PageReport { from, to, routes },
        Some(Meta::empty()),
    ))
}

/// Defaults to the last seven days ending now.
fn report_window(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to - TimeDelta::days(7));
    if from > to {
        return Err(AppError::bad_request("'from' must be before 'to'"));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_pick_the_right_band() {
        assert_eq!(threshold(10.0, 500.0, 2000.0), HealthStatus::Healthy);
        assert_eq!(threshold(500.0, 500.0, 2000.0), HealthStatus::Degraded);
        assert_eq!(threshold(2500.0, 500.0, 2000.0), HealthStatus::Unhealthy);
    }

    #[test]
    fn error_rate_handles_idle_server() {
        assert_eq!(error_rate(0, 0), 0.0);
        assert_eq!(error_rate(1, 4), 25.0);
    }

    #[test]
    fn report_window_defaults_to_a_week() {
        let now = Utc::now();
        let (from, to) = report_window(None, None, now).expect("window");
        assert_eq!(to, now);
        assert_eq!(to - from, TimeDelta::days(7));
        assert!(report_window(Some(now), Some(now - TimeDelta::hours(1)), now).is_err());
    }
}
