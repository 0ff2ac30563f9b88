use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub uptime_seconds: u64,
    pub active_requests: i64,
    pub total_requests: u64,
    pub total_errors: u64,
    /// Percentage of requests answered with a 5xx status.
    pub error_rate: f64,
    pub average_response_ms: f64,
    pub requests_per_second: f64,
    pub cache_entries: u64,
    pub cache_hit_rate: f64,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub checks: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheSummary {
    pub entries: u64,
    pub max_entries: u64,
    pub usage_percent: f64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatistics {
    pub total_users: i64,
    pub total_sellers: i64,
    pub total_products: i64,
    pub active_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Sum of order totals, cancelled orders excluded.
    pub total_revenue: i64,
    pub total_reviews: i64,
    pub contact_messages: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub metrics: PerformanceMetrics,
    pub health: SystemHealth,
    pub cache: CacheSummary,
    pub statistics: SiteStatistics,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearPatternRequest {
    /// Key pattern; `*` matches any run of characters.
    pub pattern: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedCount {
    pub removed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CacheKeys {
    pub keys: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartData {
    pub series: String,
    pub hours: i64,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteReportRow {
    pub method: String,
    pub path: String,
    pub requests: u64,
    pub errors: u64,
    pub average_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub routes: Vec<RouteReportRow>,
}
