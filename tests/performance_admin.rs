mod common;

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use common::{NewProduct, auth, create_category, create_order, create_product, create_user, setup_state};
use fashion_storefront_api::{
    dto::performance::HealthStatus,
    error::AppError,
    middleware::auth::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_SELLER},
    models::OrderStatus,
    monitor::RequestSample,
    routes::params::{ChartQuery, DateRangeQuery},
    services::{performance_service, review_service},
};

fn sample(path: &str, status: u16, ms: u64) -> RequestSample {
    RequestSample {
        at: Utc::now(),
        method: "GET".into(),
        path: path.into(),
        status,
        duration: Duration::from_millis(ms),
    }
}

#[tokio::test]
async fn statistics_exclude_cancelled_revenue_and_are_cached() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let customer_id = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
    let admin_id = create_user(&state, ROLE_ADMIN, "admin@shop.vn", "Store", "Admin").await?;
    let category_id = create_category(&state, "Shirts").await?;
    let shirt = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Linen Shirt",
            sku: "LS-001",
            price: 100,
            stock: 50,
        },
    )
    .await?;
    create_order(&state, customer_id, "ORD-1", OrderStatus::Pending, &[(&shirt, 2)], 30).await?;
    create_order(&state, customer_id, "ORD-2", OrderStatus::Delivered, &[(&shirt, 3)], 20).await?;
    create_order(&state, customer_id, "ORD-3", OrderStatus::Cancelled, &[(&shirt, 10)], 10).await?;
    let admin = auth(admin_id, ROLE_ADMIN);

    let stats = performance_service::statistics(&state, &admin)
        .await?
        .data
        .expect("statistics");
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_sellers, 1);
    assert_eq!(stats.total_products, 1);
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.total_revenue, 500);

    create_user(&state, ROLE_CUSTOMER, "binh@shop.vn", "Binh", "Pham").await?;
    let cached = performance_service::statistics(&state, &admin)
        .await?
        .data
        .expect("statistics");
    assert_eq!(cached.total_users, 3);

    let keys = performance_service::cache_keys(&state, &admin)
        .await?
        .data
        .expect("keys");
    assert_eq!(keys.keys, vec![performance_service::STATISTICS_CACHE_KEY.to_string()]);

    performance_service::clear_cache(&state, &admin).await?;
    let fresh = performance_service::statistics(&state, &admin)
        .await?
        .data
        .expect("statistics");
    assert_eq!(fresh.total_users, 4);

    let err = performance_service::statistics(&state, &auth(customer_id, ROLE_CUSTOMER))
        .await
        .expect_err("admins only");
    assert!(matches!(err, AppError::Forbidden(_)));

    Ok(())
}

#[tokio::test]
async fn cache_entries_can_be_cleared_by_pattern() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let admin_id = create_user(&state, ROLE_ADMIN, "admin@shop.vn", "Store", "Admin").await?;
    let admin = auth(admin_id, ROLE_ADMIN);

    let first = uuid::Uuid::new_v4();
    let second = uuid::Uuid::new_v4();
    state.cache.set(review_service::stats_cache_key(first), &1).await?;
    state.cache.set(review_service::stats_cache_key(second), &2).await?;
    state.cache.set("site_statistics", &3).await?;

    let cleared = performance_service::clear_cache_pattern(&state, &admin, "review_stats:*").await?;
    assert_eq!(cleared.removed, 2);

    let keys = performance_service::cache_keys(&state, &admin)
        .await?
        .data
        .expect("keys");
    assert_eq!(keys.count, 1);
    assert_eq!(keys.keys, vec!["site_statistics".to_string()]);

    let err = performance_service::clear_cache_pattern(&state, &admin, "  ")
        .await
        .expect_err("blank pattern");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn monitor_feeds_health_charts_and_reports() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let admin_id = create_user(&state, ROLE_ADMIN, "admin@shop.vn", "Store", "Admin").await?;
    let admin = auth(admin_id, ROLE_ADMIN);

    let health = performance_service::health(&state, &admin)
        .await?
        .data
        .expect("health");
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.checks.len(), 4);

    for _ in 0..3 {
        state.monitor.record(sample("/api/cart", 200, 20));
    }
    state.monitor.record(sample("/api/admin/orders", 500, 120));

    let health = performance_service::health(&state, &admin)
        .await?
        .data
        .expect("health");
    // One failure out of four requests is far above the critical error rate.
    assert_eq!(health.status, HealthStatus::Unhealthy);
    let error_check = health
        .checks
        .iter()
        .find(|c| c.name == "error_rate")
        .expect("error rate check");
    assert_eq!(error_check.status, HealthStatus::Unhealthy);

    let chart = performance_service::chart_data(
        &state,
        &admin,
        ChartQuery {
            series: Some("requests".into()),
            hours: Some(6),
        },
    )
    .await?
    .data
    .expect("chart");
    assert_eq!(chart.hours, 6);
    assert_eq!(chart.points.len(), 7);
    assert_eq!(chart.points.last().map(|p| p.value), Some(4.0));

    let err = performance_service::chart_data(
        &state,
        &admin,
        ChartQuery {
            series: Some("memory".into()),
            hours: None,
        },
    )
    .await
    .expect_err("unknown series");
    assert!(matches!(err, AppError::BadRequest(_)));

    let report = performance_service::page_report(&state, &admin, DateRangeQuery::default())
        .await?
        .data
        .expect("report");
    assert_eq!(report.routes.len(), 2);
    assert_eq!(report.routes[0].path, "/api/admin/orders");
    assert_eq!(report.routes[0].errors, 1);
    assert_eq!(report.routes[1].requests, 3);

    let now = Utc::now();
    let err = performance_service::page_report(
        &state,
        &admin,
        DateRangeQuery {
            from: Some(now),
            to: Some(now - TimeDelta::days(1)),
        },
    )
    .await
    .expect_err("inverted window");
    assert!(matches!(err, AppError::BadRequest(_)));

    let dashboard = performance_service::dashboard(&state, &admin)
        .await?
        .data
        .expect("dashboard");
    assert_eq!(dashboard.metrics.total_requests, 4);
    assert_eq!(dashboard.metrics.total_errors, 1);
    assert_eq!(dashboard.statistics.total_users, 1);

    Ok(())
}
