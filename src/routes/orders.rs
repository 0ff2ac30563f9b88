use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CancelOrderRequest, OrderDetails, OrderList, OrderStatusChanged, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::{AuthUser, require_user},
    response::{ActionResponse, ApiResponse},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

/// Admin order management, mounted under `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/order-details/{id}", get(order_details))
        .route("/update-order-status", post(update_order_status))
        .route("/orders/cancel", post(cancel_order))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders, newest first", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/order-details/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with customer and items", body = ApiResponse<OrderDetails>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Orders"
)]
pub async fn order_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let resp = order_service::get_order_details(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/update-order-status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "`success` tells whether the status changed", body = OrderStatusChanged),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Json<ActionResponse<OrderStatusChanged>> {
    let result = async {
        let user = require_user(user)?;
        order_service::update_order_status(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Order status updated successfully",
        "An error occurred while updating the order status",
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/cancel",
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "`success` tells whether the order was cancelled", body = OrderStatusChanged),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<CancelOrderRequest>,
) -> Json<ActionResponse<OrderStatusChanged>> {
    let result = async {
        let user = require_user(user)?;
        order_service::cancel_order(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Order cancelled successfully",
        "An error occurred while cancelling the order",
    ))
}
