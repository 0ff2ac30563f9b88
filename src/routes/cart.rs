use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::{
        cart::{
            AddToCartRequest, CartCount, CartTotals, CartView, RemoveItemRequest,
            UpdateQuantityRequest,
        },
        orders::{CheckoutRequest, CheckoutResult},
    },
    error::AppResult,
    middleware::auth::{AuthUser, require_user},
    response::{ActionResponse, ApiResponse},
    services::{cart_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_index))
        .route("/add", post(add_to_cart))
        .route("/update-quantity", post(update_quantity))
        .route("/remove-item", post(remove_item))
        .route("/clear-cart", post(clear_cart))
        .route("/checkout", post(checkout))
        .route("/cart-count", get(cart_count))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart items with totals", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_index(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::cart_index(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses((status = 200, description = "Cart totals after adding", body = CartTotals)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<AddToCartRequest>,
) -> Json<ActionResponse<CartTotals>> {
    let result = async {
        let user = require_user(user)?;
        cart_service::add_to_cart(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Product added to cart",
        "An error occurred while adding the product to the cart",
    ))
}

#[utoipa::path(
    post,
    path = "/api/cart/update-quantity",
    request_body = UpdateQuantityRequest,
    responses((status = 200, description = "Cart totals and the line total", body = CartTotals)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Json<ActionResponse<CartTotals>> {
    let result = async {
        let user = require_user(user)?;
        cart_service::update_quantity(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Quantity updated",
        "An error occurred while updating quantity",
    ))
}

#[utoipa::path(
    post,
    path = "/api/cart/remove-item",
    request_body = RemoveItemRequest,
    responses((status = 200, description = "Cart totals after removal", body = CartTotals)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<RemoveItemRequest>,
) -> Json<ActionResponse<CartTotals>> {
    let result = async {
        let user = require_user(user)?;
        cart_service::remove_item(&state, &user, payload.cart_item_id).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Item removed from cart",
        "An error occurred while removing the item",
    ))
}

#[utoipa::path(
    post,
    path = "/api/cart/clear-cart",
    responses((status = 200, description = "Empty cart totals", body = CartTotals)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Json<ActionResponse<CartTotals>> {
    let result = async {
        let user = require_user(user)?;
        cart_service::clear_cart(&state, &user).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Cart cleared",
        "An error occurred while clearing the cart",
    ))
}

#[utoipa::path(
    post,
    path = "/api/cart/checkout",
    request_body = CheckoutRequest,
    responses((status = 200, description = "Placed order number and total", body = CheckoutResult)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Json<ActionResponse<CheckoutResult>> {
    let result = async {
        let user = require_user(user)?;
        order_service::checkout(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Order placed successfully",
        "An error occurred while placing the order",
    ))
}

#[utoipa::path(
    get,
    path = "/api/cart/cart-count",
    responses((status = 200, description = "Total quantity in the cart, 0 for guests", body = CartCount)),
    tag = "Cart"
)]
pub async fn cart_count(State(state): State<AppState>, user: Option<AuthUser>) -> Json<CartCount> {
    match cart_service::cart_count(&state, user.as_ref()).await {
        Ok(count) => Json(count),
        Err(err) => {
            tracing::error!(error = %err, "failed to count cart items");
            Json(CartCount { count: 0 })
        }
    }
}
