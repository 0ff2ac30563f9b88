use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartCount, CartLine, CartTotals, CartView, UpdateQuantityRequest},
    entity::{
        cart_items::{self, ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn cart_index(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let rows = CartItems::find()
        .find_also_related(Products)
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut cart_total = 0;
    let mut cart_count = 0;
    let mut items = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        cart_total += item.line_total();
        cart_count += i64::from(item.quantity);
        // Lines whose product is gone still count toward the totals.
        let Some(product) = product else { continue };
        items.push(CartLine {
            id: item.id,
            line_total: item.line_total(),
            quantity: item.quantity,
            price: item.price,
            product: product.into(),
        });
    }

    Ok(ApiResponse::success(
        "Cart",
        CartView {
            items,
            cart_total,
            cart_count,
        },
        Some(Meta::empty()),
    ))
}

/// Sum of `price * quantity` and of quantities over the user's whole cart.
pub async fn cart_totals<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartTotals> {
    let items = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .all(conn)
        .await?;
    Ok(CartTotals {
        cart_total: items.iter().map(cart_items::Model::line_total).sum(),
        cart_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
        item_total: None,
    })
}

fn ensure_in_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if quantity > product.stock {
        return Err(AppError::bad_request(format!(
            "Only {} items available in stock",
            product.stock
        )));
    }
    Ok(())
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<CartTotals> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::bad_request("Quantity must be greater than 0"));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(product.id))
        .one(&state.orm)
        .await?;

    let now = Utc::now();
    let item = match existing {
        Some(item) => {
            let new_quantity = item.quantity.saturating_add(quantity);
            ensure_in_stock(&product, new_quantity)?;
            let mut active: CartActive = item.into();
            active.quantity = Set(new_quantity);
            active.price = Set(product.effective_price());
            active.updated_at = Set(now.into());
            active.update(&state.orm).await?
        }
        None => {
            ensure_in_stock(&product, quantity)?;
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                price: Set(product.effective_price()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&state.orm)
            .await?
        }
    };

    tracing::debug!(
        user_id = %user.user_id,
        product_id = %product.id,
        quantity = item.quantity,
        "cart item saved"
    );

    let mut totals = cart_totals(&state.orm, user.user_id).await?;
    totals.item_total = Some(item.line_total());
    Ok(totals)
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateQuantityRequest,
) -> AppResult<CartTotals> {
    if payload.quantity <= 0 {
        return Err(AppError::bad_request("Quantity must be greater than 0"));
    }

    let (item, product) = CartItems::find_by_id(payload.cart_item_id)
        .find_also_related(Products)
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Cart item not found"))?;
    let product = product.ok_or_else(|| AppError::not_found("Product not found"))?;

    ensure_in_stock(&product, payload.quantity)?;

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    let mut totals = cart_totals(&state.orm, user.user_id).await?;
    totals.item_total = Some(item.line_total());
    Ok(totals)
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    cart_item_id: Uuid,
) -> AppResult<CartTotals> {
    let result = CartItems::delete_many()
        .filter(CartCol::Id.eq(cart_item_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Cart item not found"));
    }

    cart_totals(&state.orm, user.user_id).await
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<CartTotals> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    tracing::info!(user_id = %user.user_id, removed = result.rows_affected, "cart cleared");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_clear",
        Some("cart_items"),
        Some(serde_json::json!({ "removed": result.rows_affected })),
    )
    .await;

    Ok(CartTotals {
        cart_total: 0,
        cart_count: 0,
        item_total: None,
    })
}

/// Total quantity in the cart; anonymous callers always have an empty cart.
pub async fn cart_count(state: &AppState, user: Option<&AuthUser>) -> AppResult<CartCount> {
    let Some(user) = user else {
        return Ok(CartCount { count: 0 });
    };
    let totals = cart_totals(&state.orm, user.user_id).await?;
    Ok(CartCount {
        count: totals.cart_count,
    })
}
