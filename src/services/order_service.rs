use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        AdminOrderRow, CancelOrderRequest, CheckoutRequest, CheckoutResult, OrderDetails,
        OrderList, OrderStatusChanged, UpdateOrderStatusRequest,
    },
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderItem, OrderStatus, UserSummary},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, non_blank},
    services::paging::{contains_ci, like_pattern, paginate},
    state::AppState,
};

pub const ORDER_PAGE_SIZE: i64 = 20;

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let mut condition = Condition::all();
    if let Some(status) = non_blank(query.status.as_ref()) {
        let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find();
    if let Some(search) = non_blank(query.search.as_ref()) {
        let pattern = like_pattern(search);
        finder = finder.join(JoinType::LeftJoin, orders::Relation::Users.def());
        condition = condition.add(
            Condition::any()
                .add(contains_ci::<Orders>(OrderCol::OrderNumber, &pattern))
                .add(contains_ci::<Users>(UserCol::FirstName, &pattern))
                .add(contains_ci::<Users>(UserCol::LastName, &pattern))
                .add(contains_ci::<Users>(UserCol::Email, &pattern)),
        );
    }

    let finder = finder
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id);
    let (orders, meta) =
        paginate(finder, &state.orm, &query.pagination(), ORDER_PAGE_SIZE).await?;

    let customer_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
    let customers = load_customers(&state.orm, customer_ids).await?;

    let items = orders
        .into_iter()
        .map(|order| AdminOrderRow {
            customer: customers.get(&order.user_id).cloned().map(UserSummary::from),
            order: order.into(),
        })
        .collect();

    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

async fn load_customers<C: ConnectionTrait>(
    conn: &C,
    mut ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, users::Model>> {
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = Users::find().filter(UserCol::Id.is_in(ids)).all(conn).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn get_order_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetails>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let customer = Users::find_by_id(order.user_id)
        .one(&state.orm)
        .await?
        .map(UserSummary::from);

    let items: Vec<OrderItem> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "Order found",
        OrderDetails {
            order: order.into(),
            customer,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateOrderStatusRequest,
) -> AppResult<OrderStatusChanged> {
    ensure_admin(user)?;
    let status: OrderStatus = payload.status.parse().map_err(AppError::BadRequest)?;

    if status == OrderStatus::Cancelled {
        return cancel_order(
            state,
            user,
            CancelOrderRequest {
                order_id: payload.order_id,
                reason: payload.note,
            },
        )
        .await;
    }

    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status == OrderStatus::Cancelled.as_str() {
        return Err(AppError::bad_request(
            "Cancelled orders cannot change status",
        ));
    }

    let now = Utc::now();
    let previous = order.status.clone();
    let shipped_at = order.shipped_at;
    let notes = order.notes.clone();

    let mut active: OrderActive = order.into();
    active.status = Set(status.as_str().to_string());
    match status {
        OrderStatus::Shipped => active.shipped_at = Set(Some(now.into())),
        OrderStatus::Delivered => {
            active.delivered_at = Set(Some(now.into()));
            if shipped_at.is_none() {
                active.shipped_at = Set(Some(now.into()));
            }
        }
        _ => {}
    }
    if let Some(note) = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        active.notes = Set(Some(append_note(notes.as_deref(), note, now)));
    }
    active.updated_at = Set(now.into());
    let order = active.update(&state.orm).await?;

    tracing::info!(
        order_id = %order.id,
        from = %previous,
        to = %order.status,
        "order status updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "from": previous, "to": order.status })),
    )
    .await;

    Ok(OrderStatusChanged {
        order_id: order.id,
        status: order.status,
    })
}

/// Cancels an order and puts the reserved quantities back on stock-managed products.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    payload: CancelOrderRequest,
) -> AppResult<OrderStatusChanged> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(payload.order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    match order.status.parse::<OrderStatus>() {
        Ok(OrderStatus::Delivered) => {
            return Err(AppError::bad_request("Delivered orders cannot be cancelled"));
        }
        Ok(OrderStatus::Cancelled) => {
            return Err(AppError::bad_request("Order is already cancelled"));
        }
        _ => {}
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;

    let now = Utc::now();
    let stamp: DateTimeWithTimeZone = now.into();
    for item in &items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(stamp))
            .filter(ProdCol::Id.eq(item.product_id))
            .filter(ProdCol::ManageStock.eq(true))
            .exec(&txn)
            .await?;
    }

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let note = match reason {
        Some(reason) => format!("Order cancelled: {reason}"),
        None => "Order cancelled".to_string(),
    };
    let notes = append_note(order.notes.as_deref(), &note, now);

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_string());
    active.notes = Set(Some(notes));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, restored_items = items.len(), "order cancelled");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "reason": reason })),
    )
    .await;

    Ok(OrderStatusChanged {
        order_id: order.id,
        status: order.status,
    })
}

pub const DEFAULT_PAYMENT_METHOD: &str = "cod";

/// Turns the caller's cart into a pending order.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<CheckoutResult> {
    let shipping_address = payload.shipping_address.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "shippingAddress",
            "Shipping address is required",
        )]));
    }
    let billing_address = payload
        .billing_address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| shipping_address.clone());
    let payment_method = payload
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD)
        .to_lowercase();

    let txn = state.orm.begin().await?;

    let rows: Vec<(cart_items::Model, Option<products::Model>)> = CartItems::find()
        .find_also_related(Products)
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&txn)
        .await?;

    if rows.is_empty() {
        return Err(AppError::bad_request("Your cart is empty"));
    }

    let mut lines = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let product = product
            .ok_or_else(|| AppError::bad_request("A product in your cart no longer exists"))?;
        if !product.is_active {
            return Err(AppError::bad_request(format!(
                "{} is no longer available",
                product.name
            )));
        }
        if product.stock < item.quantity {
            return Err(AppError::bad_request(format!(
                "Only {} items of {} available in stock",
                product.stock, product.name
            )));
        }
        lines.push((item, product));
    }

    let total_amount: i64 = lines.iter().map(|(item, _)| item.line_total()).sum();
    let now = Utc::now();
    let stamp: DateTimeWithTimeZone = now.into();
    let order_id = Uuid::new_v4();
    let order_number = build_order_number(order_id, now);

    OrderActive {
        id: Set(order_id),
        order_number: Set(order_number.clone()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set("unpaid".to_string()),
        payment_method: Set(payment_method),
        total_amount: Set(total_amount),
        shipping_fee: Set(0),
        discount_amount: Set(0),
        shipping_address: Set(shipping_address),
        billing_address: Set(billing_address),
        notes: Set(payload.notes.filter(|n| !n.trim().is_empty())),
        shipped_at: Set(None),
        delivered_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (item, product) in &lines {
        order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            product_sku: Set(product.sku.clone()),
            product_image: Set(product.featured_image_url.clone()),
            quantity: Set(item.quantity),
            unit_price: Set(item.price),
            total_price: Set(item.line_total()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        if product.manage_stock {
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
                .col_expr(ProdCol::UpdatedAt, Expr::value(stamp))
                .filter(ProdCol::Id.eq(product.id))
                .exec(&txn)
                .await?;
        }
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order_id, %order_number, total_amount, "order placed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "order_number": order_number })),
    )
    .await;

    Ok(CheckoutResult {
        order_id,
        order_number,
        total_amount,
    })
}

/// `ORD-YYYYMMDD-XXXXXXXX` where the suffix is the first eight hex digits of the order id.
pub fn build_order_number(order_id: Uuid, at: DateTime<Utc>) -> String {
    let simple = order_id.simple().to_string().to_uppercase();
    format!("ORD-{}-{}", at.format("%Y%m%d"), &simple[..8])
}

/// Appends `[dd/mm/YYYY HH:MM] note` on its own line.
pub fn append_note(existing: Option<&str>, note: &str, at: DateTime<Utc>) -> String {
    let line = format!("[{}] {}", at.format("%d/%m/%Y %H:%M"), note);
    match existing.map(str::trim_end).filter(|n| !n.is_empty()) {
        Some(existing) => format!("{existing}\n{line}"),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        assert_eq!(build_order_number(id, at), "ORD-20240309-A1B2C3D4");
    }

    #[test]
    fn notes_are_appended_with_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 12, 1, 8, 5, 0).unwrap();
        assert_eq!(append_note(None, "Packed", at), "[01/12/2024 08:05] Packed");
        assert_eq!(
            append_note(Some("[30/11/2024 10:00] Paid\n"), "Packed", at),
            "[30/11/2024 10:00] Paid\n[01/12/2024 08:05] Packed"
        );
    }
}
