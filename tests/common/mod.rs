#![allow(dead_code)]

use std::path::Path;

use chrono::{Duration, Utc};
use fashion_storefront_api::{
    config::AppConfig,
    entity::{
        audit_logs, brands, cart_items, categories, contact_messages, order_items, orders,
        product_reviews,
        products::{self, ActiveModel as ProductActive},
        users::{self, ActiveModel as UserActive},
    },
    middleware::auth::{AuthUser, Claims},
    models::OrderStatus,
    state::AppState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

/// Fresh in-memory SQLite database with every table created from the entities.
pub async fn setup_state(upload_dir: &Path) -> anyhow::Result<AppState> {
    setup_state_with(upload_dir, |_| {}).await
}

pub async fn setup_state_with(
    upload_dir: &Path,
    configure: impl FnOnce(&mut AppConfig),
) -> anyhow::Result<AppState> {
    // A single connection keeps the in-memory database alive for the whole test.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    create_schema(&orm).await?;

    let mut config = AppConfig::for_database("sqlite::memory:");
    config.jwt_secret = JWT_SECRET.to_string();
    config.upload_dir = upload_dir.to_path_buf();
    config.max_upload_bytes = 64 * 1024;
    configure(&mut config);
    Ok(AppState::new(orm, config))
}

async fn create_schema(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    let statements = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(categories::Entity),
        schema.create_table_from_entity(brands::Entity),
        schema.create_table_from_entity(products::Entity),
        schema.create_table_from_entity(cart_items::Entity),
        schema.create_table_from_entity(orders::Entity),
        schema.create_table_from_entity(order_items::Entity),
        schema.create_table_from_entity(product_reviews::Entity),
        schema.create_table_from_entity(contact_messages::Entity),
        schema.create_table_from_entity(audit_logs::Entity),
    ];
    for statement in &statements {
        orm.execute(backend.build(statement)).await?;
    }
    Ok(())
}

pub fn auth(user_id: Uuid, role: &str) -> AuthUser {
    AuthUser {
        user_id,
        role: role.to_string(),
    }
}

pub fn bearer(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token");
    format!("Bearer {token}")
}

pub async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set(Some(first_name.to_string())),
        last_name: Set(Some(last_name.to_string())),
        phone: Set(Some("0901234567".to_string())),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

pub async fn create_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(name.to_lowercase().replace(' ', "-")),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub struct NewProduct<'a> {
    pub seller_id: Uuid,
    pub category_id: Uuid,
    pub name: &'a str,
    pub sku: &'a str,
    pub price: i64,
    pub stock: i32,
}

pub async fn create_product(state: &AppState, new: NewProduct<'_>) -> anyhow::Result<products::Model> {
    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(new.seller_id),
        category_id: Set(new.category_id),
        brand_id: Set(None),
        name: Set(new.name.to_string()),
        slug: Set(new.sku.to_lowercase()),
        sku: Set(new.sku.to_string()),
        description: Set(None),
        price: Set(new.price),
        sale_price: Set(None),
        stock: Set(new.stock),
        manage_stock: Set(true),
        is_active: Set(true),
        featured_image_url: Set(None),
        rating: Set(None),
        review_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

/// Inserts an order with one line per `(product, quantity)` without touching stock.
pub async fn create_order(
    state: &AppState,
    user_id: Uuid,
    order_number: &str,
    status: OrderStatus,
    lines: &[(&products::Model, i32)],
    created_offset_minutes: i64,
) -> anyhow::Result<Uuid> {
    let created_at = Utc::now() - Duration::minutes(created_offset_minutes);
    let total: i64 = lines
        .iter()
        .map(|(product, qty)| product.price * i64::from(*qty))
        .sum();
    let order_id = Uuid::new_v4();
    orders::ActiveModel {
        id: Set(order_id),
        order_number: Set(order_number.to_string()),
        user_id: Set(user_id),
        status: Set(status.as_str().to_string()),
        payment_status: Set("unpaid".to_string()),
        payment_method: Set("cod".to_string()),
        total_amount: Set(total),
        shipping_fee: Set(0),
        discount_amount: Set(0),
        shipping_address: Set("12 Nguyen Hue, District 1".to_string()),
        billing_address: Set("12 Nguyen Hue, District 1".to_string()),
        notes: Set(None),
        shipped_at: Set(None),
        delivered_at: Set(None),
        created_at: Set(created_at.into()),
        updated_at: Set(created_at.into()),
    }
    .insert(&state.orm)
    .await?;

    for (product, quantity) in lines {
        order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            product_sku: Set(product.sku.clone()),
            product_image: Set(None),
            quantity: Set(*quantity),
            unit_price: Set(product.price),
            total_price: Set(product.price * i64::from(*quantity)),
            created_at: Set(created_at.into()),
        }
        .insert(&state.orm)
        .await?;
    }
    Ok(order_id)
}

pub async fn reload_product(state: &AppState, id: Uuid) -> anyhow::Result<products::Model> {
    products::Entity::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} missing"))
}
