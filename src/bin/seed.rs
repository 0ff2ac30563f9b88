use chrono::Utc;
use fashion_storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        brands::{self, ActiveModel as BrandActive, Entity as Brands},
        categories::{self, ActiveModel as CategoryActive, Entity as Categories},
        products::{self, ActiveModel as ProductActive, Entity as Products},
        users::{self, ActiveModel as UserActive, Entity as Users},
    },
    middleware::auth::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_SELLER},
    services::seller_product_service::slugify,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Store", "Admin", ROLE_ADMIN).await?;
    let seller_id = ensure_user(&orm, "seller@example.com", "Linh", "Tran", ROLE_SELLER).await?;
    let customer_id =
        ensure_user(&orm, "customer@example.com", "Minh", "Nguyen", ROLE_CUSTOMER).await?;

    let shirts = ensure_category(&orm, "Shirts", "shirts").await?;
    let dresses = ensure_category(&orm, "Dresses", "dresses").await?;
    let brand = ensure_brand(&orm, "Saigon Atelier", "saigon-atelier").await?;
    seed_products(&orm, seller_id, shirts, dresses, brand).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set(Some(first_name.to_string())),
        last_name: Set(Some(last_name.to_string())),
        phone: Set(None),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn ensure_category(orm: &DatabaseConnection, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(categories::Column::Slug.eq(slug))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn ensure_brand(orm: &DatabaseConnection, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Brands::find()
        .filter(brands::Column::Slug.eq(slug))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let brand = BrandActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(brand.id)
}

async fn seed_products(
    orm: &DatabaseConnection,
    seller_id: Uuid,
    shirts: Uuid,
    dresses: Uuid,
    brand: Uuid,
) -> anyhow::Result<()> {
    let catalogue = [
        ("Linen Shirt", "LS-001", shirts, 350_000, Some(299_000), 40),
        ("Oxford Shirt", "OX-002", shirts, 420_000, None, 25),
        ("Silk Ao Dai", "AD-003", dresses, 1_250_000, None, 8),
        ("Summer Midi Dress", "MD-004", dresses, 560_000, Some(490_000), 30),
    ];

    for (name, sku, category_id, price, sale_price, stock) in catalogue {
        let exists = Products::find()
            .filter(products::Column::Sku.eq(sku))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let now = Utc::now();
        ProductActive {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller_id),
            category_id: Set(category_id),
            brand_id: Set(Some(brand)),
            name: Set(name.to_string()),
            slug: Set(slugify(name)),
            sku: Set(sku.to_string()),
            description: Set(None),
            price: Set(price),
            sale_price: Set(sale_price),
            stock: Set(stock),
            manage_stock: Set(true),
            is_active: Set(true),
            featured_image_url: Set(None),
            rating: Set(None),
            review_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
