use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{FormOptions, ProductForm, ProductSaved, SellerProductList},
    entity::{
        brands::{Column as BrandCol, Entity as Brands},
        cart_items::{Column as CartCol, Entity as CartItems},
        categories::{Column as CategoryCol, Entity as Categories},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        product_reviews::{Column as ReviewCol, Entity as ProductReviews},
        products::{self, ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, FieldError},
    images::UploadedImage,
    middleware::auth::{AuthUser, ensure_seller},
    models::{Brand, Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{SellerProductQuery, non_blank},
    services::paging::{contains_ci, like_pattern, paginate},
    state::AppState,
};

pub const SELLER_PAGE_SIZE: i64 = 20;

pub async fn list_seller_products(
    state: &AppState,
    user: &AuthUser,
    query: SellerProductQuery,
) -> AppResult<ApiResponse<SellerProductList>> {
    ensure_seller(user)?;

    let mut condition = Condition::all().add(ProdCol::SellerId.eq(user.user_id));
    if let Some(search) = non_blank(query.search.as_ref()) {
        let pattern = like_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(contains_ci::<Products>(ProdCol::Name, &pattern))
                .add(contains_ci::<Products>(ProdCol::Sku, &pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(ProdCol::CategoryId.eq(category_id));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(ProdCol::CreatedAt)
        .order_by_desc(ProdCol::Id);
    let (rows, meta) =
        paginate(finder, &state.orm, &query.pagination(), SELLER_PAGE_SIZE).await?;

    let items = rows.into_iter().map(Product::from).collect();
    Ok(ApiResponse::success(
        "Products",
        SellerProductList { items },
        Some(meta),
    ))
}

pub async fn form_options(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FormOptions>> {
    ensure_seller(user)?;
    let categories = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let brands = Brands::find()
        .order_by_asc(BrandCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Brand::from)
        .collect();

    Ok(ApiResponse::success(
        "Form options",
        FormOptions { categories, brands },
        Some(Meta::empty()),
    ))
}

/// Loads a product and checks that the caller is its seller.
async fn load_owned<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<products::Model> {
    let product = Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    if product.seller_id != user.user_id {
        tracing::warn!(
            product_id = %id,
            user_id = %user.user_id,
            "seller does not own product"
        );
        return Err(AppError::forbidden(
            "You do not have permission to modify this product",
        ));
    }
    Ok(product)
}

pub async fn get_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_seller(user)?;
    let product = load_owned(&state.orm, user, id).await?;
    Ok(ApiResponse::success("Product", product.into(), Some(Meta::empty())))
}

/// Checks references and SKU uniqueness that need the database.
async fn validate_references<C: ConnectionTrait>(
    conn: &C,
    form: &ProductForm,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut errors = Vec::new();

    if let Some(category_id) = form.category_id {
        if Categories::find_by_id(category_id).one(conn).await?.is_none() {
            errors.push(FieldError::new("categoryId", "Selected category does not exist"));
        }
    }
    if let Some(brand_id) = form.brand_id {
        if Brands::find_by_id(brand_id).one(conn).await?.is_none() {
            errors.push(FieldError::new("brandId", "Selected brand does not exist"));
        }
    }

    let mut sku_taken = Products::find().filter(ProdCol::Sku.eq(form.sku.trim()));
    if let Some(id) = exclude {
        sku_taken = sku_taken.filter(ProdCol::Id.ne(id));
    }
    if sku_taken.count(conn).await? > 0 {
        errors.push(FieldError::new("sku", "SKU is already in use"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Lowercase ASCII words joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug.to_string()
    }
}

async fn unique_slug<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    exclude: Option<Uuid>,
) -> AppResult<String> {
    let base = slugify(name);
    let mut taken = Products::find().filter(ProdCol::Slug.eq(base.as_str()));
    if let Some(id) = exclude {
        taken = taken.filter(ProdCol::Id.ne(id));
    }
    if taken.count(conn).await? == 0 {
        return Ok(base);
    }
    let suffix = Uuid::new_v4().simple().to_string();
    Ok(format!("{base}-{}", &suffix[..8]))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    form: ProductForm,
    image: Option<UploadedImage>,
) -> AppResult<ProductSaved> {
    ensure_seller(user)?;
    form.validate()?;
    validate_references(&state.orm, &form, None).await?;
    let category_id = form
        .category_id
        .ok_or_else(|| AppError::bad_request("Category is required"))?;

    let slug = unique_slug(&state.orm, &form.name, None).await?;
    let image_url = match &image {
        Some(upload) => Some(state.images.save(upload).await?),
        None => None,
    };

    let now = Utc::now();
    let inserted = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        category_id: Set(category_id),
        brand_id: Set(form.brand_id),
        name: Set(form.name.trim().to_string()),
        slug: Set(slug),
        sku: Set(form.sku.trim().to_string()),
        description: Set(form.description.filter(|d| !d.trim().is_empty())),
        price: Set(form.price),
        sale_price: Set(form.sale_price),
        stock: Set(form.stock),
        manage_stock: Set(form.manage_stock),
        is_active: Set(form.is_active),
        featured_image_url: Set(image_url.clone()),
        rating: Set(None),
        review_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await;

    let product = match inserted {
        Ok(product) => product,
        Err(err) => {
            if let Some(url) = image_url {
                discard_image(state, &url).await;
            }
            return Err(err.into());
        }
    };

    tracing::info!(product_id = %product.id, seller_id = %user.user_id, "product created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ProductSaved {
        product: product.into(),
    })
}

pub async fn edit_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    form: ProductForm,
    image: Option<UploadedImage>,
) -> AppResult<ProductSaved> {
    ensure_seller(user)?;
    let existing = load_owned(&state.orm, user, id).await?;
    form.validate()?;
    validate_references(&state.orm, &form, Some(id)).await?;
    let category_id = form
        .category_id
        .ok_or_else(|| AppError::bad_request("Category is required"))?;

    let slug = if existing.name.trim() == form.name.trim() {
        existing.slug.clone()
    } else {
        unique_slug(&state.orm, &form.name, Some(id)).await?
    };
    let new_image = match &image {
        Some(upload) => Some(state.images.save(upload).await?),
        None => None,
    };
    let old_image = existing.featured_image_url.clone();

    let mut active: ProductActive = existing.into();
    active.category_id = Set(category_id);
    active.brand_id = Set(form.brand_id);
    active.name = Set(form.name.trim().to_string());
    active.slug = Set(slug);
    active.sku = Set(form.sku.trim().to_string());
    active.description = Set(form.description.filter(|d| !d.trim().is_empty()));
    active.price = Set(form.price);
    active.sale_price = Set(form.sale_price);
    active.stock = Set(form.stock);
    active.manage_stock = Set(form.manage_stock);
    active.is_active = Set(form.is_active);
    if let Some(url) = &new_image {
        active.featured_image_url = Set(Some(url.clone()));
    }
    active.updated_at = Set(Utc::now().into());

    let product = match active.update(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            if let Some(url) = &new_image {
                discard_image(state, url).await;
            }
            // The row may have been deleted since it was loaded.
            if matches!(err, DbErr::RecordNotUpdated)
                && Products::find_by_id(id).one(&state.orm).await?.is_none()
            {
                return Err(AppError::not_found("Product not found"));
            }
            return Err(err.into());
        }
    };

    if let (Some(_), Some(old)) = (&new_image, old_image) {
        discard_image(state, &old).await;
    }

    tracing::info!(product_id = %product.id, seller_id = %user.user_id, "product updated");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ProductSaved {
        product: product.into(),
    })
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_seller(user)?;
    let product = load_owned(&state.orm, user, id).await?;

    let txn = state.orm.begin().await?;
    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&txn)
        .await?;
    if ordered > 0 {
        return Err(AppError::bad_request(
            "This product has existing orders and cannot be deleted; deactivate it instead",
        ));
    }

    CartItems::delete_many()
        .filter(CartCol::ProductId.eq(id))
        .exec(&txn)
        .await?;
    ProductReviews::delete_many()
        .filter(ReviewCol::ProductId.eq(id))
        .exec(&txn)
        .await?;
    let image = product.featured_image_url.clone();
    product.delete(&txn).await?;
    txn.commit().await?;

    if let Some(url) = image {
        discard_image(state, &url).await;
    }

    tracing::info!(product_id = %id, seller_id = %user.user_id, "product deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(())
}

async fn discard_image(state: &AppState, url: &str) {
    if let Err(err) = state.images.delete(url).await {
        tracing::warn!(error = %err, url, "failed to delete product image");
    }
}
