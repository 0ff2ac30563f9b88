use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    routing::get,
};
use uuid::Uuid;

use crate::{
    config::parse_bool,
    dto::products::{FormOptions, ProductForm, ProductSaved, ProductUpload, SellerProductList},
    error::{AppError, AppResult, FieldError},
    images::UploadedImage,
    middleware::auth::{AuthUser, require_user},
    models::Product,
    response::{ActionResponse, ApiResponse},
    routes::params::SellerProductQuery,
    services::seller_product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/form-options", get(form_options))
        .route(
            "/{id}",
            get(get_product).put(edit_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/seller/products",
    params(SellerProductQuery),
    responses(
        (status = 200, description = "Products owned by the seller", body = ApiResponse<SellerProductList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SellerProductQuery>,
) -> AppResult<Json<ApiResponse<SellerProductList>>> {
    let resp = seller_product_service::list_seller_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/products/form-options",
    responses(
        (status = 200, description = "Categories and brands for the product form", body = ApiResponse<FormOptions>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn form_options(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FormOptions>>> {
    let resp = seller_product_service::form_options(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<Product>),
        (status = 403, description = "Product belongs to another seller"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = seller_product_service::get_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/seller/products",
    request_body(content = ProductUpload, content_type = "multipart/form-data"),
    responses((status = 200, description = "`success` tells whether the product was created", body = ProductSaved)),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ActionResponse<ProductSaved>> {
    let result = async {
        let user = require_user(user)?;
        let (form, image) = read_product_form(multipart).await?;
        seller_product_service::create_product(&state, &user, form, image).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Product created successfully",
        "An error occurred while creating the product",
    ))
}

#[utoipa::path(
    put,
    path = "/api/seller/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content = ProductUpload, content_type = "multipart/form-data"),
    responses((status = 200, description = "`success` tells whether the product was updated", body = ProductSaved)),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn edit_product(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ActionResponse<ProductSaved>> {
    let result = async {
        let user = require_user(user)?;
        let (form, image) = read_product_form(multipart).await?;
        seller_product_service::edit_product(&state, &user, id, form, image).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Product updated successfully",
        "An error occurred while updating the product",
    ))
}

#[utoipa::path(
    delete,
    path = "/api/seller/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "`success` tells whether the product was deleted")),
    security(("bearer_auth" = [])),
    tag = "Seller Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> Json<ActionResponse<()>> {
    let result = async {
        let user = require_user(user)?;
        seller_product_service::delete_product(&state, &user, id).await
    }
    .await;
    Json(ActionResponse::from_unit(
        result,
        "Product deleted successfully",
        "An error occurred while deleting the product",
    ))
}

/// Reads the product fields and the optional `image` file part.
///
/// Field names are accepted in camelCase or snake_case. Unparseable numbers are
/// reported as field errors alongside the form's own validation.
async fn read_product_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(ProductForm, Option<UploadedImage>)> {
    let mut multipart =
        multipart.map_err(|err| AppError::bad_request(format!("Invalid form data: {err}")))?;

    let mut form = ProductForm {
        manage_stock: true,
        is_active: true,
        ..ProductForm::default()
    };
    let mut image = None;
    let mut errors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Invalid form data: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::bad_request(format!("Invalid image upload: {err}")))?;
            // Browsers send an empty part when no file is chosen.
            if !file_name.is_empty() && !bytes.is_empty() {
                image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|err| AppError::bad_request(format!("Invalid form data: {err}")))?;
        let value = text.trim();

        match name.as_str() {
            "name" => form.name = value.to_string(),
            "sku" => form.sku = value.to_string(),
            "description" => form.description = optional_text(value),
            "price" => match value.parse() {
                Ok(price) => form.price = price,
                Err(_) => errors.push(FieldError::new("price", "Price must be a whole number")),
            },
            "salePrice" | "sale_price" => match parse_optional(value) {
                Ok(sale) => form.sale_price = sale,
                Err(_) => errors.push(FieldError::new(
                    "salePrice",
                    "Sale price must be a whole number",
                )),
            },
            "stock" => match value.parse() {
                Ok(stock) => form.stock = stock,
                Err(_) => errors.push(FieldError::new("stock", "Stock must be a whole number")),
            },
            "manageStock" | "manage_stock" => {
                form.manage_stock = parse_bool(value).unwrap_or(form.manage_stock)
            }
            "isActive" | "is_active" => form.is_active = parse_bool(value).unwrap_or(form.is_active),
            "categoryId" | "category_id" => match parse_optional(value) {
                Ok(id) => form.category_id = id,
                Err(_) => errors.push(FieldError::new("categoryId", "Unknown category")),
            },
            "brandId" | "brand_id" => match parse_optional(value) {
                Ok(id) => form.brand_id = id,
                Err(_) => errors.push(FieldError::new("brandId", "Unknown brand")),
            },
            _ => {}
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok((form, image))
}

fn optional_text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_optional<T: std::str::FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_optional_values_are_none() {
        assert_eq!(parse_optional::<i64>("").ok(), Some(None));
        assert_eq!(parse_optional::<i64>("120000").ok(), Some(Some(120_000)));
        assert!(parse_optional::<i64>("12k").is_err());
        assert_eq!(optional_text(""), None);
    }
}
