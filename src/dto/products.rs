use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, FieldError},
    models::{Brand, Category, Product},
};

/// Seller product form as read from a multipart body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub stock: i32,
    pub manage_stock: bool,
    pub is_active: bool,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

impl ProductForm {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Product name is required"));
        } else if name.chars().count() > 200 {
            errors.push(FieldError::new("name", "Product name must be at most 200 characters"));
        }
        let sku = self.sku.trim();
        if sku.is_empty() {
            errors.push(FieldError::new("sku", "SKU is required"));
        } else if sku.chars().count() > 100 {
            errors.push(FieldError::new("sku", "SKU must be at most 100 characters"));
        }
        if self.price <= 0 {
            errors.push(FieldError::new("price", "Price must be greater than 0"));
        }
        if self
            .sale_price
            .is_some_and(|sale| sale <= 0 || sale >= self.price)
        {
            errors.push(FieldError::new(
                "salePrice",
                "Sale price must be greater than 0 and lower than the price",
            ));
        }
        if self.stock < 0 {
            errors.push(FieldError::new("stock", "Stock cannot be negative"));
        }
        if self.category_id.is_none() {
            errors.push(FieldError::new("categoryId", "Category is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Multipart body accepted by product create and edit.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ProductUpload {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub stock: i32,
    pub manage_stock: Option<bool>,
    pub is_active: Option<bool>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormOptions {
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSaved {
    pub product: Product,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProductForm {
        ProductForm {
            name: "Linen Shirt".into(),
            sku: "LS-001".into(),
            price: 350_000,
            stock: 5,
            manage_stock: true,
            is_active: true,
            category_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_complete_form() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn reports_every_bad_field() {
        let form = ProductForm {
            name: "  ".into(),
            price: 100,
            sale_price: Some(150),
            stock: -1,
            category_id: None,
            ..valid()
        };
        let Err(AppError::Validation(errors)) = form.validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "salePrice", "stock", "categoryId"]);
    }
}
