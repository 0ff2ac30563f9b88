use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, FieldError};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages(total, per_page)),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

/// `ceil(total / per_page)`, zero when nothing matches.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// Envelope shared by every mutating JSON endpoint.
///
/// Failures are reported with `success: false` and a readable message instead of an
/// HTTP error status; operation-specific fields are flattened next to `success`/`message`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    #[schema(ignore)]
    pub data: Option<T>,
}

impl<T: Serialize> ActionResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
            data: None,
        }
    }

    /// Converts an error into a soft failure. Unexpected errors are logged and
    /// replaced by `fallback` so internals never reach the client.
    pub fn from_error(err: AppError, fallback: &str) -> Self {
        if err.is_expected() {
            let errors = err.field_errors().map(<[FieldError]>::to_vec);
            Self {
                success: false,
                message: err.to_string(),
                errors,
                data: None,
            }
        } else {
            tracing::error!(error = ?err, "{fallback}");
            Self::failure(fallback)
        }
    }

    pub fn from_result(result: AppResult<T>, message: &str, fallback: &str) -> Self {
        match result {
            Ok(data) => Self::ok(message, data),
            Err(err) => Self::from_error(err, fallback),
        }
    }
}

impl ActionResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
            data: None,
        }
    }

    pub fn from_unit(result: AppResult<()>, message: &str, fallback: &str) -> Self {
        match result {
            Ok(()) => Self::done(message),
            Err(err) => Self::from_error(err, fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Totals {
        cart_total: i64,
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(95, 10), 10);
    }

    #[test]
    fn action_response_flattens_payload() {
        let body = serde_json::to_value(ActionResponse::ok("Updated", Totals { cart_total: 400 }))
            .expect("serialize");
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Updated");
        assert_eq!(body["cart_total"], 400);
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn unexpected_errors_are_masked() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.4"));
        let body = ActionResponse::<Totals>::from_error(err, "An error occurred while updating quantity");
        assert!(!body.success);
        assert_eq!(body.message, "An error occurred while updating quantity");
    }

    #[test]
    fn expected_errors_keep_their_message() {
        let err = AppError::not_found("Cart item not found");
        let body = ActionResponse::<Totals>::from_error(err, "fallback");
        assert!(!body.success);
        assert_eq!(body.message, "Cart item not found");
    }
}
