use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewRequest {
    pub product_id: Uuid,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditReviewRequest {
    pub review_id: Uuid,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewRequest {
    pub review_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApprovalRequest {
    pub review_id: Uuid,
    pub approved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub review: Review,
    pub author_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingBucket {
    pub stars: i32,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: i64,
    /// Five buckets, 5 stars first.
    pub distribution: Vec<RatingBucket>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductReviewsPage {
    pub product_id: Uuid,
    pub items: Vec<ReviewEntry>,
    pub stats: ReviewStats,
    pub can_review: bool,
    pub user_review: Option<Review>,
}

/// Result of a review mutation together with the product's refreshed aggregate.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    pub product_rating: Option<f64>,
    pub review_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyReviewEntry {
    pub review: Review,
    pub product_name: String,
    pub product_slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyReviewList {
    pub items: Vec<MyReviewEntry>,
}
