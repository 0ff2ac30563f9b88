use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{
        AddReviewRequest, DeleteReviewRequest, EditReviewRequest, MyReviewList,
        ProductReviewsPage, ReviewApprovalRequest, ReviewResult,
    },
    error::AppResult,
    middleware::auth::{AuthUser, require_user},
    response::{ActionResponse, ApiResponse},
    routes::params::PageQuery,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/product/{product_id}", get(product_reviews))
        .route("/add", post(add_review))
        .route("/edit", post(edit_review))
        .route("/delete", post(delete_review))
        .route("/my-reviews", get(my_reviews))
}

#[utoipa::path(
    get,
    path = "/api/review/product/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID"), PageQuery),
    responses(
        (status = 200, description = "Approved reviews with rating statistics", body = ApiResponse<ProductReviewsPage>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Reviews"
)]
pub async fn product_reviews(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<ProductReviewsPage>>> {
    let resp = review_service::product_reviews(&state, user.as_ref(), product_id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/review/add",
    request_body = AddReviewRequest,
    responses((status = 200, description = "Stored review and the product's new rating", body = ReviewResult)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<AddReviewRequest>,
) -> Json<ActionResponse<ReviewResult>> {
    let result = async {
        let user = require_user(user)?;
        review_service::add_review(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Thank you for your review",
        "An error occurred while adding your review",
    ))
}

#[utoipa::path(
    post,
    path = "/api/review/edit",
    request_body = EditReviewRequest,
    responses((status = 200, description = "Updated review and the product's new rating", body = ReviewResult)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn edit_review(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<EditReviewRequest>,
) -> Json<ActionResponse<ReviewResult>> {
    let result = async {
        let user = require_user(user)?;
        review_service::edit_review(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Review updated",
        "An error occurred while updating your review",
    ))
}

#[utoipa::path(
    post,
    path = "/api/review/delete",
    request_body = DeleteReviewRequest,
    responses((status = 200, description = "The product's rating after removal", body = ReviewResult)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<DeleteReviewRequest>,
) -> Json<ActionResponse<ReviewResult>> {
    let result = async {
        let user = require_user(user)?;
        review_service::delete_review(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Review deleted",
        "An error occurred while deleting your review",
    ))
}

#[utoipa::path(
    get,
    path = "/api/review/my-reviews",
    params(PageQuery),
    responses(
        (status = 200, description = "Reviews written by the caller", body = ApiResponse<MyReviewList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<MyReviewList>>> {
    let resp = review_service::my_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/reviews/approval",
    request_body = ReviewApprovalRequest,
    responses((status = 200, description = "Moderated review and the product's new rating", body = ReviewResult)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn set_approval(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<ReviewApprovalRequest>,
) -> Json<ActionResponse<ReviewResult>> {
    let result = async {
        let user = require_user(user)?;
        review_service::set_review_approval(&state, &user, payload).await
    }
    .await;
    Json(ActionResponse::from_result(
        result,
        "Review moderation saved",
        "An error occurred while moderating the review",
    ))
}
