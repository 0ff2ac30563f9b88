use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::reviews::{
        AddReviewRequest, DeleteReviewRequest, EditReviewRequest, MyReviewEntry, MyReviewList,
        ProductReviewsPage, RatingBucket, ReviewApprovalRequest, ReviewEntry, ReviewResult,
        ReviewStats,
    },
    entity::{
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::Column as OrderCol,
        product_reviews::{
            self, ActiveModel as ReviewActive, Column as ReviewCol, Entity as ProductReviews,
        },
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderStatus, Review},
    response::ApiResponse,
    routes::params::PageQuery,
    services::paging::paginate,
    state::AppState,
};

pub const REVIEW_PAGE_SIZE: i64 = 10;
const MAX_TITLE_CHARS: usize = 200;
const MAX_COMMENT_CHARS: usize = 2000;

pub fn stats_cache_key(product_id: Uuid) -> String {
    format!("review_stats:{product_id}")
}

pub async fn product_reviews(
    state: &AppState,
    user: Option<&AuthUser>,
    product_id: Uuid,
    query: PageQuery,
) -> AppResult<ApiResponse<ProductReviewsPage>> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let finder = ProductReviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::IsApproved.eq(true))
        .order_by_desc(ReviewCol::CreatedAt)
        .order_by_desc(ReviewCol::Id);
    let (reviews, meta) =
        paginate(finder, &state.orm, &query.pagination(), REVIEW_PAGE_SIZE).await?;

    let author_ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
    let authors: HashMap<Uuid, String> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        Users::find()
            .filter(UserCol::Id.is_in(author_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name()))
            .collect()
    };

    let items = reviews
        .into_iter()
        .map(|review| ReviewEntry {
            author_name: authors
                .get(&review.user_id)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| "Customer".to_string()),
            review: review.into(),
        })
        .collect();

    let stats = state
        .cache
        .get_or_insert(&stats_cache_key(product_id), || {
            review_stats(&state.orm, product_id)
        })
        .await?;

    let (can_review, user_review) = match user {
        Some(user) => {
            let existing = find_user_review(&state.orm, user.user_id, product_id).await?;
            let eligible = existing.is_none()
                && has_delivered_purchase(&state.orm, user.user_id, product_id).await?;
            (eligible, existing.map(Review::from))
        }
        None => (false, None),
    };

    Ok(ApiResponse::success(
        "Reviews",
        ProductReviewsPage {
            product_id,
            items,
            stats,
            can_review,
            user_review,
        },
        Some(meta),
    ))
}

/// Average and per-star counts over approved reviews.
pub async fn review_stats<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<ReviewStats> {
    let ratings = approved_ratings(conn, product_id).await?;
    let distribution = (1..=5)
        .rev()
        .map(|stars| RatingBucket {
            stars,
            count: ratings.iter().filter(|r| **r == stars).count() as i64,
        })
        .collect();
    Ok(ReviewStats {
        average_rating: average(&ratings).unwrap_or(0.0),
        total_reviews: ratings.len() as i64,
        distribution,
    })
}

async fn approved_ratings<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<Vec<i32>> {
    let ratings = ProductReviews::find()
        .select_only()
        .column(ReviewCol::Rating)
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::IsApproved.eq(true))
        .into_tuple::<i32>()
        .all(conn)
        .await?;
    Ok(ratings)
}

fn average(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Rewrites `products.rating` and `products.review_count` from the approved reviews.
pub async fn recalculate_product_rating<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<(Option<f64>, i32)> {
    let ratings = approved_ratings(conn, product_id).await?;
    let rating = average(&ratings);
    let count = i32::try_from(ratings.len()).unwrap_or(i32::MAX);
    let stamp: DateTimeWithTimeZone = Utc::now().into();

    Products::update_many()
        .col_expr(ProdCol::Rating, Expr::value(rating))
        .col_expr(ProdCol::ReviewCount, Expr::value(count))
        .col_expr(ProdCol::UpdatedAt, Expr::value(stamp))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;

    tracing::debug!(product_id = %product_id, ?rating, count, "product rating recalculated");
    Ok((rating, count))
}

pub async fn has_delivered_purchase<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<bool> {
    let count = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Orders.def())
        .filter(OrderItemCol::ProductId.eq(product_id))
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Delivered.as_str()))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn find_user_review<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<product_reviews::Model>> {
    let review = ProductReviews::find()
        .filter(ReviewCol::UserId.eq(user_id))
        .filter(ReviewCol::ProductId.eq(product_id))
        .one(conn)
        .await?;
    Ok(review)
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_review(rating: i32, title: Option<&str>, comment: Option<&str>) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::bad_request("Rating must be between 1 and 5"));
    }
    let mut errors = Vec::new();
    if title.is_some_and(|t| t.chars().count() > MAX_TITLE_CHARS) {
        errors.push(FieldError::new(
            "title",
            format!("Title must be at most {MAX_TITLE_CHARS} characters"),
        ));
    }
    if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS) {
        errors.push(FieldError::new(
            "comment",
            format!("Comment must be at most {MAX_COMMENT_CHARS} characters"),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    payload: AddReviewRequest,
) -> AppResult<ReviewResult> {
    let title = clean_text(payload.title);
    let comment = clean_text(payload.comment);
    validate_review(payload.rating, title.as_deref(), comment.as_deref())?;

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if find_user_review(&txn, user.user_id, product.id).await?.is_some() {
        return Err(AppError::Conflict(
            "You have already reviewed this product".to_string(),
        ));
    }
    if !has_delivered_purchase(&txn, user.user_id, product.id).await? {
        return Err(AppError::bad_request(
            "You can only review products from your delivered orders",
        ));
    }

    let now = Utc::now();
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        title: Set(title),
        comment: Set(comment),
        is_approved: Set(state.config.review_auto_approve),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let (product_rating, review_count) = recalculate_product_rating(&txn, product.id).await?;
    txn.commit().await?;
    state.cache.remove(&stats_cache_key(product.id)).await;

    tracing::info!(
        review_id = %review.id,
        product_id = %product.id,
        rating = review.rating,
        "review added"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_add",
        Some("product_reviews"),
        Some(serde_json::json!({ "review_id": review.id, "product_id": product.id })),
    )
    .await;

    Ok(ReviewResult {
        review: Some(review.into()),
        product_rating,
        review_count,
    })
}

pub async fn edit_review(
    state: &AppState,
    user: &AuthUser,
    payload: EditReviewRequest,
) -> AppResult<ReviewResult> {
    let title = clean_text(payload.title);
    let comment = clean_text(payload.comment);
    validate_review(payload.rating, title.as_deref(), comment.as_deref())?;

    let txn = state.orm.begin().await?;
    let review = ProductReviews::find_by_id(payload.review_id)
        .filter(ReviewCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;
    let product_id = review.product_id;

    let mut active: ReviewActive = review.into();
    active.rating = Set(payload.rating);
    active.title = Set(title);
    active.comment = Set(comment);
    if !state.config.review_auto_approve {
        active.is_approved = Set(false);
    }
    active.updated_at = Set(Utc::now().into());
    let review = active.update(&txn).await?;

    let (product_rating, review_count) = recalculate_product_rating(&txn, product_id).await?;
    txn.commit().await?;
    state.cache.remove(&stats_cache_key(product_id)).await;

    tracing::info!(review_id = %review.id, rating = review.rating, "review edited");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_edit",
        Some("product_reviews"),
        Some(serde_json::json!({ "review_id": review.id })),
    )
    .await;

    Ok(ReviewResult {
        review: Some(review.into()),
        product_rating,
        review_count,
    })
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    payload: DeleteReviewRequest,
) -> AppResult<ReviewResult> {
    let txn = state.orm.begin().await?;
    let review = ProductReviews::find_by_id(payload.review_id)
        .filter(ReviewCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;
    let product_id = review.product_id;
    let review_id = review.id;

    review.delete(&txn).await?;
    let (product_rating, review_count) = recalculate_product_rating(&txn, product_id).await?;
    txn.commit().await?;
    state.cache.remove(&stats_cache_key(product_id)).await;

    tracing::info!(review_id = %review_id, product_id = %product_id, "review deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_delete",
        Some("product_reviews"),
        Some(serde_json::json!({ "review_id": review_id, "product_id": product_id })),
    )
    .await;

    Ok(ReviewResult {
        review: None,
        product_rating,
        review_count,
    })
}

pub async fn set_review_approval(
    state: &AppState,
    user: &AuthUser,
    payload: ReviewApprovalRequest,
) -> AppResult<ReviewResult> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let review = ProductReviews::find_by_id(payload.review_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;
    let product_id = review.product_id;

    let mut active: ReviewActive = review.into();
    active.is_approved = Set(payload.approved);
    active.updated_at = Set(Utc::now().into());
    let review = active.update(&txn).await?;

    let (product_rating, review_count) = recalculate_product_rating(&txn, product_id).await?;
    txn.commit().await?;
    state.cache.remove(&stats_cache_key(product_id)).await;

    tracing::info!(review_id = %review.id, approved = payload.approved, "review moderated");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_moderate",
        Some("product_reviews"),
        Some(serde_json::json!({ "review_id": review.id, "approved": payload.approved })),
    )
    .await;

    Ok(ReviewResult {
        review: Some(review.into()),
        product_rating,
        review_count,
    })
}

pub async fn my_reviews(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<MyReviewList>> {
    let finder = ProductReviews::find()
        .filter(ReviewCol::UserId.eq(user.user_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .order_by_desc(ReviewCol::Id);
    let (reviews, meta) =
        paginate(finder, &state.orm, &query.pagination(), REVIEW_PAGE_SIZE).await?;

    let product_ids: Vec<Uuid> = reviews.iter().map(|r| r.product_id).collect();
    let products: HashMap<Uuid, (String, String)> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, (p.name, p.slug)))
            .collect()
    };

    let items = reviews
        .into_iter()
        .map(|review| {
            let (product_name, product_slug) =
                products.get(&review.product_id).cloned().unwrap_or_default();
            MyReviewEntry {
                review: review.into(),
                product_name,
                product_slug,
            }
        })
        .collect();

    Ok(ApiResponse::success("My reviews", MyReviewList { items }, Some(meta)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_ratings() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[4, 5]), Some(4.5));
        assert_eq!(average(&[1, 2, 2]), Some(5.0 / 3.0));
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_review(1, None, None).is_ok());
        assert!(validate_review(5, None, None).is_ok());
        assert!(matches!(validate_review(0, None, None), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_review(6, None, None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn long_comment_is_a_field_error() {
        let comment = "x".repeat(MAX_COMMENT_CHARS + 1);
        let Err(AppError::Validation(errors)) = validate_review(4, None, Some(&comment)) else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "comment");
    }
}
