mod common;

use common::{
    NewProduct, auth, create_category, create_order, create_product, create_user, reload_product,
    setup_state, setup_state_with,
};
use fashion_storefront_api::{
    dto::reviews::{AddReviewRequest, DeleteReviewRequest, EditReviewRequest, ReviewApprovalRequest},
    error::AppError,
    middleware::auth::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_SELLER},
    models::OrderStatus,
    routes::params::PageQuery,
    services::review_service,
};

fn review(product_id: uuid::Uuid, rating: i32) -> AddReviewRequest {
    AddReviewRequest {
        product_id,
        rating,
        title: Some("  Fits well ".into()),
        comment: Some("Soft fabric, true to size.".into()),
    }
}

#[tokio::test]
async fn only_delivered_buyers_can_review_and_ratings_are_recomputed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;

    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let an = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
    let binh = create_user(&state, ROLE_CUSTOMER, "binh@shop.vn", "Binh", "Pham").await?;
    let chi = create_user(&state, ROLE_CUSTOMER, "chi@shop.vn", "Chi", "Vo").await?;
    let category_id = create_category(&state, "Shirts").await?;
    let shirt = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Linen Shirt",
            sku: "LS-001",
            price: 100,
            stock: 10,
        },
    )
    .await?;

    create_order(&state, an, "ORD-1", OrderStatus::Delivered, &[(&shirt, 1)], 60).await?;
    create_order(&state, binh, "ORD-2", OrderStatus::Delivered, &[(&shirt, 1)], 50).await?;
    create_order(&state, chi, "ORD-3", OrderStatus::Shipped, &[(&shirt, 1)], 40).await?;

    let err = review_service::add_review(&state, &auth(chi, ROLE_CUSTOMER), review(shirt.id, 5))
        .await
        .expect_err("not delivered yet");
    assert_eq!(
        err.to_string(),
        "You can only review products from your delivered orders"
    );

    let err = review_service::add_review(&state, &auth(an, ROLE_CUSTOMER), review(shirt.id, 6))
        .await
        .expect_err("rating out of range");
    assert!(matches!(err, AppError::BadRequest(_)));

    let first = review_service::add_review(&state, &auth(an, ROLE_CUSTOMER), review(shirt.id, 5)).await?;
    assert_eq!(first.product_rating, Some(5.0));
    assert_eq!(first.review_count, 1);
    let first_review = first.review.expect("stored review");
    assert_eq!(first_review.title.as_deref(), Some("Fits well"));

    let err = review_service::add_review(&state, &auth(an, ROLE_CUSTOMER), review(shirt.id, 4))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, AppError::Conflict(_)));

    let second = review_service::add_review(&state, &auth(binh, ROLE_CUSTOMER), review(shirt.id, 2)).await?;
    assert_eq!(second.product_rating, Some(3.5));
    assert_eq!(second.review_count, 2);

    let product = reload_product(&state, shirt.id).await?;
    assert_eq!(product.rating, Some(3.5));
    assert_eq!(product.review_count, 2);

    let page = review_service::product_reviews(
        &state,
        Some(&auth(chi, ROLE_CUSTOMER)),
        shirt.id,
        PageQuery::default(),
    )
    .await?
    .data
    .expect("reviews page");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.stats.total_reviews, 2);
    assert_eq!(page.stats.average_rating, 3.5);
    let five_star = page
        .stats
        .distribution
        .iter()
        .find(|bucket| bucket.stars == 5)
        .expect("bucket");
    assert_eq!(five_star.count, 1);
    assert!(!page.can_review);
    assert!(page.user_review.is_none());

    let edited = review_service::edit_review(
        &state,
        &auth(an, ROLE_CUSTOMER),
        EditReviewRequest {
            review_id: first_review.id,
            rating: 4,
            title: None,
            comment: None,
        },
    )
    .await?;
    assert_eq!(edited.product_rating, Some(3.0));

    // Stats are served from the cache but invalidated by every mutation.
    let page = review_service::product_reviews(&state, None, shirt.id, PageQuery::default())
        .await?
        .data
        .expect("reviews page");
    assert_eq!(page.stats.average_rating, 3.0);

    let err = review_service::delete_review(
        &state,
        &auth(binh, ROLE_CUSTOMER),
        DeleteReviewRequest {
            review_id: first_review.id,
        },
    )
    .await
    .expect_err("someone else's review");
    assert!(matches!(err, AppError::NotFound(_)));

    let mine = review_service::my_reviews(&state, &auth(an, ROLE_CUSTOMER), PageQuery::default())
        .await?
        .data
        .expect("my reviews");
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].product_name, "Linen Shirt");

    review_service::delete_review(
        &state,
        &auth(binh, ROLE_CUSTOMER),
        DeleteReviewRequest {
            review_id: second.review.expect("stored review").id,
        },
    )
    .await?;
    let last = review_service::delete_review(
        &state,
        &auth(an, ROLE_CUSTOMER),
        DeleteReviewRequest {
            review_id: first_review.id,
        },
    )
    .await?;
    assert_eq!(last.product_rating, None);
    assert_eq!(last.review_count, 0);

    let product = reload_product(&state, shirt.id).await?;
    assert_eq!(product.rating, None);
    assert_eq!(product.review_count, 0);

    Ok(())
}

#[tokio::test]
async fn moderated_reviews_count_only_once_approved() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state_with(dir.path(), |config| config.review_auto_approve = false).await?;

    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let an = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
    let admin_id = create_user(&state, ROLE_ADMIN, "admin@shop.vn", "Store", "Admin").await?;
    let category_id = create_category(&state, "Dresses").await?;
    let dress = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Midi Dress",
            sku: "MD-001",
            price: 500,
            stock: 3,
        },
    )
    .await?;
    create_order(&state, an, "ORD-1", OrderStatus::Delivered, &[(&dress, 1)], 10).await?;

    let pending = review_service::add_review(&state, &auth(an, ROLE_CUSTOMER), review(dress.id, 4)).await?;
    assert_eq!(pending.product_rating, None);
    assert_eq!(pending.review_count, 0);
    let review_id = pending.review.expect("stored review").id;

    let page = review_service::product_reviews(
        &state,
        Some(&auth(an, ROLE_CUSTOMER)),
        dress.id,
        PageQuery::default(),
    )
    .await?
    .data
    .expect("reviews page");
    assert!(page.items.is_empty());
    assert_eq!(page.user_review.map(|r| r.id), Some(review_id));

    let err = review_service::set_review_approval(
        &state,
        &auth(an, ROLE_CUSTOMER),
        ReviewApprovalRequest {
            review_id,
            approved: true,
        },
    )
    .await
    .expect_err("customers cannot moderate");
    assert!(matches!(err, AppError::Forbidden(_)));

    let approved = review_service::set_review_approval(
        &state,
        &auth(admin_id, ROLE_ADMIN),
        ReviewApprovalRequest {
            review_id,
            approved: true,
        },
    )
    .await?;
    assert_eq!(approved.product_rating, Some(4.0));
    assert_eq!(approved.review_count, 1);

    // Editing sends the review back to moderation.
    let edited = review_service::edit_review(
        &state,
        &auth(an, ROLE_CUSTOMER),
        EditReviewRequest {
            review_id,
            rating: 1,
            title: None,
            comment: Some("Colour faded after one wash.".into()),
        },
    )
    .await?;
    assert_eq!(edited.product_rating, None);
    assert_eq!(edited.review.map(|r| r.is_approved), Some(false));

    Ok(())
}
