mod common;

use common::{NewProduct, auth, create_category, create_product, create_user, setup_state};
use fashion_storefront_api::{
    dto::cart::{AddToCartRequest, UpdateQuantityRequest},
    error::AppError,
    middleware::auth::{ROLE_CUSTOMER, ROLE_SELLER},
    services::cart_service,
};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use uuid::Uuid;

#[tokio::test]
async fn cart_totals_follow_every_mutation() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;

    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let customer_id = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
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
    let scarf = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Silk Scarf",
            sku: "SS-002",
            price: 200,
            stock: 5,
        },
    )
    .await?;
    let customer = auth(customer_id, ROLE_CUSTOMER);

    let totals = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: shirt.id,
            quantity: Some(2),
        },
    )
    .await?;
    assert_eq!((totals.cart_total, totals.cart_count), (200, 2));
    assert_eq!(totals.item_total, Some(200));

    let totals = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: scarf.id,
            quantity: None,
        },
    )
    .await?;
    assert_eq!((totals.cart_total, totals.cart_count), (400, 3));

    let view = cart_service::cart_index(&state, &customer)
        .await?
        .data
        .expect("cart view");
    assert_eq!(view.items.len(), 2);
    assert_eq!((view.cart_total, view.cart_count), (400, 3));

    let scarf_line = view
        .items
        .iter()
        .find(|line| line.product.id == scarf.id)
        .expect("scarf line")
        .id;
    let shirt_line = view
        .items
        .iter()
        .find(|line| line.product.id == shirt.id)
        .expect("shirt line")
        .id;

    let totals = cart_service::remove_item(&state, &customer, scarf_line).await?;
    assert_eq!((totals.cart_total, totals.cart_count), (200, 2));

    let err = cart_service::update_quantity(
        &state,
        &customer,
        UpdateQuantityRequest {
            cart_item_id: shirt_line,
            quantity: 11,
        },
    )
    .await
    .expect_err("over stock");
    assert_eq!(err.to_string(), "Only 10 items available in stock");
    let count = cart_service::cart_count(&state, Some(&customer)).await?;
    assert_eq!(count.count, 2);

    let totals = cart_service::update_quantity(
        &state,
        &customer,
        UpdateQuantityRequest {
            cart_item_id: shirt_line,
            quantity: 4,
        },
    )
    .await?;
    assert_eq!((totals.cart_total, totals.cart_count), (400, 4));
    assert_eq!(totals.item_total, Some(400));

    let totals = cart_service::clear_cart(&state, &customer).await?;
    assert_eq!((totals.cart_total, totals.cart_count), (0, 0));
    let view = cart_service::cart_index(&state, &customer)
        .await?
        .data
        .expect("cart view");
    assert!(view.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn adding_twice_merges_into_one_line() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let customer_id = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
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
    let customer = auth(customer_id, ROLE_CUSTOMER);

    for _ in 0..2 {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: dress.id,
                quantity: Some(1),
            },
        )
        .await?;
    }
    let view = cart_service::cart_index(&state, &customer)
        .await?
        .data
        .expect("cart view");
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 2);

    // 2 in the cart plus 2 more exceeds the 3 in stock.
    let err = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: dress.id,
            quantity: Some(2),
        },
    )
    .await
    .expect_err("over stock");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn cart_lines_are_private_to_their_owner() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let owner_id = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
    let other_id = create_user(&state, ROLE_CUSTOMER, "binh@shop.vn", "Binh", "Pham").await?;
    let category_id = create_category(&state, "Hats").await?;
    let hat = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Bucket Hat",
            sku: "BH-001",
            price: 150,
            stock: 10,
        },
    )
    .await?;
    let owner = auth(owner_id, ROLE_CUSTOMER);
    let other = auth(other_id, ROLE_CUSTOMER);

    cart_service::add_to_cart(
        &state,
        &owner,
        AddToCartRequest {
            product_id: hat.id,
            quantity: Some(1),
        },
    )
    .await?;
    let line_id = cart_service::cart_index(&state, &owner)
        .await?
        .data
        .expect("cart view")
        .items[0]
        .id;

    let err = cart_service::update_quantity(
        &state,
        &other,
        UpdateQuantityRequest {
            cart_item_id: line_id,
            quantity: 2,
        },
    )
    .await
    .expect_err("foreign line");
    assert!(matches!(err, AppError::NotFound(_)));

    let err = cart_service::remove_item(&state, &other, line_id)
        .await
        .expect_err("foreign line");
    assert!(matches!(err, AppError::NotFound(_)));

    let err = cart_service::remove_item(&state, &owner, Uuid::new_v4())
        .await
        .expect_err("unknown line");
    assert_eq!(err.to_string(), "Cart item not found");

    assert_eq!(cart_service::cart_count(&state, None).await?.count, 0);
    assert_eq!(cart_service::cart_count(&state, Some(&owner)).await?.count, 1);
    assert_eq!(cart_service::cart_count(&state, Some(&other)).await?.count, 0);

    Ok(())
}

#[tokio::test]
async fn stock_caps_quantity_even_when_stock_is_not_managed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;
    let seller_id = create_user(&state, ROLE_SELLER, "seller@shop.vn", "Linh", "Tran").await?;
    let customer_id = create_user(&state, ROLE_CUSTOMER, "an@shop.vn", "An", "Le").await?;
    let category_id = create_category(&state, "Socks").await?;
    let socks = create_product(
        &state,
        NewProduct {
            seller_id,
            category_id,
            name: "Wool Socks",
            sku: "WS-001",
            price: 50,
            stock: 2,
        },
    )
    .await?;
    let mut unmanaged = socks.into_active_model();
    unmanaged.manage_stock = Set(false);
    let socks = unmanaged.update(&state.orm).await?;
    let customer = auth(customer_id, ROLE_CUSTOMER);

    let err = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: socks.id,
            quantity: Some(3),
        },
    )
    .await
    .expect_err("more than in stock");
    assert_eq!(err.to_string(), "Only 2 items available in stock");

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: socks.id,
            quantity: Some(1),
        },
    )
    .await?;
    let line_id = cart_service::cart_index(&state, &customer)
        .await?
        .data
        .expect("cart view")
        .items[0]
        .id;

    let err = cart_service::update_quantity(
        &state,
        &customer,
        UpdateQuantityRequest {
            cart_item_id: line_id,
            quantity: 50,
        },
    )
    .await
    .expect_err("more than in stock");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(cart_service::cart_count(&state, Some(&customer)).await?.count, 1);

    Ok(())
}
