mod common;

use axum::http::StatusCode;
use marketplace_api::{
    dto::{
        cart::{BuyCartItem, BuyCartRequest},
        reviews::{AddCommentRequest, AddRatingRequest},
    },
    middleware::auth::{AuthUser, ROLE_BUYER, ROLE_SELLER},
    routes::params::{Pagination, SearchQuery},
    services::{cart_service, product_service, review_service},
};
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

use common::{create_product, new_product, setup_state};

// Integration flow: seller lists products, buyer fills the cart, the seller
// delists one of them, buyer prunes and checks out, then reviews.
#[tokio::test]
async fn cart_orphan_and_checkout_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };

    let (state, provider) = setup_state(&database_url).await?;

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE cart_lines, carts, reviews, products, audit_logs CASCADE",
        ))
        .await?;

    let seller = AuthUser {
        user_id: Uuid::new_v4(),
        role: ROLE_SELLER.into(),
    };
    let buyer = AuthUser {
        user_id: Uuid::new_v4(),
        role: ROLE_BUYER.into(),
    };

    // Buyers cannot list products.
    let err = product_service::add_product(&state, &buyer, new_product("Nope", 10))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let mug = create_product(&state, &seller, "Ferris Mug", 100).await?;
    let sticker = create_product(&state, &seller, "Sticker", 50).await?;

    // No cart yet.
    let err = cart_service::get_items(&state, &buyer).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    // Unknown products never land in a cart.
    let err = cart_service::add_item(&state, &buyer, Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    cart_service::add_item(&state, &buyer, mug, 2).await?;
    let view = cart_service::add_item(&state, &buyer, sticker, 1)
        .await?
        .data
        .unwrap();
    assert_eq!(view.total_items, 3);
    assert_eq!(view.total_cost, 250);

    let err = cart_service::add_item(&state, &buyer, mug, 1)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let err = cart_service::add_item(&state, &buyer, sticker, 0)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let view = cart_service::update_item(&state, &buyer, mug, 3)
        .await?
        .data
        .unwrap();
    assert_eq!(view.total_cost, 350);

    // Removing an absent line is a no-op.
    let view = cart_service::remove_item(&state, &buyer, Uuid::new_v4())
        .await?
        .data
        .unwrap();
    assert_eq!(view.cart_items.len(), 2);

    // Delisting leaves the line behind as an orphan outside the totals.
    product_service::delete_product(&state, &seller, sticker).await?;
    let view = cart_service::get_items(&state, &buyer).await?.data.unwrap();
    assert_eq!(view.cart_items.len(), 1);
    assert_eq!(view.orphans.len(), 1);
    assert_eq!(view.orphans[0].product_id, sticker);
    assert_eq!(view.total_items, 3);
    assert_eq!(view.total_cost, 300);

    let pruned = cart_service::prune_orphans(&state, &buyer).await?.data.unwrap();
    assert_eq!(pruned.removed, vec![sticker]);
    let view = cart_service::get_items(&state, &buyer).await?.data.unwrap();
    assert!(view.orphans.is_empty());

    // Setting zero removes the line.
    let view = cart_service::update_item(&state, &buyer, mug, 0)
        .await?
        .data
        .unwrap();
    assert!(view.cart_items.is_empty());
    assert_eq!(view.total_cost, 0);

    // Checkout charges catalog prices, whatever the client claims.
    let request = || BuyCartRequest {
        products: vec![BuyCartItem {
            product_id: mug,
            name: Some("Ferris Mug".into()),
            image: None,
            price: Some(1),
            quantity: 2,
        }],
        idempotency_key: Some("double-click".into()),
    };
    let first = cart_service::buy_cart(&state, &buyer, request())
        .await?
        .data
        .unwrap();
    assert_eq!(first.amount_total, 200);
    let second = cart_service::buy_cart(&state, &buyer, request())
        .await?
        .data
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(provider.sessions_created(), 1);

    let err = cart_service::buy_cart(
        &state,
        &buyer,
        BuyCartRequest {
            products: vec![],
            idempotency_key: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = cart_service::buy_cart(
        &state,
        &buyer,
        BuyCartRequest {
            products: vec![BuyCartItem {
                product_id: sticker,
                name: None,
                image: None,
                price: None,
                quantity: 1,
            }],
            idempotency_key: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    // Reviews: comment needs a rating, each only once.
    let err = review_service::add_comment(&state, &buyer, mug, comment("nice")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = review_service::add_rating(&state, &buyer, mug, AddRatingRequest { rating: 6 })
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    review_service::add_rating(&state, &buyer, mug, AddRatingRequest { rating: 4 }).await?;
    let err = review_service::add_rating(&state, &buyer, mug, AddRatingRequest { rating: 5 })
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    review_service::add_comment(&state, &buyer, mug, comment("Great mug")).await?;
    let err = review_service::add_comment(&state, &buyer, mug, comment("again")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let rating = review_service::get_rating(&state, mug).await?.data.unwrap();
    assert_eq!(rating.total_reviews, 1);
    assert!((rating.average_rating - 4.0).abs() < f64::EPSILON);

    let comments = review_service::get_comments(&state, mug).await?.data.unwrap();
    assert_eq!(comments.comments, vec!["Great mug".to_string()]);

    // Browsing.
    let found = product_service::search_products(
        &state,
        SearchQuery {
            name: Some("FERRIS".into()),
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(found.items.len(), 1);

    let detail = product_service::get_product(&state, mug).await?.data.unwrap();
    assert_eq!(detail.reviews.len(), 1);

    let listed = product_service::seller_products(&state, &seller, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);

    Ok(())
}

fn comment(text: &str) -> AddCommentRequest {
    AddCommentRequest {
        comment: text.into(),
    }
}
