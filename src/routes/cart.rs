use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{BuyCartRequest, CartView, CheckoutSessionResponse, PruneResult, QuantityQuery},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-items", get(get_items))
        .route("/add-item/{product_id}", post(add_item))
        .route("/remove-item/{product_id}", post(remove_item))
        .route("/update-item/{product_id}", post(update_item))
        .route("/prune", post(prune_orphans))
        .route("/buy-cart", post(buy_cart))
}

fn required_quantity(query: QuantityQuery) -> AppResult<i64> {
    query
        .quantity
        .ok_or_else(|| AppError::BadRequest("Send valid productId and quantity".into()))
}

#[utoipa::path(
    get,
    path = "/cart/get-items",
    responses(
        (status = 200, description = "Priced cart for the current buyer", body = ApiResponse<CartView>),
        (status = 404, description = "No cart exists for this user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_items(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::get_items(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/cart/add-item/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("quantity" = i64, Query, description = "Quantity, at least 1")
    ),
    responses(
        (status = 200, description = "Line added", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product already in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<QuantityQuery>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let quantity = required_quantity(query)?;
    Ok(Json(
        cart_service::add_item(&state, &user, product_id, quantity).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/cart/remove-item/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Line removed (no-op when absent)", body = ApiResponse<CartView>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        cart_service::remove_item(&state, &user, product_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/cart/update-item/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("quantity" = i64, Query, description = "New quantity; zero or less removes the line")
    ),
    responses(
        (status = 200, description = "Line upserted or removed", body = ApiResponse<CartView>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<QuantityQuery>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let quantity = required_quantity(query)?;
    Ok(Json(
        cart_service::update_item(&state, &user, product_id, quantity).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/cart/prune",
    responses(
        (status = 200, description = "Lines for deleted products removed", body = ApiResponse<PruneResult>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn prune_orphans(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PruneResult>>> {
    Ok(Json(cart_service::prune_orphans(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/cart/buy-cart",
    request_body = BuyCartRequest,
    responses(
        (status = 200, description = "Payment session created", body = ApiResponse<CheckoutSessionResponse>),
        (status = 400, description = "Empty checkout or invalid item"),
        (status = 404, description = "Product not found"),
        (status = 502, description = "Payment provider error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn buy_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BuyCartRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSessionResponse>>> {
    Ok(Json(cart_service::buy_cart(&state, &user, payload).await?))
}
