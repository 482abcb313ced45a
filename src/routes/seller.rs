use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::Pagination,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-products", get(get_products))
        .route("/add-product", post(add_product))
        .route("/delete-product/{product_id}", delete(delete_product))
}

#[utoipa::path(
    get,
    path = "/seller/get-products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10")
    ),
    responses(
        (status = 200, description = "Products listed by the current seller", body = ApiResponse<ProductList>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn get_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::seller_products(&state, &user, pagination).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/seller/add-product",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::add_product(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/seller/delete-product/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Product belongs to another seller"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        product_service::delete_product(&state, &user, product_id).await?,
    ))
}
