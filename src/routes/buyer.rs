use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        products::{CategoryList, ProductDetail, ProductList},
        reviews::{AddCommentRequest, AddRatingRequest, CommentList, RatingSummary},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{CategoryQuery, Pagination, SearchQuery},
    services::{product_service, review_service},
    state::AppState,
};

// Browsing requires a signed-in user, even for read-only routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-recommended-products", get(get_recommended_products))
        .route("/get-product/{product_id}", get(get_product))
        .route("/search-products", get(search_products))
        .route("/get-product-by-categories", get(get_products_by_categories))
        .route("/get-categories", get(get_categories))
        .route("/get-rating/{product_id}", get(get_rating))
        .route("/add-rating/{product_id}", post(add_rating))
        .route("/get-comments/{product_id}", get(get_comments))
        .route("/add-comment/{product_id}", post(add_comment))
}

#[utoipa::path(
    get,
    path = "/buyer/get-recommended-products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10")
    ),
    responses(
        (status = 200, description = "Newest products first", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_recommended_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::list_recommended(&state, pagination).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/buyer/get-product/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product with its reviews", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    Ok(Json(product_service::get_product(&state, product_id).await?))
}

#[utoipa::path(
    get,
    path = "/buyer/search-products",
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive name prefix"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10")
    ),
    responses(
        (status = 200, description = "Matching products", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn search_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(product_service::search_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/buyer/get-product-by-categories",
    params(
        ("category" = Option<String>, Query, description = "Category name"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10")
    ),
    responses(
        (status = 200, description = "Products in the category", body = ApiResponse<ProductList>),
        (status = 400, description = "Unknown category"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_products_by_categories(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::products_by_category(&state, query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/buyer/get-categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_categories(_user: AuthUser) -> Json<ApiResponse<CategoryList>> {
    Json(product_service::list_categories())
}

#[utoipa::path(
    get,
    path = "/buyer/get-rating/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Average rating", body = ApiResponse<RatingSummary>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_rating(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RatingSummary>>> {
    Ok(Json(review_service::get_rating(&state, product_id).await?))
}

#[utoipa::path(
    post,
    path = "/buyer/add-rating/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = AddRatingRequest,
    responses(
        (status = 200, description = "Rating stored", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Out of range or already rated"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn add_rating(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AddRatingRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        review_service::add_rating(&state, &user, product_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/buyer/get-comments/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Non-empty comments", body = ApiResponse<CommentList>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn get_comments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CommentList>>> {
    Ok(Json(review_service::get_comments(&state, product_id).await?))
}

#[utoipa::path(
    post,
    path = "/buyer/add-comment/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = AddCommentRequest,
    responses(
        (status = 200, description = "Comment attached to the caller's rating", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "No rating yet or comment already set"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Buyer"
)]
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        review_service::add_comment(&state, &user, product_id, payload).await?,
    ))
}
