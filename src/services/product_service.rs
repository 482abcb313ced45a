use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    domain::pricing::CatalogItem,
    dto::products::{CategoryList, CreateProductRequest, ProductDetail, ProductList},
    entity::{
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
        reviews::{Column as ReviewCol, Entity as Reviews, Model as ReviewModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::{Category, Product, Review},
    response::{ApiResponse, Meta},
    routes::params::{CategoryQuery, Pagination, SearchQuery},
    state::AppState,
};

/// Current catalog data for the given products. Missing ids are simply
/// absent from the map.
pub async fn load_catalog<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, CatalogItem>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Products::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|m| {
            (
                m.id,
                CatalogItem {
                    id: m.id,
                    name: m.name,
                    image: m.image,
                    price: m.price,
                    stock: m.quantity,
                },
            )
        })
        .collect())
}

pub async fn find_product<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id}")))
}

pub async fn list_recommended(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    paginate(state, Products::find(), &pagination, "List of all products listed").await
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = find_product(&state.orm, id).await?;
    let reviews = Reviews::find()
        .filter(ReviewCol::ProductId.eq(id))
        .order_by_asc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Successfully retrieved product",
        ProductDetail {
            product: product_from_entity(product),
            reviews,
        },
        None,
    ))
}

/// Case-insensitive name prefix search. A blank name falls back to the
/// recommended listing.
pub async fn search_products(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let pagination = query.pagination();
    let Some(name) = query.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return list_recommended(state, pagination).await;
    };

    let pattern = format!("{}%", escape_like(&name.to_lowercase()));
    let finder =
        Products::find().filter(Expr::col(Column::Name).ilike(LikeExpr::new(pattern).escape('\\')));
    let message = format!("Products starting with \"{name}\"");
    paginate(state, finder, &pagination, &message).await
}

pub async fn products_by_category(
    state: &AppState,
    query: CategoryQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let pagination = query.pagination();
    let Some(raw) = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return list_recommended(state, pagination).await;
    };
    let category: Category = raw.parse()?;

    let finder = Products::find().filter(Column::Category.eq(category.as_str()));
    paginate(state, finder, &pagination, "List of all products by category").await
}

pub fn list_categories() -> ApiResponse<CategoryList> {
    ApiResponse::success(
        "List of all available categories",
        CategoryList {
            categories: Category::ALL.to_vec(),
        },
        Some(Meta::empty()),
    )
}

pub async fn seller_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_seller(user)?;
    let finder = Products::find().filter(Column::OwnerId.eq(user.user_id));
    paginate(state, finder, &pagination, "List of all products listed by owner").await
}

pub async fn add_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_seller(user)?;
    let payload = normalize_new_product(payload)?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        quantity: Set(payload.quantity),
        category: Set(payload.category.unwrap_or(Category::Other).as_str().to_string()),
        owner_id: Set(user.user_id),
        image: Set(payload.image),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product Added Successfully",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Only the owning seller may delete a listing. Cart lines that point at it
/// are left in place and show up as orphans.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_seller(user)?;
    let existing = find_product(&state.orm, id).await?;
    if existing.owner_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(format!("Product {id}")));
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn paginate(
    state: &AppState,
    finder: Select<Products>,
    pagination: &Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        message,
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

fn normalize_new_product(payload: CreateProductRequest) -> AppResult<CreateProductRequest> {
    let name = payload.name.trim().to_lowercase();
    let description = payload.description.trim().to_lowercase();
    if name.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest("Please fill the required fields".into()));
    }
    if payload.price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    if payload.quantity < 0 {
        return Err(AppError::BadRequest("quantity cannot be negative".into()));
    }
    let image = payload.image.trim().to_string();
    if image.is_empty() {
        return Err(AppError::BadRequest("Image of product is required".into()));
    }

    Ok(CreateProductRequest {
        name,
        description,
        image,
        ..payload
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    let category = model.category.parse().unwrap_or_else(|_| {
        tracing::warn!(product_id = %model.id, category = %model.category, "unknown stored category");
        Category::Other
    });
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        quantity: model.quantity,
        category,
        owner_id: model.owner_id,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        reviewer_id: model.reviewer_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateProductRequest {
        CreateProductRequest {
            name: "  Ferris MUG ".into(),
            description: " Coffee Tastes Better ".into(),
            price: 12000,
            quantity: 5,
            category: Some(Category::Home),
            image: " https://img.example/mug.png ".into(),
        }
    }

    #[test]
    fn new_products_are_trimmed_and_lowercased() {
        let p = normalize_new_product(request()).unwrap();
        assert_eq!(p.name, "ferris mug");
        assert_eq!(p.description, "coffee tastes better");
        assert_eq!(p.image, "https://img.example/mug.png");
        assert_eq!(p.category, Some(Category::Home));
    }

    #[test]
    fn new_products_need_price_stock_and_image() {
        let bad = [
            CreateProductRequest { price: 0, ..request() },
            CreateProductRequest { quantity: -1, ..request() },
            CreateProductRequest { image: "  ".into(), ..request() },
            CreateProductRequest { name: " ".into(), ..request() },
        ];
        for payload in bad {
            assert!(matches!(
                normalize_new_product(payload),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("mug"), "mug");
    }
}
