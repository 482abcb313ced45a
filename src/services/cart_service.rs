use std::collections::HashSet;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    domain::{
        cart::{Cart, CartError, CartLine, LineChange},
        checkout::{CheckoutItem, derive_idempotency_key},
        pricing::{price_entries, resolve_lines},
    },
    dto::cart::{BuyCartRequest, CartView, CheckoutSessionResponse, PruneResult},
    entity::{
        cart_lines::{ActiveModel as LineActive, Column as LineCol, Entity as CartLines},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::product_service::{find_product, load_catalog},
    state::AppState,
};

pub async fn get_items(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = Carts::find()
        .filter(CartCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))?;

    let view = cart_view(&state.orm, cart.id).await?;
    Ok(ApiResponse::success(
        "Cart fetched successfully",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i64,
) -> AppResult<ApiResponse<CartView>> {
    mutate_cart(state, user, product_id, AuditAction::CartAdd, |cart| {
        cart.add_line(product_id, quantity)
    })
    .await
}

/// Removing a product that is not in the cart is a no-op.
pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    mutate_cart(state, user, product_id, AuditAction::CartRemove, |cart| {
        Ok(cart.remove_line(product_id))
    })
    .await
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i64,
) -> AppResult<ApiResponse<CartView>> {
    mutate_cart(state, user, product_id, AuditAction::CartUpdate, |cart| {
        cart.set_quantity(product_id, quantity)
    })
    .await
}

/// Deletes stored lines whose product is gone from the catalog.
pub async fn prune_orphans(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PruneResult>> {
    let txn = state.orm.begin().await?;
    let Some(cart) = Carts::find()
        .filter(CartCol::OwnerId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        return Ok(ApiResponse::success(
            "Nothing to prune",
            PruneResult { removed: Vec::new() },
            Some(Meta::empty()),
        ));
    };

    let lines = load_lines(&txn, cart.id).await?;
    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let catalog = load_catalog(&txn, &ids).await?;
    let removed: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| !catalog.contains_key(id))
        .collect();

    if !removed.is_empty() {
        CartLines::delete_many()
            .filter(LineCol::CartId.eq(cart.id))
            .filter(LineCol::ProductId.is_in(removed.iter().copied()))
            .exec(&txn)
            .await?;
        touch_cart(&txn, cart.id).await?;
    }
    txn.commit().await?;

    if !removed.is_empty() {
        tracing::info!(cart_id = %cart.id, removed = removed.len(), "pruned orphaned cart lines");
        audit::record(
            &state.pool,
            user.user_id,
            AuditAction::CartPrune,
            serde_json::json!({ "product_ids": removed }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Orphaned items removed",
        PruneResult { removed },
        Some(Meta::empty()),
    ))
}

/// Opens a payment session for the submitted items, charged at current
/// catalog prices.
pub async fn buy_cart(
    state: &AppState,
    user: &AuthUser,
    payload: BuyCartRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    if payload.products.is_empty() {
        return Err(AppError::EmptyCheckout);
    }

    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(payload.products.len());
    for item in &payload.products {
        if !seen.insert(item.product_id) {
            return Err(AppError::BadRequest(format!(
                "product {} is listed more than once",
                item.product_id
            )));
        }
        let quantity = i32::try_from(item.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity(item.quantity))?;
        lines.push(CartLine {
            product_id: item.product_id,
            quantity,
        });
    }

    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let catalog = load_catalog(&state.orm, &ids).await?;

    let mut items = Vec::with_capacity(lines.len());
    for (requested, line) in payload.products.iter().zip(&lines) {
        let product = catalog
            .get(&line.product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {}", line.product_id)))?;
        if line.quantity > product.stock {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.name
            )));
        }
        if let Some(stated) = requested.price.filter(|p| *p != product.price) {
            tracing::warn!(
                product_id = %product.id,
                stated,
                catalog_price = product.price,
                "client price differs from catalog; charging catalog price"
            );
        }
        items.push(CheckoutItem {
            name: product.name.clone(),
            image: Some(product.image.clone()).filter(|s| !s.is_empty()),
            price: product.price,
            quantity: line.quantity,
        });
    }

    let idempotency_key = match payload
        .idempotency_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        Some(nonce) => format!("{}:{nonce}", user.user_id),
        None => derive_idempotency_key(user.user_id, &lines, Utc::now()),
    };

    let session = state.checkout.initiate(&items, &idempotency_key).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CheckoutSession,
        serde_json::json!({
            "session_id": session.id,
            "amount_total": session.amount_total,
            "items": lines.len(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            id: session.id,
            url: session.url,
            amount_total: session.amount_total,
        },
        Some(Meta::empty()),
    ))
}

/// Read-modify-write of one cart under a row lock. Nothing is written when
/// `apply` fails.
async fn mutate_cart<F>(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    action: AuditAction,
    apply: F,
) -> AppResult<ApiResponse<CartView>>
where
    F: FnOnce(&mut Cart) -> Result<LineChange, CartError>,
{
    let txn = state.orm.begin().await?;
    let cart_row = lock_cart(&txn, user.user_id).await?;
    let mut cart = Cart::from_lines(user.user_id, load_lines(&txn, cart_row.id).await?);

    let change = apply(&mut cart)?;
    if let LineChange::Inserted(_) = change {
        find_product(&txn, product_id).await?;
    }
    persist_change(&txn, cart_row.id, change).await?;
    txn.commit().await?;

    if change != LineChange::Unchanged {
        tracing::debug!(cart_id = %cart_row.id, change = ?change, "cart updated");
        audit::record(
            &state.pool,
            user.user_id,
            action,
            serde_json::json!({
                "product_id": product_id,
                "quantity": cart.line(product_id).map(|l| l.quantity).unwrap_or(0),
            }),
        )
        .await;
    }

    let view = cart_view(&state.orm, cart_row.id).await?;
    Ok(ApiResponse::success(
        "Cart updated successfully",
        view,
        Some(Meta::empty()),
    ))
}

/// Fetches the buyer's cart row, creating it on first use, and holds its
/// row lock until the transaction ends.
async fn lock_cart(txn: &DatabaseTransaction, owner_id: Uuid) -> AppResult<CartModel> {
    let fresh = CartActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        created_at: NotSet,
        updated_at: NotSet,
    };
    Carts::insert(fresh)
        .on_conflict(OnConflict::column(CartCol::OwnerId).do_nothing().to_owned())
        .exec_without_returning(txn)
        .await?;

    Carts::find()
        .filter(CartCol::OwnerId.eq(owner_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))
}

async fn load_lines<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
    Ok(CartLines::find()
        .filter(LineCol::CartId.eq(cart_id))
        .order_by_asc(LineCol::CreatedAt)
        .order_by_asc(LineCol::ProductId)
        .all(conn)
        .await?
        .into_iter()
        .map(|row| CartLine {
            product_id: row.product_id,
            quantity: row.quantity,
        })
        .collect())
}

async fn persist_change(
    txn: &DatabaseTransaction,
    cart_id: Uuid,
    change: LineChange,
) -> AppResult<()> {
    match change {
        LineChange::Unchanged => return Ok(()),
        LineChange::Inserted(line) => {
            CartLines::insert(LineActive {
                cart_id: Set(cart_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                created_at: NotSet,
            })
            .exec_without_returning(txn)
            .await?;
        }
        LineChange::Updated(line) => {
            CartLines::update_many()
                .col_expr(LineCol::Quantity, Expr::value(line.quantity))
                .filter(LineCol::CartId.eq(cart_id))
                .filter(LineCol::ProductId.eq(line.product_id))
                .exec(txn)
                .await?;
        }
        LineChange::Removed(product_id) => {
            CartLines::delete_many()
                .filter(LineCol::CartId.eq(cart_id))
                .filter(LineCol::ProductId.eq(product_id))
                .exec(txn)
                .await?;
        }
    }
    touch_cart(txn, cart_id).await
}

async fn touch_cart(txn: &DatabaseTransaction, cart_id: Uuid) -> AppResult<()> {
    Carts::update_many()
        .col_expr(CartCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(CartCol::Id.eq(cart_id))
        .exec(txn)
        .await?;
    Ok(())
}

async fn cart_view<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<CartView> {
    let lines = load_lines(conn, cart_id).await?;
    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let catalog = load_catalog(conn, &ids).await?;
    Ok(price_entries(resolve_lines(&lines, &catalog)).into())
}
