use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    cart::CartLine,
    pricing::{CartSummary, PricedLine},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuantityQuery {
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

/// Priced cart. `orphans` lists lines whose product was removed from the
/// catalog; they are excluded from both totals.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub total_items: i64,
    pub total_cost: i64,
    pub cart_items: Vec<CartItemView>,
    pub orphans: Vec<CartLine>,
}

impl From<PricedLine> for CartItemView {
    fn from(line: PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name,
            image: line.image,
            price: line.price,
            quantity: line.quantity,
            subtotal: line.subtotal,
        }
    }
}

impl From<CartSummary> for CartView {
    fn from(summary: CartSummary) -> Self {
        Self {
            total_items: summary.total_items,
            total_cost: summary.total_cost,
            cart_items: summary.lines.into_iter().map(CartItemView::from).collect(),
            orphans: summary.orphans,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PruneResult {
    pub removed: Vec<Uuid>,
}

/// `name`, `image` and `price` are what the client displayed; the catalog
/// values are charged.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyCartItem {
    pub product_id: Uuid,
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Option<i64>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyCartRequest {
    pub products: Vec<BuyCartItem>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub id: String,
    pub url: Option<String>,
    pub amount_total: i64,
}
