use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CartAdd,
    CartRemove,
    CartUpdate,
    CartPrune,
    CheckoutSession,
    ProductCreate,
    ReviewRating,
    ReviewComment,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CartAdd => "cart_add",
            AuditAction::CartRemove => "cart_remove",
            AuditAction::CartUpdate => "cart_update",
            AuditAction::CartPrune => "cart_prune",
            AuditAction::CheckoutSession => "checkout_session",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ReviewRating => "review_rating",
            AuditAction::ReviewComment => "review_comment",
        }
    }

    fn resource(&self) -> &'static str {
        match self {
            AuditAction::CartAdd
            | AuditAction::CartRemove
            | AuditAction::CartUpdate
            | AuditAction::CartPrune => "cart_lines",
            AuditAction::CheckoutSession => "checkout",
            AuditAction::ProductCreate => "products",
            AuditAction::ReviewRating | AuditAction::ReviewComment => "reviews",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes never fail the request that triggered them.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, Some(user_id), action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
