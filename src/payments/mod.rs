//! Hosted checkout session providers.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{PaymentBackend, PaymentConfig};

pub mod mock;
pub mod stripe;

pub use mock::MockPaymentProvider;
pub use stripe::StripeProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub image: Option<String>,
    /// Minor currency units.
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub line_items: Vec<LineItem>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Replaying a key must not open a second session.
    pub idempotency_key: String,
}

impl SessionRequest {
    pub fn amount_total(&self) -> i64 {
        self.line_items.iter().fold(0_i64, |acc, item| {
            acc.saturating_add(item.unit_amount.saturating_mul(i64::from(item.quantity)))
        })
    }

    /// Digest of what the session charges. Two requests with the same
    /// fingerprint bill the same amount for the same items.
    pub fn fingerprint(&self) -> String {
        charge_fingerprint(&self.currency, &self.line_items)
    }
}

pub fn charge_fingerprint(currency: &str, items: &[LineItem]) -> String {
    let mut material = Vec::with_capacity(currency.len() + items.len() * 32);
    material.extend_from_slice(currency.to_ascii_lowercase().as_bytes());
    for item in items {
        material.push(0);
        material.extend_from_slice(item.name.as_bytes());
        material.push(0);
        material.extend_from_slice(&item.unit_amount.to_be_bytes());
        material.extend_from_slice(&item.quantity.to_be_bytes());
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &material)
        .simple()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("request to payment provider failed: {0}")]
    Transport(String),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_session(&self, request: &SessionRequest)
    -> Result<PaymentSession, PaymentError>;
}

/// Builds the process-wide provider once at startup.
pub fn provider_from_config(config: &PaymentConfig) -> anyhow::Result<Arc<dyn PaymentProvider>> {
    let provider: Arc<dyn PaymentProvider> = match config.backend {
        PaymentBackend::Stripe => {
            let key = config
                .stripe_secret_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("STRIPE_SECRET_KEY is not set"))?;
            Arc::new(StripeProvider::new(
                key,
                config.stripe_api_base.clone(),
                config.timeout,
            )?)
        }
        PaymentBackend::Mock => Arc::new(MockPaymentProvider::new()),
    };
    tracing::info!(provider = provider.name(), "payment provider configured");
    Ok(provider)
}
