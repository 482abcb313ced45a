use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use super::cart::CartLine;
use crate::payments::{
    LineItem, PaymentError, PaymentProvider, SessionRequest, charge_fingerprint,
};

/// One line of a checkout as it will be charged. `price` is in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutItem {
    pub name: String,
    pub image: Option<String>,
    pub price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub amount_total: i64,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cannot checkout an empty list of items")]
    Empty,

    #[error("{0}")]
    InvalidItem(String),

    #[error(transparent)]
    Provider(#[from] PaymentError),

    #[error("payment provider did not respond within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout: Duration,
}

/// Turns a list of items into a hosted payment session.
#[derive(Clone)]
pub struct CheckoutInitiator {
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl CheckoutInitiator {
    pub fn new(provider: Arc<dyn PaymentProvider>, settings: CheckoutSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Provider failures and timeouts are returned as-is; nothing is retried.
    #[instrument(skip(self, items), fields(provider = self.provider.name(), items = items.len()))]
    pub async fn initiate(
        &self,
        items: &[CheckoutItem],
        idempotency_key: &str,
    ) -> Result<CheckoutSession, CheckoutError> {
        validate_items(items)?;

        let line_items: Vec<LineItem> = items
            .iter()
            .map(|item| LineItem {
                name: item.name.trim().to_string(),
                image: item.image.clone(),
                unit_amount: item.price,
                quantity: item.quantity,
            })
            .collect();
        // A reused key only replays a session that charges the same amount.
        let fingerprint = charge_fingerprint(&self.settings.currency, &line_items);
        let request = SessionRequest {
            line_items,
            currency: self.settings.currency.clone(),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
            idempotency_key: format!("{idempotency_key}:{fingerprint}"),
        };
        let amount_total = request.amount_total();

        let session = tokio::time::timeout(
            self.settings.timeout,
            self.provider.create_session(&request),
        )
        .await
        .map_err(|_| CheckoutError::Timeout(self.settings.timeout))??;

        tracing::info!(session_id = %session.id, amount_total, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
            amount_total,
        })
    }
}

fn validate_items(items: &[CheckoutItem]) -> Result<(), CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::Empty);
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(CheckoutError::InvalidItem(
                "every item needs a name".to_string(),
            ));
        }
        if item.price <= 0 {
            return Err(CheckoutError::InvalidItem(format!(
                "price of `{}` must be greater than 0",
                item.name
            )));
        }
        if item.quantity < 1 {
            return Err(CheckoutError::InvalidItem(format!(
                "quantity of `{}` must be at least 1",
                item.name
            )));
        }
    }
    Ok(())
}

/// Key for a checkout that carries no client nonce. Identical carts from the
/// same buyer within the same minute map to the same key.
pub fn derive_idempotency_key(buyer: Uuid, lines: &[CartLine], at: DateTime<Utc>) -> String {
    let mut lines = lines.to_vec();
    lines.sort_by_key(|l| l.product_id);

    let mut material = Vec::with_capacity(16 + 8 + lines.len() * 20);
    material.extend_from_slice(buyer.as_bytes());
    material.extend_from_slice(&(at.timestamp() / 60).to_be_bytes());
    for line in &lines {
        material.extend_from_slice(line.product_id.as_bytes());
        material.extend_from_slice(&line.quantity.to_be_bytes());
    }

    format!("checkout-{}", Uuid::new_v5(&Uuid::NAMESPACE_OID, &material))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::payments::MockPaymentProvider;

    fn initiator(provider: MockPaymentProvider) -> CheckoutInitiator {
        CheckoutInitiator::new(
            Arc::new(provider),
            CheckoutSettings {
                currency: "inr".into(),
                success_url: "http://shop/ok".into(),
                cancel_url: "http://shop/cancel".into(),
                timeout: Duration::from_millis(200),
            },
        )
    }

    fn item(price: i64, quantity: i32) -> CheckoutItem {
        CheckoutItem {
            name: "X".into(),
            image: None,
            price,
            quantity,
        }
    }

    #[tokio::test]
    async fn empty_checkout_is_rejected() {
        let err = initiator(MockPaymentProvider::new())
            .initiate(&[], "k")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Empty));
    }

    #[tokio::test]
    async fn invalid_items_are_rejected_before_the_provider() {
        let checkout = initiator(MockPaymentProvider::new());
        for bad in [item(0, 1), item(10, 0)] {
            let err = checkout.initiate(&[bad], "k").await.unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidItem(_)));
        }
    }

    #[tokio::test]
    async fn returns_session_and_total() {
        let session = initiator(MockPaymentProvider::new())
            .initiate(&[item(10, 2)], "k")
            .await
            .unwrap();
        assert!(!session.id.is_empty());
        assert_eq!(session.amount_total, 20);
    }

    #[tokio::test]
    async fn provider_failure_surfaces() {
        let err = initiator(MockPaymentProvider::failing("card network down"))
            .initiate(&[item(10, 2)], "k")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Provider(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let slow = MockPaymentProvider::new().with_latency(Duration::from_secs(5));
        let err = initiator(slow)
            .initiate(&[item(10, 1)], "k")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Timeout(_)));
    }

    #[tokio::test]
    async fn reused_key_with_a_different_basket_opens_a_new_session() {
        let provider = Arc::new(MockPaymentProvider::new());
        let checkout = CheckoutInitiator::new(
            provider.clone(),
            initiator(MockPaymentProvider::new()).settings().clone(),
        );

        let small = checkout.initiate(&[item(10, 1)], "buyer:nonce").await.unwrap();
        let large = checkout.initiate(&[item(10, 50)], "buyer:nonce").await.unwrap();
        assert_eq!(small.amount_total, 10);
        assert_eq!(large.amount_total, 500);
        assert_ne!(small.id, large.id);

        let again = checkout.initiate(&[item(10, 1)], "buyer:nonce").await.unwrap();
        assert_eq!(again.id, small.id);
        assert_eq!(provider.sessions_created(), 2);
    }

    #[test]
    fn derived_key_ignores_line_order_but_not_quantities() {
        let buyer = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 5).unwrap();
        let a = CartLine { product_id: Uuid::new_v4(), quantity: 1 };
        let b = CartLine { product_id: Uuid::new_v4(), quantity: 2 };

        let k1 = derive_idempotency_key(buyer, &[a, b], at);
        let k2 = derive_idempotency_key(buyer, &[b, a], at + chrono::Duration::seconds(30));
        assert_eq!(k1, k2);

        let bumped = CartLine { quantity: 3, ..b };
        assert_ne!(k1, derive_idempotency_key(buyer, &[a, bumped], at));
        assert_ne!(k1, derive_idempotency_key(Uuid::new_v4(), &[a, b], at));
        assert_ne!(
            k1,
            derive_idempotency_key(buyer, &[a, b], at + chrono::Duration::minutes(2))
        );
    }
}
