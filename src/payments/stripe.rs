use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::{PaymentError, PaymentProvider, PaymentSession, SessionRequest};

/// Stripe Checkout Sessions client. One instance (and one connection pool)
/// is shared by every request.
#[derive(Clone)]
pub struct StripeProvider {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.api_base)
            .field("secret_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeProvider {
    pub fn new(secret_key: String, api_base: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }
}

/// Form-encoded body of `POST /v1/checkout/sessions`.
pub(crate) fn form_fields(request: &SessionRequest) -> Vec<(String, String)> {
    let mut fields = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        fields.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        fields.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = item.image.as_ref().filter(|s| !s.is_empty()) {
            fields.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        fields.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        fields.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }
    fields
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    #[instrument(skip(self, request), fields(idempotency_key = %request.idempotency_key, items = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form_fields(request))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            tracing::warn!(status = %status, %message, "stripe rejected checkout session");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: SessionBody = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        if body.id.is_empty() {
            return Err(PaymentError::InvalidResponse("empty session id".into()));
        }

        Ok(PaymentSession {
            id: body.id,
            url: body.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::LineItem;

    #[test]
    fn form_fields_encode_line_items() {
        let request = SessionRequest {
            line_items: vec![
                LineItem {
                    name: "mug".into(),
                    image: Some("https://img.example/mug.png".into()),
                    unit_amount: 1250,
                    quantity: 2,
                },
                LineItem {
                    name: "sticker".into(),
                    image: None,
                    unit_amount: 99,
                    quantity: 1,
                },
            ],
            currency: "inr".into(),
            success_url: "http://shop/ok".into(),
            cancel_url: "http://shop/cancel".into(),
            idempotency_key: "k".into(),
        };

        let fields = form_fields(&request);
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1250"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(
            get("line_items[0][price_data][product_data][images][0]"),
            Some("https://img.example/mug.png")
        );
        assert_eq!(get("line_items[1][price_data][product_data][images][0]"), None);
        assert_eq!(get("line_items[1][price_data][currency]"), Some("inr"));
    }

    #[test]
    fn debug_output_hides_the_secret_key() {
        let provider = StripeProvider::new(
            "sk_test_very_secret".into(),
            "https://api.stripe.com/".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        let printed = format!("{provider:?}");
        assert!(!printed.contains("sk_test_very_secret"));
        assert!(printed.contains("https://api.stripe.com"));
    }
}
