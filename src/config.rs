use std::{env, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBackend {
    Stripe,
    Mock,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub backend: PaymentBackend,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub currency: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origin: Option<String>,
    /// Base URL of the storefront; checkout redirects land under it.
    pub client_url: String,
    pub payment: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty());
        let client_url = env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            cors_origin,
            client_url,
            payment: PaymentConfig::from_env()?,
        })
    }

    pub fn success_url(&self) -> String {
        format!("{}/buyer/payment-success", self.client_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/buyer/payment-failure", self.client_url)
    }
}

impl PaymentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match env::var("PAYMENT_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "stripe" => PaymentBackend::Stripe,
            "mock" => PaymentBackend::Mock,
            other => anyhow::bail!("unknown PAYMENT_PROVIDER `{other}`"),
        };
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok().filter(|s| !s.is_empty());
        if backend == PaymentBackend::Stripe && stripe_secret_key.is_none() {
            anyhow::bail!("STRIPE_SECRET_KEY is required when PAYMENT_PROVIDER=stripe");
        }
        let stripe_api_base = env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let currency = env::var("PAYMENT_CURRENCY")
            .unwrap_or_else(|_| "inr".to_string())
            .to_ascii_lowercase();
        let timeout_secs = env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(10);

        Ok(Self {
            backend,
            stripe_secret_key,
            stripe_api_base,
            currency,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
