#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use marketplace_api::{
    config::{AppConfig, PaymentBackend, PaymentConfig},
    db::{create_orm_conn, pool_of, run_migrations},
    domain::checkout::{CheckoutInitiator, CheckoutSettings},
    dto::products::CreateProductRequest,
    middleware::auth::AuthUser,
    models::Category,
    payments::MockPaymentProvider,
    services::product_service,
    state::AppState,
};
use uuid::Uuid;

/// Database URL for DB-backed tests, or `None` to skip them.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub async fn setup_state(
    database_url: &str,
) -> anyhow::Result<(AppState, Arc<MockPaymentProvider>)> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        cors_origin: None,
        client_url: "http://localhost:5173".into(),
        payment: PaymentConfig {
            backend: PaymentBackend::Mock,
            stripe_secret_key: None,
            stripe_api_base: "https://api.stripe.com".into(),
            currency: "inr".into(),
            timeout: Duration::from_secs(5),
        },
    };

    let provider = Arc::new(MockPaymentProvider::new());
    let checkout = CheckoutInitiator::new(
        provider.clone(),
        CheckoutSettings {
            currency: config.payment.currency.clone(),
            success_url: config.success_url(),
            cancel_url: config.cancel_url(),
            timeout: config.payment.timeout,
        },
    );

    let state = AppState {
        pool: pool_of(&orm),
        orm,
        config: Arc::new(config),
        checkout,
    };
    Ok((state, provider))
}

pub fn new_product(name: &str, price: i64) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        description: "integration test product".into(),
        price,
        quantity: 10,
        category: Some(Category::Home),
        image: "https://img.example/p.png".into(),
    }
}

pub async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    name: &str,
    price: i64,
) -> anyhow::Result<Uuid> {
    let created = product_service::add_product(state, seller, new_product(name, price)).await?;
    Ok(created.data.expect("product").id)
}
