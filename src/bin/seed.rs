use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use marketplace_api::{
    db::{create_orm_conn, run_migrations},
    entity::products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
    middleware::auth::{Claims, ROLE_BUYER, ROLE_SELLER},
    models::Category,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use uuid::Uuid;

const DEMO_SELLER: Uuid = Uuid::from_u128(0x5e11e700_0000_4000_8000_000000000001);
const DEMO_BUYER: Uuid = Uuid::from_u128(0xb0e7e700_0000_4000_8000_000000000002);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let seeded = seed_products(&orm).await?;
    println!("Seeded {seeded} products for seller {DEMO_SELLER}");

    // Tokens come from the auth service in production; these are for local use.
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        println!("Seller token: {}", mint_token(&secret, DEMO_SELLER, ROLE_SELLER)?);
        println!("Buyer token:  {}", mint_token(&secret, DEMO_BUYER, ROLE_BUYER)?);
    }
    Ok(())
}

async fn seed_products(orm: &sea_orm::DatabaseConnection) -> anyhow::Result<u64> {
    let products = [
        ("Noise Cancelling Headphones", "Over-ear, 30h battery", 1_499_900, 25, Category::Electronics),
        ("Linen Shirt", "Breathable summer fit", 129_900, 60, Category::Fashion),
        ("Ceramic Planter", "Hand glazed, 20cm", 49_900, 40, Category::Home),
        ("Yoga Mat", "6mm non-slip", 89_900, 35, Category::Sports),
        ("The Rust Programming Language", "Paperback edition", 59_900, 80, Category::Books),
    ];

    let mut inserted = 0;
    for (name, description, price, quantity, category) in products {
        let product = ProductActive {
            // Stable ids keep reruns idempotent.
            id: Set(Uuid::new_v5(&DEMO_SELLER, name.as_bytes())),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            price: Set(price),
            quantity: Set(quantity),
            category: Set(category.as_str().to_string()),
            owner_id: Set(DEMO_SELLER),
            image: Set(format!("https://placehold.co/400?text={}", category.as_str())),
            created_at: NotSet,
            updated_at: NotSet,
        };
        inserted += Products::insert(product)
            .on_conflict(OnConflict::column(ProductCol::Id).do_nothing().to_owned())
            .exec_without_returning(orm)
            .await?;
    }
    Ok(inserted)
}

fn mint_token(secret: &str, user_id: Uuid, role: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}
