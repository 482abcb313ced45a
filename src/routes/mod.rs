use axum::Router;

use crate::state::AppState;

pub mod buyer;
pub mod cart;
pub mod doc;
pub mod health;
pub mod params;
pub mod seller;

// State is attached once at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart::router())
        .nest("/seller", seller::router())
        .nest("/buyer", buyer::router())
}
