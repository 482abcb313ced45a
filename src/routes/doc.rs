use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::cart::CartLine,
    dto::{
        cart::{
            BuyCartItem, BuyCartRequest, CartItemView, CartView, CheckoutSessionResponse,
            PruneResult, QuantityQuery,
        },
        products::{CategoryList, CreateProductRequest, ProductDetail, ProductList},
        reviews::{AddCommentRequest, AddRatingRequest, CommentList, RatingSummary},
    },
    models::{Category, Product, Review},
    response::{ApiResponse, Meta},
    routes::{buyer, cart, health, params, seller},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_items,
        cart::add_item,
        cart::remove_item,
        cart::update_item,
        cart::prune_orphans,
        cart::buy_cart,
        seller::get_products,
        seller::add_product,
        seller::delete_product,
        buyer::get_recommended_products,
        buyer::get_product,
        buyer::search_products,
        buyer::get_products_by_categories,
        buyer::get_categories,
        buyer::get_rating,
        buyer::add_rating,
        buyer::get_comments,
        buyer::add_comment
    ),
    components(
        schemas(
            Product,
            Review,
            Category,
            CartLine,
            CartItemView,
            CartView,
            PruneResult,
            QuantityQuery,
            BuyCartItem,
            BuyCartRequest,
            CheckoutSessionResponse,
            CreateProductRequest,
            ProductList,
            ProductDetail,
            CategoryList,
            AddRatingRequest,
            AddCommentRequest,
            RatingSummary,
            CommentList,
            params::Pagination,
            params::SearchQuery,
            params::CategoryQuery,
            health::HealthData,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CheckoutSessionResponse>,
            ApiResponse<RatingSummary>,
            ApiResponse<CommentList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Buyer cart and checkout endpoints"),
        (name = "Seller", description = "Seller catalog endpoints"),
        (name = "Buyer", description = "Browsing, ratings and comments"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cart_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/cart/get-items",
            "/cart/add-item/{product_id}",
            "/cart/remove-item/{product_id}",
            "/cart/update-item/{product_id}",
            "/cart/prune",
            "/cart/buy-cart",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
