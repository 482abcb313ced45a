pub mod cart_lines;
pub mod carts;
pub mod products;
pub mod reviews;

pub use cart_lines::Entity as CartLines;
pub use carts::Entity as Carts;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
