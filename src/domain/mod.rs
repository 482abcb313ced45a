//! Storage-independent cart, pricing and checkout rules.
//!
//! Services load persisted state into these types, apply one operation and
//! write the outcome back inside the same transaction.

pub mod cart;
pub mod checkout;
pub mod pricing;
