//! Domain models for Instashop.
//!
//! These are validated domain objects, separate from database row types.
//! `Product` and `Order` double as the JSON wire shapes.

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderHeader};
pub use product::{NewProduct, Product};
pub use user::{NewUser, User, VerificationCode};
