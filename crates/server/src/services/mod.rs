//! Business logic services for Instashop.
//!
//! # Services
//!
//! - `accounts` - Registration, email verification, login
//! - `catalog` - Product CRUD for admins and editors
//! - `orders` - Order placement and lifecycle
//! - `identity` - Bearer token issuance and resolution
//! - `notify` - Detached email delivery
//! - `password` - Argon2id hashing and password policy
//!
//! Services borrow the gateway for the duration of a request; gated
//! operations take the caller's [`Identity`].

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod notify;
pub mod orders;
pub mod password;

pub use accounts::{AccountError, AccountService};
pub use catalog::{CatalogService, CreateProduct, UpdateProduct};
pub use error::ServiceError;
pub use identity::{Identity, IdentityError, TokenService};
pub use notify::{
    LogNotifier, Notification, NotificationDispatcher, Notifier, NotifyError, SmtpNotifier,
};
pub use orders::{OrderService, PlaceOrder, ProductRef};
