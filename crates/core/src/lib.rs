//! Instashop Core - Shared domain types.
//!
//! This crate provides the types used across all Instashop components:
//! - `server` - HTTP API for accounts, products, and orders
//! - `cli` - Command-line tools for migrations and administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision functions - no I/O,
//! no database access, no HTTP clients. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, usernames, and statuses
//! - [`access`] - The role/action authorization table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod types;

pub use access::{Action, allow};
pub use types::*;
