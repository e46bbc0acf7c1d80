//! Role-based authorization table.
//!
//! A single lookup decides whether a role may perform an action. Callers
//! resolve *who* is asking (authentication) before consulting this module;
//! this module only answers *whether* an already-resolved role is allowed.

use core::fmt;

use crate::types::Role;

/// An operation subject to role gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PlaceOrder,
    ListOrders,
    CancelOrder,
    CreateProduct,
    GetProduct,
    ListProductsByOwner,
    UpdateProduct,
    DeletePendingProduct,
}

impl Action {
    /// Every gated action.
    pub const ALL: [Self; 8] = [
        Self::PlaceOrder,
        Self::ListOrders,
        Self::CancelOrder,
        Self::CreateProduct,
        Self::GetProduct,
        Self::ListProductsByOwner,
        Self::UpdateProduct,
        Self::DeletePendingProduct,
    ];

    /// Roles permitted to perform this action.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::PlaceOrder | Self::ListOrders | Self::CancelOrder => {
                &[Role::User, Role::Editor]
            }
            Self::CreateProduct
            | Self::GetProduct
            | Self::ListProductsByOwner
            | Self::UpdateProduct
            | Self::DeletePendingProduct => &[Role::Admin, Role::Editor],
        }
    }

    /// Human-readable verb phrase used in denial messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::PlaceOrder => "place an order",
            Self::ListOrders => "list orders",
            Self::CancelOrder => "cancel an order",
            Self::CreateProduct => "create a product",
            Self::GetProduct => "view this product",
            Self::ListProductsByOwner => "list products",
            Self::UpdateProduct => "update this product",
            Self::DeletePendingProduct => "delete this product",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Role {
    /// Whether this role may perform `action`.
    #[must_use]
    pub fn permits(self, action: Action) -> bool {
        action.allowed_roles().contains(&self)
    }
}

/// Decide whether `role` may perform `action`.
///
/// The role string must match a known role exactly (case-sensitive);
/// anything else is denied.
///
/// ```
/// use instashop_core::{Action, allow};
///
/// assert!(allow("user", Action::PlaceOrder));
/// assert!(!allow("admin", Action::PlaceOrder));
/// assert!(!allow("Editor", Action::CreateProduct));
/// ```
#[must_use]
pub fn allow(role: &str, action: Action) -> bool {
    role.parse::<Role>()
        .is_ok_and(|role| role.permits(action))
}
