//! Status and role enums.
//!
//! All three map to `PostgreSQL` enum types in the `instashop` schema and
//! serialize as lowercase strings on the wire.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a string does not name a variant of the target enum.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseStatusError {
    /// Which enum was being parsed (e.g. "order status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Review status of a product listing.
///
/// Products are created `Pending`; only pending products may be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "instashop.product_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Pending,
    Declined,
    Approved,
}

impl ProductStatus {
    /// The lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Declined => "declined",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an order.
///
/// ```text
/// pending ──► approved
///    │  └───► declined
///    └──────► canceled   (owner only, from pending only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "instashop.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Declined,
    Approved,
    Canceled,
}

impl OrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Declined, Self::Approved, Self::Canceled];

    /// The lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Declined => "declined",
            Self::Approved => "approved",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    /// Exact, case-sensitive match against the lowercase names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "order status",
                value: s.to_owned(),
            })
    }
}

/// Account role, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "instashop.user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper. Default for self-registration.
    #[default]
    User,
    /// Catalog maintainer who may also shop.
    Editor,
    /// Catalog administrator. Created only through the CLI.
    Admin,
}

impl Role {
    /// The lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseStatusError;

    /// Exact, case-sensitive match: `"Admin"` is not a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseStatusError {
                kind: "role",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_order_status_rejects_unknown_and_miscased() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert!("Pending".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_role_parse_is_case_sensitive() {
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("Editor".parse::<Role>().is_err());
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Canceled).unwrap(),
            "\"canceled\""
        );
        assert_eq!(
            serde_json::to_string(&ProductStatus::default()).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
