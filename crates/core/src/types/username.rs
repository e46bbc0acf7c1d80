//! Account username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// Shorter than [`Username::MIN_LENGTH`].
    #[error("username must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than [`Username::MAX_LENGTH`].
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains a character outside `[A-Za-z0-9_.-]`.
    #[error("username may only contain letters, digits, '_', '.' and '-'")]
    InvalidCharacter,
}

/// A unique, human-chosen account handle.
///
/// Usernames are compared exactly as stored; unlike [`crate::Email`] they
/// are not case-folded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Minimum username length.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum username length.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `Username` from a string (surrounding whitespace is trimmed).
    ///
    /// # Errors
    ///
    /// Returns a [`UsernameError`] if the length or character set is invalid.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let s = s.trim();
        let len = s.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(UsernameError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Username::parse("bob").is_ok());
        assert!(Username::parse("jane.doe-42_x").is_ok());
        assert_eq!(Username::parse("  carol ").map(|u| u.0), Ok("carol".to_owned()));
    }

    #[test]
    fn test_parse_length_bounds() {
        assert_eq!(
            Username::parse("ab"),
            Err(UsernameError::TooShort { min: 3 })
        );
        assert_eq!(
            Username::parse(&"a".repeat(33)),
            Err(UsernameError::TooLong { max: 32 })
        );
        assert!(Username::parse(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn test_parse_rejects_symbols() {
        assert_eq!(
            Username::parse("bob smith"),
            Err(UsernameError::InvalidCharacter)
        );
        assert_eq!(
            Username::parse("bob@home"),
            Err(UsernameError::InvalidCharacter)
        );
    }
}
