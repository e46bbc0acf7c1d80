//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `INSTASHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `INSTASHOP_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `INSTASHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `INSTASHOP_PORT` - Listen port (default: 8080)
//! - `INSTASHOP_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 24)
//! - `INSTASHOP_VERIFICATION_CODE_TTL_MINUTES` - One-time code lifetime (default: 15)
//! - `INSTASHOP_REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 30)
//! - `INSTASHOP_STRICT_PRODUCT_UPDATE` - Scope product updates to the owner (default: false)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Outbound email;
//!   when `SMTP_HOST` is unset, emails are logged instead of sent
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing configuration
    pub auth: AuthConfig,
    /// Lifetime of an email verification code
    pub verification_code_ttl: Duration,
    /// Deadline applied to every request
    pub request_timeout: Duration,
    /// Behavioral switches for documented policy gaps
    pub policy: PolicyConfig,
    /// Outbound email; `None` logs messages instead of sending them
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Bearer token configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: SecretString,
    /// How long issued tokens remain valid
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Switches for behavior whose intended semantics are ambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyConfig {
    /// When set, `UpdateProduct` only finds products owned by the caller.
    /// When unset, any product id may be updated by a permitted role.
    pub strict_product_update: bool,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port (STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Sender address
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("INSTASHOP_DATABASE_URL")?;
        let host = parse_env("INSTASHOP_HOST", "127.0.0.1")?;
        let port = parse_env("INSTASHOP_PORT", "8080")?;

        let jwt_secret = get_validated_secret("INSTASHOP_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "INSTASHOP_JWT_SECRET")?;
        let auth = AuthConfig {
            jwt_secret,
            token_ttl: Duration::from_secs(parse_env::<u64>("INSTASHOP_TOKEN_TTL_HOURS", "24")? * 3600),
        };

        let verification_code_ttl = verification_code_ttl_from_env()?;
        let request_timeout =
            Duration::from_secs(parse_env("INSTASHOP_REQUEST_TIMEOUT_SECS", "30")?);
        let policy = PolicyConfig {
            strict_product_update: parse_env("INSTASHOP_STRICT_PRODUCT_UPDATE", "false")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            auth,
            verification_code_ttl,
            request_timeout,
            policy,
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    /// Load SMTP settings. Returns `None` when `SMTP_HOST` is unset; once it
    /// is set, the remaining variables are required.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Database URL alone, for tools that do not need the full server config.
///
/// Reads `INSTASHOP_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("INSTASHOP_DATABASE_URL")
}

/// Verification code lifetime from `INSTASHOP_VERIFICATION_CODE_TTL_MINUTES` (default 15).
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the value is not a whole number.
pub fn verification_code_ttl_from_env() -> Result<Duration, ConfigError> {
    let minutes = parse_env::<u64>("INSTASHOP_VERIFICATION_CODE_TTL_MINUTES", "15")?;
    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-jwt-signing-key", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_random_value() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        let short = SecretString::from("short");
        assert!(validate_secret_length(&short, "INSTASHOP_JWT_SECRET").is_err());

        let ok = SecretString::from("k".repeat(32));
        assert!(validate_secret_length(&ok, "INSTASHOP_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_env_reports_variable_name() {
        let err = parse_env::<u16>("INSTASHOP_TEST_UNSET_PORT_VAR", "not-a-port").unwrap_err();
        match err {
            ConfigError::InvalidEnvVar(key, _) => assert_eq!(key, "INSTASHOP_TEST_UNSET_PORT_VAR"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            parse_env::<bool>("INSTASHOP_TEST_UNSET_BOOL_VAR", "false").unwrap(),
            false
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: SecretString::from("super_secret_signing_key_value"),
            token_ttl: Duration::from_secs(3600),
        };
        let email = EmailConfig {
            smtp_host: "smtp.mailtrap.io".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "shop@instashop.test".to_string(),
        };

        let debug_output = format!("{auth:?} {email:?}");
        assert!(debug_output.contains("smtp.mailtrap.io"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signing_key_value"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
