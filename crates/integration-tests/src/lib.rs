//! Integration test harness for Instashop.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests over the in-memory gateway
//! cargo test -p instashop-integration-tests
//!
//! # Postgres-backed tests (needs INSTASHOP_TEST_DATABASE_URL or DATABASE_URL)
//! cargo test -p instashop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `http_api` - Routes, status codes, and error bodies
//! - `order_workflow` - Order placement atomicity, cancellation, timeouts
//! - `postgres_store` - The `PgStore` gateway against a live database

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use instashop_core::{Email, Price, Role, UserId};
use instashop_server::build_router;
use instashop_server::config::{AuthConfig, PolicyConfig, ServerConfig};
use instashop_server::db::{MemoryStore, ProductStore, UserStore};
use instashop_server::models::{NewProduct, Product};
use instashop_server::services::{Notification, NotificationDispatcher, Notifier, NotifyError};
use instashop_server::state::AppState;

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

/// Configuration suitable for in-process tests.
#[must_use]
pub fn test_config(request_timeout: Duration) -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        auth: AuthConfig {
            jwt_secret: SecretString::from("kX9#mQ2$vL7@pR4!nT8&wZ3*bF6^hJ1%"),
            token_ttl: Duration::from_secs(3600),
        },
        verification_code_ttl: Duration::from_secs(15 * 60),
        request_timeout,
        policy: PolicyConfig::default(),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A router over the in-memory gateway.
pub struct TestApp {
    pub store: MemoryStore,
    pub state: AppState,
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
}

/// Status and parsed JSON body of a response. Non-JSON bodies become strings.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    #[must_use]
    pub fn with_timeout(request_timeout: Duration) -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let notifications = NotificationDispatcher::new(notifier.clone());
        let state = AppState::new(
            test_config(request_timeout),
            Arc::new(store.clone()),
            notifications,
        );
        let router = build_router(state.clone());

        Self {
            store,
            state,
            router,
            notifier,
        }
    }

    /// Mint a bearer token directly, bypassing registration.
    #[must_use]
    pub fn token(&self, user_id: i32, role: Role) -> String {
        self.state.tokens().issue(UserId::new(user_id), role).unwrap()
    }

    /// Insert a pending product owned by `owner`.
    pub async fn seed_product(&self, owner: i32, name: &str, price: &str) -> Product {
        self.store
            .create_product(NewProduct {
                user_id: UserId::new(owner),
                name: name.to_owned(),
                description: format!("A {}", name.to_lowercase()),
                price: Price::new(price.parse().unwrap()).unwrap(),
            })
            .await
            .unwrap()
    }

    /// The outstanding verification code for `email`.
    pub async fn verification_code(&self, email: &str) -> Option<String> {
        self.store
            .user_by_email(&Email::parse(email).unwrap())
            .await
            .unwrap()
            .and_then(|u| u.verification)
            .map(|v| v.code)
    }

    /// Send one request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
