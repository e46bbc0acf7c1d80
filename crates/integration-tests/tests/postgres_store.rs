//! `PgStore` against a live database.
//!
//! Set `INSTASHOP_TEST_DATABASE_URL` (or `DATABASE_URL`) and run with
//! `--ignored`. Migrations are applied on connect; every test creates its
//! own uniquely named users so runs do not collide.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use instashop_core::{Email, OrderStatus, Price, ProductId, Role, UserId, Username};
use instashop_server::db::{
    self, OrderStore, PgStore, ProductStore, RepositoryError, Store, UserStore,
};
use instashop_server::models::{NewProduct, NewUser, User, VerificationCode};
use instashop_server::services::{Identity, OrderService, PlaceOrder, ServiceError};

async fn connect() -> PgStore {
    let url = std::env::var("INSTASHOP_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("INSTASHOP_TEST_DATABASE_URL or DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../server/migrations").run(&pool).await.unwrap();
    PgStore::new(pool)
}

async fn create_user(store: &PgStore, role: Role) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    store
        .create_user(NewUser {
            username: Username::parse(&format!("u{}", &tag[..12])).unwrap(),
            email: Email::parse(&format!("{tag}@example.com")).unwrap(),
            password_hash: "not-a-real-hash".to_owned(),
            role,
            verification: VerificationCode {
                code: "123456".to_owned(),
                expires_at: Utc::now() + Duration::minutes(15),
            },
        })
        .await
        .unwrap()
}

async fn create_product(store: &PgStore, owner: UserId, name: &str) -> ProductId {
    store
        .create_product(NewProduct {
            user_id: owner,
            name: name.to_owned(),
            description: "A widget".to_owned(),
            price: Price::new("9.99".parse().unwrap()).unwrap(),
        })
        .await
        .unwrap()
        .id
}

async fn set_product_status(pool: &PgPool, id: ProductId, status: &str) {
    sqlx::query("UPDATE instashop.product SET status = $2::instashop.product_status WHERE id = $1")
        .bind(id.as_i32())
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
}

async fn order_rows(pool: &PgPool, owner: UserId) -> i64 {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM instashop."order" WHERE user_id = $1"#)
        .bind(owner.as_i32())
        .fetch_one(pool)
        .await
        .unwrap()
}

fn identity(user: &User) -> Identity {
    Identity {
        user_id: user.id,
        role: user.role.as_str().to_owned(),
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_ping() {
    let store = connect().await;
    store.ping().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_duplicate_email_is_conflict() {
    let store = connect().await;
    let user = create_user(&store, Role::User).await;

    let err = store
        .create_user(NewUser {
            username: Username::parse(&format!("{}x", user.username.as_str())).unwrap(),
            email: user.email.clone(),
            password_hash: "not-a-real-hash".to_owned(),
            role: Role::User,
            verification: VerificationCode {
                code: "654321".to_owned(),
                expires_at: Utc::now() + Duration::minutes(15),
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(ref c) if c == "user_email_key"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_verification_code_is_single_use() {
    let store = connect().await;
    let user = create_user(&store, Role::User).await;

    assert!(!store.consume_verification_code(user.id, "000000").await.unwrap());
    assert!(store.consume_verification_code(user.id, "123456").await.unwrap());
    assert!(!store.consume_verification_code(user.id, "123456").await.unwrap());

    let reloaded = store.user_by_email(&user.email).await.unwrap().unwrap();
    assert!(reloaded.email_verified);
    assert!(reloaded.verification.is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_place_and_cancel_order() {
    let store = connect().await;
    let editor = create_user(&store, Role::Editor).await;
    let shopper = create_user(&store, Role::User).await;
    let a = create_product(&store, editor.id, "Widget").await;
    let b = create_product(&store, editor.id, "Gadget").await;

    let svc = OrderService::new(&store);
    let order = svc
        .place_order(&identity(&shopper), PlaceOrder::of([b, a]))
        .await
        .unwrap();
    assert_eq!(order.user_id, shopper.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(
        order.products.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![a, b]
    );

    svc.cancel_order(&identity(&shopper), order.id).await.unwrap();
    let err = svc
        .cancel_order(&identity(&shopper), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let header = store.order_header(order.id).await.unwrap().unwrap();
    assert_eq!(header.status, OrderStatus::Canceled);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_failed_append_rolls_back_header() {
    let store = connect().await;
    let editor = create_user(&store, Role::Editor).await;
    let shopper = create_user(&store, Role::User).await;
    let real = create_product(&store, editor.id, "Widget").await;

    let err = OrderService::new(&store)
        .place_order(
            &identity(&shopper),
            PlaceOrder::of([real, ProductId::new(i32::MAX)]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Repository(RepositoryError::ForeignKey(_))
    ));
    assert_eq!(order_rows(store.pool(), shopper.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_dropped_unit_of_work_rolls_back() {
    let store = connect().await;
    let shopper = create_user(&store, Role::User).await;

    {
        let mut uow = store.begin().await.unwrap();
        uow.insert_order(shopper.id).await.unwrap();
    }

    assert_eq!(order_rows(store.pool(), shopper.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_delete_pending_product_is_conditional() {
    let store = connect().await;
    let editor = create_user(&store, Role::Editor).await;
    let other = create_user(&store, Role::Editor).await;
    let product = create_product(&store, editor.id, "Widget").await;

    assert_eq!(store.delete_pending_product(product, other.id).await.unwrap(), 0);

    set_product_status(store.pool(), product, "approved").await;
    assert_eq!(store.delete_pending_product(product, editor.id).await.unwrap(), 0);
    assert!(store.product(product, None).await.unwrap().is_some());

    set_product_status(store.pool(), product, "pending").await;
    assert_eq!(store.delete_pending_product(product, editor.id).await.unwrap(), 1);
    assert_eq!(store.delete_pending_product(product, editor.id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_product_scoped_by_owner() {
    let store = connect().await;
    let editor = create_user(&store, Role::Editor).await;
    let other = create_user(&store, Role::Editor).await;
    let product = create_product(&store, editor.id, "Widget").await;

    assert!(store.product(product, Some(editor.id)).await.unwrap().is_some());
    assert!(store.product(product, Some(other.id)).await.unwrap().is_none());
    assert!(store.product(product, None).await.unwrap().is_some());
    assert_eq!(store.products_by_owner(editor.id).await.unwrap().len(), 1);
}
