#![allow(dead_code)]

use std::env;
use std::sync::OnceLock;

use packaging_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::orders::{OrderLineRequest, PlaceOrderRequest, ShippingDetails},
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    models::PaymentMethod,
    services::auth_service::hash_password,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use sqlx::{Connection, PgConnection};
use tokio::sync::{Mutex, MutexGuard};

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

// Shared by every test binary so parallel `cargo test` processes never truncate
// each other's rows.
const ADVISORY_LOCK_KEY: i64 = 424242;

pub struct TestDb {
    pub state: AppState,
    _lock_conn: PgConnection,
    _guard: MutexGuard<'static, ()>,
}

/// Connect to `TEST_DATABASE_URL`, migrate, and wipe every table. Returns `None`
/// when no test database is configured so the calling test can skip.
pub async fn init_test_db() -> anyhow::Result<Option<TestDb>> {
    dotenvy::dotenv().ok();
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping test: set TEST_DATABASE_URL to run integration tests.");
        return Ok(None);
    };

    let guard = TEST_DB_LOCK.get_or_init(|| Mutex::new(())).lock().await;
    let mut lock_conn = PgConnection::connect(&url).await?;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(ADVISORY_LOCK_KEY)
        .execute(&mut lock_conn)
        .await?;

    let pool = create_pool(&url).await?;
    run_migrations(&pool).await?;
    sqlx::query(
        r#"
        TRUNCATE audit_logs, order_items, orders, cart_items, wishlist_items,
                 products, categories, announcements, users
        RESTART IDENTITY CASCADE
        "#,
    )
    .execute(&pool)
    .await?;

    let state = AppState::new(pool, AppConfig::for_database(url));
    Ok(Some(TestDb {
        state,
        _lock_conn: lock_conn,
        _guard: guard,
    }))
}

pub fn price(raw: &str) -> Decimal {
    raw.parse().expect("decimal literal")
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: NotSet,
        name: Set(format!("{role} account")),
        email: Set(email.to_string()),
        password_hash: Set(hash_password("password123")?),
        phone: Set(None),
        role: Set(role.to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: role.to_string(),
    })
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    unit_price: &str,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: NotSet,
        name: Set(name.to_string()),
        description: Set(Some(format!("{name} for shipping"))),
        price: Set(price(unit_price)),
        category: Set(Some("Boxes".to_string())),
        stock: Set(stock),
        is_active: Set(true),
        image_url: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub fn shipping() -> ShippingDetails {
    ShippingDetails {
        name: "Asha Rao".into(),
        phone: "9876543210".into(),
        address: "14 Dock Road".into(),
        city: "Pune".into(),
        state: "Maharashtra".into(),
        pincode: "411001".into(),
    }
}

pub fn order_request(lines: &[(i32, i32)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
        shipping_details: shipping(),
        payment_method: PaymentMethod::Cod,
    }
}
