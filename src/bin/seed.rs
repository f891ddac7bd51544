use packaging_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Store Admin", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "Demo Customer", "user@example.com", "user123", Role::User).await?;
    seed_categories(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<i32> {
    let password_hash = hash_password(password)?;

    let (user_id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(user_id)
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = [
        ("Boxes", "Corrugated shipping and storage boxes"),
        ("Protective", "Bubble wrap, foam and void fill"),
        ("Tapes", "Packing and sealing tapes"),
        ("Mailers", "Padded and poly mailers"),
    ];

    for (name, description) in categories {
        sqlx::query(
            "INSERT INTO categories (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // prices in minor units, scale 2
    let products = [
        ("3-Ply Corrugated Box 12x10x8", "Single wall box for light parcels", 2500, "Boxes", 500),
        ("5-Ply Corrugated Box 18x12x12", "Double wall box for heavy goods", 6500, "Boxes", 250),
        ("Bubble Wrap Roll 1m x 50m", "Air bubble cushioning roll", 89900, "Protective", 40),
        ("Brown Packing Tape 48mm", "65 metre BOPP tape", 4500, "Tapes", 300),
        ("Fragile Printed Tape", "Red warning print, 48mm", 7900, "Tapes", 120),
        ("Padded Mailer A4", "Kraft envelope with bubble lining", 1800, "Mailers", 800),
    ];

    for (name, description, minor, category, stock) in products {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO products (name, description, price, category, stock)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(Decimal::new(minor, 2))
        .bind(category)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
