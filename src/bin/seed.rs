use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use lampshades_api::{config::AppConfig, db::create_pool};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let user_id = ensure_user(&pool, "demo@example.com", "demo123").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Demo user ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    // If the user already exists, fetch its id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        println!("Products already seeded, skipping");
        return Ok(());
    }

    let products = vec![
        (
            "Classic Table Lamp",
            "A beautiful classic table lamp with adjustable brightness",
            Decimal::new(4999, 2),
        ),
        (
            "Modern Desk Lamp",
            "Sleek modern design with LED lighting",
            Decimal::new(3999, 2),
        ),
        (
            "Vintage Floor Lamp",
            "Elegant vintage-style floor lamp",
            Decimal::new(8999, 2),
        ),
        (
            "Minimalist Pendant Light",
            "Simple yet stylish pendant light for modern homes",
            Decimal::new(5999, 2),
        ),
        (
            "Rustic Bedside Lamp",
            "Warm rustic charm for your bedroom",
            Decimal::new(3499, 2),
        ),
        (
            "Industrial Pipe Lamp",
            "Unique industrial design with exposed pipes",
            Decimal::new(7499, 2),
        ),
        (
            "Smart RGB Desk Lamp",
            "Color-changing smart lamp with app control",
            Decimal::new(6999, 2),
        ),
        (
            "Art Deco Table Lamp",
            "Luxurious art deco design with crystal details",
            Decimal::new(9999, 2),
        ),
    ];

    for (name, description, price) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
