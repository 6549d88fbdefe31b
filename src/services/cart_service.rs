use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartLineDto, CartView},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartLineRow {
    product_id: Uuid,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound);
    }

    // Repeated adds replace the quantity, they do not sum. The quantity
    // itself is not validated here; the check constraint on carts is the
    // single source of truth for quantity > 0.
    sqlx::query(
        r#"
        INSERT INTO carts (user_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
        "#,
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .execute(pool)
    .await?;

    Ok(ApiResponse::success(
        "Item added to cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM carts WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Item removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    // Inner join: entries whose product has vanished are skipped rather
    // than failing the whole view.
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT c.product_id, p.name AS product_name, p.price AS product_price, c.quantity
        FROM carts c
        JOIN products p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.created_at, c.product_id
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let mut total_amount = Decimal::ZERO;
    let items: Vec<CartLineDto> = rows
        .into_iter()
        .map(|row| {
            let total_price = row.product_price * Decimal::from(row.quantity);
            total_amount += total_price;
            CartLineDto {
                product_id: row.product_id,
                product_name: row.product_name,
                product_price: row.product_price,
                quantity: row.quantity,
                total_price,
            }
        })
        .collect();

    let data = CartView {
        items,
        total_amount,
    };
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}
