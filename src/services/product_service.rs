use crate::{
    db::DbPool,
    dto::products::ProductList,
    error::AppResult,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ListRange,
};

pub async fn list_products(pool: &DbPool, range: ListRange) -> AppResult<ApiResponse<ProductList>> {
    let (skip, limit) = range.normalize();

    // Insertion order; id breaks ties so pages are stable.
    let items = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, price, created_at
        FROM products
        ORDER BY created_at, id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(skip / limit + 1, limit, total.0);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}
