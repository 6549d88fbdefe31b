use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// One cart row joined to the product's current name and price.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = String, example = "49.99")]
    pub product_price: Decimal,
    pub quantity: i32,
    #[schema(value_type = String, example = "99.98")]
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineDto>,
    #[schema(value_type = String, example = "99.98")]
    pub total_amount: Decimal,
}
