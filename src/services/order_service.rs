use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        carts::{Column as CartCol, Entity as Carts},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Convert the caller's cart into a pending order in one transaction:
/// read cart rows, re-price from the live catalog, insert the order and its
/// snapshot line items, drain the cart. Either everything commits or
/// nothing does.
pub async fn create_order(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let entries = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if entries.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    // Re-read each product at its current price. An entry whose product was
    // deleted after it entered the cart is dropped, not an error; the cart
    // is drained in full below either way.
    let mut lines: Vec<(ProductModel, i32)> = Vec::with_capacity(entries.len());
    for entry in &entries {
        if let Some(product) = Products::find_by_id(entry.product_id).one(&txn).await? {
            lines.push((product, entry.quantity));
        } else {
            tracing::warn!(product_id = %entry.product_id, "cart entry references a vanished product, skipping");
        }
    }

    let total_amount: Decimal = lines
        .iter()
        .map(|(product, quantity)| product.price * Decimal::from(*quantity))
        .sum();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (product, quantity) in &lines {
        OrderItemActive {
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            product_price: Set(product.price),
            quantity: Set(*quantity),
        }
        .insert(&txn)
        .await?;
    }

    Carts::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = find_owned_for_update(&txn, user, id).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest("Order cannot be paid".into()));
    }

    // Mock payment: no settlement call, just the status flip.
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Paid);
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order paid");

    Ok(ApiResponse::success(
        "Payment recorded",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = find_owned_for_update(&txn, user, id).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "Only pending orders can be cancelled".into(),
        ));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order cancelled");

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderList { items: orders },
        Some(Meta::empty()),
    ))
}

/// Load an order by id scoped to its owner, locked for update. A wrong id
/// and someone else's order are indistinguishable to the caller.
async fn find_owned_for_update(
    txn: &DatabaseTransaction,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<OrderModel> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(txn)
        .await?;

    order.ok_or(AppError::NotFound)
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        product_price: model.product_price,
        quantity: model.quantity,
    }
}
