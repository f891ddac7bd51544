use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::orders::{OrderList, OrderStats, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::inventory_service,
    state::AppState,
};

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id)
        .all(&state.orm)
        .await?;

    let items = with_items(&state.orm, orders).await?;
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let data = with_items(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let limit = query.effective_limit();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let orders = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id)
        .limit(limit)
        .all(&state.orm)
        .await?;

    let items = with_items(&state.orm, orders).await?;
    let meta = Meta::new(1, limit as i64, items.len() as i64);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    if payload.status.is_none() && payload.payment_status.is_none() {
        return Err(AppError::Validation(
            "status or paymentStatus is required".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current: OrderStatus = existing
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

    let mut restocked = None;
    if let Some(next) = payload.status {
        check_transition(current, next, state.config.strict_status_transitions)?;
        if needs_restock(next, &existing) {
            restocked = Some(inventory_service::restock_order(&txn, id).await?);
        }
    }

    let now = Utc::now();
    let mut active: OrderActive = existing.into();
    if let Some(next) = payload.status {
        active.status = Set(next.as_str().to_string());
    }
    if restocked.is_some() {
        active.restocked_at = Set(Some(now.into()));
    }
    if let Some(payment_status) = payload.payment_status {
        active.payment_status = Set(payment_status.as_str().to_string());
    }
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        from = %current,
        status = %order.status,
        payment_status = %order.payment_status,
        "order status updated"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "from": current.as_str(),
            "status": order.status,
            "payment_status": order.payment_status,
        }),
    )
    .await;
    if let Some(quantity) = restocked {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "order_restock",
            "products",
            serde_json::json!({ "order_id": order.id, "quantity": quantity }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Order updated",
        order.into(),
        Some(Meta::empty()),
    ))
}

/// An order goes back on the shelf at most once, however often it is re-cancelled.
pub fn needs_restock(next: OrderStatus, order: &OrderModel) -> bool {
    next == OrderStatus::Cancelled && order.restocked_at.is_none()
}

pub fn check_transition(current: OrderStatus, next: OrderStatus, strict: bool) -> AppResult<()> {
    if strict && !current.can_transition_to(next) {
        return Err(AppError::Validation(format!(
            "cannot move order from {current} to {next}"
        )));
    }
    Ok(())
}

pub async fn get_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderStats>> {
    ensure_admin(user)?;
    let stats = sqlx::query_as::<_, OrderStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM orders) AS total_orders,
            (SELECT COALESCE(SUM(total), 0) FROM orders WHERE payment_status = $1) AS total_revenue,
            (SELECT COUNT(*) FROM orders WHERE status = $2) AS pending_orders,
            (SELECT COUNT(*) FROM orders WHERE status = $3) AS delivered_orders,
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM products WHERE is_active) AS active_products
        "#,
    )
    .bind(PaymentStatus::Completed.as_str())
    .bind(OrderStatus::Pending.as_str())
    .bind(OrderStatus::Delivered.as_str())
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Stats", stats, Some(Meta::empty())))
}

/// Attach frozen line items to each order, resolving product images live.
async fn with_items<C>(conn: &C, orders: Vec<OrderModel>) -> AppResult<Vec<OrderWithItems>>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();

    let mut by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;
    for (item, product) in rows {
        by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem::from_entity(item, product));
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems {
                order: order.into(),
                items,
            }
        })
        .collect())
}
