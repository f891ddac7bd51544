//! Stock reservation at checkout and the archive-or-delete decision for products.
//!
//! Order placement runs as one transaction: the referenced product rows are locked
//! with `SELECT ... FOR UPDATE` in ascending id order, validated, snapshotted into
//! order items and decremented before commit. Any failure drops the transaction,
//! so no partial order or stock change is ever persisted.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::{
        orders::{OrderLineRequest, PlaceOrderRequest, PlaceOrderResponse},
        products::{DeleteOutcome, DeleteProductResponse},
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::ActiveModel as OrderActive,
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderStatus, PaymentStatus, money_fits},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Price and name copied from the catalog at the moment of purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSnapshot {
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

pub fn order_total(lines: &[LineSnapshot]) -> Decimal {
    lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

pub fn ensure_total_fits(total: Decimal) -> AppResult<()> {
    if !money_fits(total) {
        return Err(AppError::Validation(format!(
            "order total {total} exceeds the maximum order value"
        )));
    }
    Ok(())
}

pub fn validate_lines(items: &[OrderLineRequest]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::Validation("order must contain at least one item".into()));
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity for product {} must be a positive integer",
                item.product_id
            )));
        }
    }
    Ok(())
}

/// Check every line against the locked product rows and build the snapshots.
/// Repeated lines for one product draw down the same stock.
pub fn reserve_lines(
    items: &[OrderLineRequest],
    products: &HashMap<i32, ProductModel>,
) -> AppResult<Vec<LineSnapshot>> {
    let mut remaining: HashMap<i32, i32> =
        products.iter().map(|(id, p)| (*id, p.stock)).collect();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_active)
            .ok_or(AppError::ProductNotFound {
                product_id: item.product_id,
            })?;
        let available = remaining.entry(product.id).or_insert(product.stock);
        if *available < item.quantity {
            return Err(AppError::InsufficientStock {
                product_id: product.id,
                product_name: product.name.clone(),
                available: *available,
                requested: item.quantity,
            });
        }
        *available -= item.quantity;
        lines.push(LineSnapshot {
            product_id: product.id,
            product_name: product.name.clone(),
            price: product.price,
            quantity: item.quantity,
        });
    }

    Ok(lines)
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlaceOrderResponse>> {
    validate_lines(&payload.items)?;
    let shipping = payload.shipping_details.normalized()?;

    let mut product_ids: Vec<i32> = payload.items.iter().map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let txn = state.orm.begin().await?;

    let products: HashMap<i32, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let lines = reserve_lines(&payload.items, &products)?;
    let total = order_total(&lines);
    ensure_total_fits(total)?;

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user.user_id),
        total: Set(total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        shipping_name: Set(shipping.name),
        shipping_phone: Set(shipping.phone),
        shipping_address: Set(shipping.address),
        shipping_city: Set(shipping.city),
        shipping_state: Set(shipping.state),
        shipping_pincode: Set(shipping.pincode),
        created_at: NotSet,
        updated_at: NotSet,
        restocked_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let items = lines.iter().map(|line| OrderItemActive {
        id: NotSet,
        order_id: Set(order.id),
        product_id: Set(Some(line.product_id)),
        quantity: Set(line.quantity),
        price: Set(line.price),
        product_name: Set(line.product_name.clone()),
    });
    OrderItems::insert_many(items).exec(&txn).await?;

    for line in &lines {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        // The row lock makes this unreachable unless stock was edited outside the lock.
        if result.rows_affected != 1 {
            return Err(stock_shortfall(&txn, line).await?);
        }
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id = user.user_id,
        lines = lines.len(),
        total = %total,
        "order placed"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        PlaceOrderResponse {
            order_id: order.id,
            total: order.total,
        },
        Some(Meta::empty()),
    ))
}

/// Build the `InsufficientStock` error for a line whose decrement matched no row,
/// reporting the stock currently on the row.
pub async fn stock_shortfall<C>(conn: &C, line: &LineSnapshot) -> AppResult<AppError>
where
    C: ConnectionTrait,
{
    let available = Products::find_by_id(line.product_id)
        .one(conn)
        .await?
        .map_or(0, |p| p.stock);
    Ok(AppError::InsufficientStock {
        product_id: line.product_id,
        product_name: line.product_name.clone(),
        available,
        requested: line.quantity,
    })
}

/// Put the quantities of a cancelled order back on the shelf. Runs inside the
/// caller's transaction; items whose product row is gone are skipped.
pub async fn restock_order<C>(conn: &C, order_id: i32) -> AppResult<i32>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let mut restocked = 0;
    for item in items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(product_id))
            .exec(conn)
            .await?;
        if result.rows_affected > 0 {
            restocked += item.quantity;
        }
    }
    Ok(restocked)
}

pub async fn archive_or_delete(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<DeleteProductResponse>> {
    ensure_admin(user)?;
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let references = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;

    let outcome = if references > 0 {
        archive(state, product).await?;
        DeleteOutcome::Archived
    } else {
        let image_url = product.image_url.clone();
        match Products::delete_by_id(id)
            .exec(&state.orm)
            .await
            .map_err(AppError::from)
        {
            Ok(result) if result.rows_affected == 0 => return Err(AppError::NotFound),
            Ok(_) => {
                state.images.discard(image_url.as_deref()).await;
                DeleteOutcome::Deleted
            }
            // An order referenced the product after the check above.
            Err(err) if err.is_foreign_key_violation() => {
                tracing::warn!(product_id = id, "hard delete rejected by foreign key, archiving");
                archive(state, product).await?;
                DeleteOutcome::Archived
            }
            Err(err) => return Err(err),
        }
    };

    let action = match outcome {
        DeleteOutcome::Deleted => "product_delete",
        DeleteOutcome::Archived => "product_archive",
    };
    tracing::info!(product_id = id, ?outcome, "product removed from catalog");
    audit::record(
        &state.pool,
        Some(user.user_id),
        action,
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    let message = match outcome {
        DeleteOutcome::Deleted => "Product deleted",
        DeleteOutcome::Archived => {
            "Product archived: it is referenced by existing orders and was marked inactive"
        }
    };
    Ok(ApiResponse::success(
        message,
        DeleteProductResponse {
            product_id: id,
            outcome,
        },
        Some(Meta::empty()),
    ))
}

async fn archive(state: &AppState, product: ProductModel) -> AppResult<()> {
    let mut active: ProductActive = product.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: Decimal, stock: i32, is_active: bool) -> ProductModel {
        ProductModel {
            id,
            name: format!("Product {id}"),
            description: None,
            price,
            category: Some("Boxes".into()),
            stock,
            is_active,
            image_url: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn line(product_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    fn catalog(products: Vec<ProductModel>) -> HashMap<i32, ProductModel> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn total_is_sum_of_frozen_price_times_quantity() {
        let products = catalog(vec![
            product(1, Decimal::new(29900, 2), 10, true),
            product(2, Decimal::new(1250, 2), 100, true),
        ]);
        let lines = reserve_lines(&[line(1, 3), line(2, 4)], &products).unwrap();
        assert_eq!(order_total(&lines), Decimal::new(94700, 2));
        assert_eq!(lines[0].price, Decimal::new(29900, 2));
        assert_eq!(lines[0].product_name, "Product 1");
    }

    #[test]
    fn missing_or_inactive_product_is_not_found() {
        let products = catalog(vec![product(1, Decimal::ONE, 5, false)]);
        assert!(matches!(
            reserve_lines(&[line(1, 1)], &products),
            Err(AppError::ProductNotFound { product_id: 1 })
        ));
        assert!(matches!(
            reserve_lines(&[line(9, 1)], &products),
            Err(AppError::ProductNotFound { product_id: 9 })
        ));
    }

    #[test]
    fn over_request_reports_available_stock() {
        let products = catalog(vec![product(1, Decimal::ONE, 2, true)]);
        match reserve_lines(&[line(1, 3)], &products) {
            Err(AppError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_id, 1);
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeated_lines_share_one_stock_pool() {
        let products = catalog(vec![product(1, Decimal::ONE, 3, true)]);
        assert!(reserve_lines(&[line(1, 2), line(1, 1)], &products).is_ok());
        assert!(matches!(
            reserve_lines(&[line(1, 2), line(1, 2)], &products),
            Err(AppError::InsufficientStock { available: 1, .. })
        ));
    }

    #[test]
    fn zero_stock_rejects_any_quantity() {
        let products = catalog(vec![product(1, Decimal::ONE, 0, true)]);
        assert!(matches!(
            reserve_lines(&[line(1, 1)], &products),
            Err(AppError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn oversized_total_is_a_validation_error() {
        let products = catalog(vec![product(1, Decimal::new(9_000_000_000, 0), 5, true)]);
        let lines = reserve_lines(&[line(1, 2)], &products).unwrap();
        assert!(matches!(
            ensure_total_fits(order_total(&lines)),
            Err(AppError::Validation(_))
        ));
        assert!(ensure_total_fits(Decimal::new(999_999_999_999, 2)).is_ok());
    }

    #[test]
    fn lines_must_be_present_and_positive() {
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[line(1, 0)]).is_err());
        assert!(validate_lines(&[line(1, -2)]).is_err());
        assert!(validate_lines(&[line(1, 1), line(2, 5)]).is_ok());
    }
}
