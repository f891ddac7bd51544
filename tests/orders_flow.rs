use packaging_store_api::{
    dto::{cart::AddToCartRequest, orders::UpdateOrderStatusRequest, products::ProductForm},
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        cart_items::{Column as CartCol, Entity as CartItems},
        orders::Entity as Orders,
        products::Entity as Products,
    },
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    routes::params::OrderListQuery,
    services::{
        cart_service,
        inventory_service::{self, LineSnapshot},
        order_service, product_service,
    },
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

mod support;

use support::{create_product, create_user, init_test_db, order_request, price};

async fn stock_of(state: &AppState, product_id: i32) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product row");
    Ok(product.stock)
}

// Place an order, then edit the product: the order keeps the price it was placed at.
#[tokio::test]
async fn checkout_freezes_price_and_decrements_stock() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let admin = create_user(state, "admin", "admin@example.com").await?;
    let product = create_product(state, "Corrugated Box", "299.00", 10).await?;

    cart_service::add_to_cart(
        state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;

    let placed = inventory_service::place_order(state, &user, order_request(&[(product.id, 3)]))
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.total, price("897.00"));
    assert_eq!(stock_of(state, product.id).await?, 7);

    let cart_rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(cart_rows, 0, "checkout clears the cart");

    product_service::update_product(
        state,
        &admin,
        product.id,
        ProductForm {
            price: Some("350.00".into()),
            name: Some("Corrugated Box XL".into()),
            ..Default::default()
        },
    )
    .await?;

    let order = order_service::get_order(state, &user, placed.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.status, OrderStatus::Pending.as_str());
    assert_eq!(order.order.payment_status, PaymentStatus::Pending.as_str());
    assert_eq!(order.order.total, price("897.00"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].price, price("299.00"));
    assert_eq!(order.items[0].product_name, "Corrugated Box");
    assert_eq!(order.items[0].quantity, 3);
    Ok(())
}

#[tokio::test]
async fn out_of_stock_line_creates_nothing() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let sold_out = create_product(state, "Bubble Wrap Roll", "899.00", 0).await?;

    let err = inventory_service::place_order(state, &user, order_request(&[(sold_out.id, 1)]))
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        } => {
            assert_eq!(product_id, sold_out.id);
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(state, sold_out.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn multi_item_order_is_all_or_nothing() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let tape = create_product(state, "Packing Tape", "45.00", 20).await?;
    let mailer = create_product(state, "Padded Mailer", "18.00", 2).await?;

    let err = inventory_service::place_order(
        state,
        &user,
        order_request(&[(tape.id, 5), (mailer.id, 3)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { product_id, .. } if product_id == mailer.id));
    assert_eq!(stock_of(state, tape.id).await?, 20);
    assert_eq!(stock_of(state, mailer.id).await?, 2);
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    let err = inventory_service::place_order(state, &user, order_request(&[(tape.id, 1), (9999, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound { product_id: 9999 }));
    assert_eq!(stock_of(state, tape.id).await?, 20);

    let placed = inventory_service::place_order(
        state,
        &user,
        order_request(&[(tape.id, 5), (mailer.id, 2)]),
    )
    .await?
    .data
    .expect("placed order");
    assert_eq!(placed.total, price("261.00"));
    assert_eq!(stock_of(state, tape.id).await?, 15);
    assert_eq!(stock_of(state, mailer.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = db.state.clone();

    let first = create_user(&state, "user", "first@example.com").await?;
    let second = create_user(&state, "user", "second@example.com").await?;
    let last_box = create_product(&state, "Last Box", "120.00", 1).await?;

    let (a, b) = tokio::join!(
        inventory_service::place_order(&state, &first, order_request(&[(last_box.id, 1)])),
        inventory_service::place_order(&state, &second, order_request(&[(last_box.id, 1)])),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let failure = if a.is_err() { a.err() } else { b.err() };
    assert!(matches!(failure, Some(AppError::InsufficientStock { .. })));
    assert_eq!(stock_of(&state, last_box.id).await?, 0);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn cancelling_restocks_once_and_is_audited() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let admin = create_user(state, "admin", "admin@example.com").await?;
    let product = create_product(state, "Stretch Film", "650.00", 5).await?;

    let placed = inventory_service::place_order(state, &user, order_request(&[(product.id, 4)]))
        .await?
        .data
        .expect("placed order");
    assert_eq!(stock_of(state, product.id).await?, 1);

    let updated = order_service::update_status(
        state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: Some(OrderStatus::Cancelled),
            payment_status: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.status, "cancelled");
    assert_eq!(stock_of(state, product.id).await?, 5);

    // same state again is allowed and must not restock twice
    order_service::update_status(
        state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: Some(OrderStatus::Cancelled),
            payment_status: None,
        },
    )
    .await?;
    assert_eq!(stock_of(state, product.id).await?, 5);

    let restocks = AuditLogs::find()
        .filter(AuditCol::Action.eq("order_restock"))
        .count(&state.orm)
        .await?;
    assert_eq!(restocks, 1);
    Ok(())
}

#[tokio::test]
async fn legacy_mode_recancel_does_not_restock_again() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let mut config = (*db.state.config).clone();
    config.strict_status_transitions = false;
    let state = &AppState::new(db.state.pool.clone(), config);

    let user = create_user(state, "user", "buyer@example.com").await?;
    let admin = create_user(state, "admin", "admin@example.com").await?;
    let product = create_product(state, "Edge Protectors", "35.00", 10).await?;

    let placed = inventory_service::place_order(state, &user, order_request(&[(product.id, 4)]))
        .await?
        .data
        .expect("placed order");
    assert_eq!(stock_of(state, product.id).await?, 6);

    for next in [OrderStatus::Cancelled, OrderStatus::Pending, OrderStatus::Cancelled] {
        order_service::update_status(
            state,
            &admin,
            placed.order_id,
            UpdateOrderStatusRequest {
                status: Some(next),
                payment_status: None,
            },
        )
        .await?;
    }
    assert_eq!(stock_of(state, product.id).await?, 10);

    let order = Orders::find_by_id(placed.order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.status, "cancelled");
    assert!(order.restocked_at.is_some());

    let restocks = AuditLogs::find()
        .filter(AuditCol::Action.eq("order_restock"))
        .count(&state.orm)
        .await?;
    assert_eq!(restocks, 1);
    Ok(())
}

#[tokio::test]
async fn order_total_beyond_money_column_is_rejected() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let pallet = create_product(state, "Warehouse Pallet Lot", "9000000000.00", 5).await?;

    let err = inventory_service::place_order(state, &user, order_request(&[(pallet.id, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(state, pallet.id).await?, 5);

    let placed = inventory_service::place_order(state, &user, order_request(&[(pallet.id, 1)]))
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.total, price("9000000000.00"));
    Ok(())
}

#[tokio::test]
async fn failed_decrement_reports_current_stock() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let tape = create_product(state, "Filament Tape", "95.00", 2).await?;
    let line = LineSnapshot {
        product_id: tape.id,
        product_name: tape.name.clone(),
        price: tape.price,
        quantity: 5,
    };

    match inventory_service::stock_shortfall(&state.orm, &line).await? {
        AppError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    let gone = LineSnapshot {
        product_id: 9999,
        ..line
    };
    assert!(matches!(
        inventory_service::stock_shortfall(&state.orm, &gone).await?,
        AppError::InsufficientStock { available: 0, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn status_changes_follow_the_lifecycle() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let user = create_user(state, "user", "buyer@example.com").await?;
    let admin = create_user(state, "admin", "admin@example.com").await?;
    let product = create_product(state, "Kraft Paper Roll", "240.00", 10).await?;
    let placed = inventory_service::place_order(state, &user, order_request(&[(product.id, 1)]))
        .await?
        .data
        .expect("placed order");

    let move_to = |status| UpdateOrderStatusRequest {
        status: Some(status),
        payment_status: None,
    };

    let err = order_service::update_status(
        state,
        &admin,
        placed.order_id,
        move_to(OrderStatus::Delivered),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        order_service::update_status(state, &admin, placed.order_id, move_to(next)).await?;
    }

    let err = order_service::update_status(
        state,
        &admin,
        placed.order_id,
        move_to(OrderStatus::Cancelled),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(stock_of(state, product.id).await?, 9);

    let paid = order_service::update_status(
        state,
        &admin,
        placed.order_id,
        UpdateOrderStatusRequest {
            status: None,
            payment_status: Some(PaymentStatus::Completed),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(paid.payment_status, "completed");
    assert_eq!(paid.status, "delivered");

    let err = order_service::update_status(
        state,
        &user,
        placed.order_id,
        move_to(OrderStatus::Cancelled),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn order_visibility_and_admin_views() -> anyhow::Result<()> {
    let Some(db) = init_test_db().await? else {
        return Ok(());
    };
    let state = &db.state;

    let alice = create_user(state, "user", "alice@example.com").await?;
    let bob = create_user(state, "user", "bob@example.com").await?;
    let admin = create_user(state, "admin", "admin@example.com").await?;
    let product = create_product(state, "Void Fill Pillows", "150.00", 50).await?;

    let alice_order = inventory_service::place_order(state, &alice, order_request(&[(product.id, 2)]))
        .await?
        .data
        .expect("order");
    inventory_service::place_order(state, &bob, order_request(&[(product.id, 1)])).await?;
    inventory_service::place_order(state, &bob, order_request(&[(product.id, 1)])).await?;

    let err = order_service::get_order(state, &bob, alice_order.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert!(order_service::get_order(state, &admin, alice_order.order_id).await.is_ok());

    let bobs = order_service::list_my_orders(state, &bob)
        .await?
        .data
        .expect("orders");
    assert_eq!(bobs.items.len(), 2);
    assert!(bobs.items[0].order.id > bobs.items[1].order.id, "newest first");

    let err = order_service::list_all_orders(state, &bob, OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let limited = order_service::list_all_orders(
        state,
        &admin,
        OrderListQuery {
            status: Some(OrderStatus::Pending),
            limit: Some(2),
        },
    )
    .await?
    .data
    .expect("orders");
    assert_eq!(limited.items.len(), 2);

    order_service::update_status(
        state,
        &admin,
        alice_order.order_id,
        UpdateOrderStatusRequest {
            status: None,
            payment_status: Some(PaymentStatus::Completed),
        },
    )
    .await?;

    let stats = order_service::get_stats(state, &admin)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.pending_orders, 3);
    assert_eq!(stats.delivered_orders, 0);
    assert_eq!(stats.total_revenue, price("300.00"));
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.active_products, 1);
    Ok(())
}
