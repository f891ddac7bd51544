use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartItem, CartItemDto, CartList, UpdateCartRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_desc(CartCol::CreatedAt)
        .order_by_desc(CartCol::Id)
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let items: Vec<CartItemDto> = rows
        .into_iter()
        .filter_map(|(item, product)| {
            let product = Product::from(product?);
            Some(CartItemDto {
                id: item.id,
                line_total: product.price * Decimal::from(item.quantity),
                product,
                quantity: item.quantity,
            })
        })
        .collect();
    let subtotal = items.iter().map(|i| i.line_total).sum();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("OK", CartList { items, subtotal }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }
    let product = active_product(state, payload.product_id).await?;

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?;

    let cart_item = match existing {
        Some(item) => {
            let quantity = combined_quantity(item.quantity, payload.quantity)?;
            ensure_stock(&product, quantity)?;
            let mut active: CartActive = item.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?
        }
        None => {
            ensure_stock(&product, payload.quantity)?;
            CartActive {
                id: NotSet,
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": cart_item.product_id, "quantity": cart_item.quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        "OK",
        CartItem {
            id: cart_item.id,
            product_id: cart_item.product_id,
            quantity: cart_item.quantity,
        },
        None,
    ))
}

/// Set the quantity of a cart line; zero or less removes it.
pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.quantity <= 0 {
        return remove_from_cart(state, user, product_id).await;
    }

    let item = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = active_product(state, product_id).await?;
    ensure_stock(&product, payload.quantity)?;

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Cart updated",
        serde_json::json!({ "productId": item.product_id, "quantity": item.quantity }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

async fn active_product(state: &AppState, product_id: i32) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::ProductNotFound { product_id })
}

fn combined_quantity(current: i32, added: i32) -> AppResult<i32> {
    current
        .checked_add(added)
        .ok_or_else(|| AppError::Validation("quantity is too large".to_string()))
}

fn ensure_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if quantity > product.stock {
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            product_name: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_to_a_line_never_overflows() {
        assert_eq!(combined_quantity(2, 3).unwrap(), 5);
        assert!(matches!(
            combined_quantity(1, i32::MAX),
            Err(AppError::Validation(_))
        ));
    }
}
