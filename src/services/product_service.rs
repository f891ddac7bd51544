use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};

use crate::{
    audit,
    dto::products::{ProductForm, ProductList},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSort},
    state::AppState,
};

/// Which rows a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Storefront,
    Admin,
}

pub fn sort_order(sort: ProductSort) -> (Column, Order) {
    match sort {
        ProductSort::PriceAsc => (Column::Price, Order::Asc),
        ProductSort::PriceDesc => (Column::Price, Order::Desc),
        ProductSort::NameAsc => (Column::Name, Order::Asc),
        ProductSort::NameDesc => (Column::Name, Order::Desc),
        ProductSort::Newest => (Column::CreatedAt, Order::Desc),
        ProductSort::IdDesc => (Column::Id, Order::Desc),
    }
}

/// Escape LIKE wildcards so user input is matched literally.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn filtered(query: &ProductQuery, visibility: Visibility) -> Select<Products> {
    let mut condition = Condition::all();

    if visibility == Visibility::Storefront {
        condition = condition.add(Column::IsActive.eq(true));
    }

    if let Some(category) = query.category_label() {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(search) = query.search_term() {
        let pattern = like_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort = query.sort.unwrap_or_default();
    let (sort_col, order) = sort_order(sort);
    let mut finder = Products::find().filter(condition).order_by(sort_col, order);
    if sort != ProductSort::IdDesc {
        // id breaks ties so identical queries return identical pages
        finder = finder.order_by_desc(Column::Id);
    }
    finder
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
    visibility: Visibility,
) -> AppResult<ApiResponse<ProductList>> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::Validation("minPrice is greater than maxPrice".into()));
        }
    }
    let (page, limit, offset) = query.pagination().normalize();
    let finder = filtered(&query, visibility);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    list_products(state, query, Visibility::Admin).await
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    form: ProductForm,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let (new, image) = form.into_new_product()?;

    let image_url = match image {
        Some(upload) => Some(state.images.save(&upload.file_name, &upload.bytes).await?),
        None => None,
    };

    let active = ActiveModel {
        id: NotSet,
        name: Set(new.name),
        description: Set(new.description),
        price: Set(new.price),
        category: Set(new.category),
        stock: Set(new.stock),
        is_active: Set(new.is_active),
        image_url: Set(image_url.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = match active.insert(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            state.images.discard(image_url.as_deref()).await;
            return Err(err.into());
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    form: ProductForm,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let (changes, image) = form.into_changes()?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let old_image = existing.image_url.clone();

    let mut active: ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description).filter(|d| !d.is_empty()));
    }
    if let Some(price) = changes.price {
        active.price = Set(price);
    }
    if let Some(category) = changes.category {
        active.category = Set(Some(category).filter(|c| !c.is_empty()));
    }
    if let Some(stock) = changes.stock {
        active.stock = Set(stock);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    let new_image = match image {
        Some(upload) => Some(state.images.save(&upload.file_name, &upload.bytes).await?),
        None => None,
    };
    if let Some(url) = &new_image {
        active.image_url = Set(Some(url.clone()));
    }
    active.updated_at = Set(Utc::now().into());

    let product = match active.update(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            state.images.discard(new_image.as_deref()).await;
            return Err(err.into());
        }
    };
    if new_image.is_some() {
        state.images.discard(old_image.as_deref()).await;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product.into(),
        Some(Meta::empty()),
    ))
}
