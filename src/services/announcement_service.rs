use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::{
    audit,
    dto::announcements::{AnnouncementList, CreateAnnouncementRequest, UpdateAnnouncementRequest},
    entity::announcements::{ActiveModel, Column, Entity as Announcements},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Announcement,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_active(state: &AppState) -> AppResult<ApiResponse<AnnouncementList>> {
    let items = Announcements::find()
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Announcement::from)
        .collect();
    Ok(ApiResponse::success("Announcements", AnnouncementList { items }, None))
}

pub async fn list_all(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AnnouncementList>> {
    ensure_admin(user)?;
    let items = Announcements::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Announcement::from)
        .collect();
    Ok(ApiResponse::success("Announcements", AnnouncementList { items }, None))
}

pub async fn create(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAnnouncementRequest,
) -> AppResult<ApiResponse<Announcement>> {
    ensure_admin(user)?;
    let message = required_message(&payload.message)?;
    let announcement = ActiveModel {
        id: NotSet,
        message: Set(message),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "announcement_create",
        "announcements",
        serde_json::json!({ "announcement_id": announcement.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Announcement created",
        announcement.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateAnnouncementRequest,
) -> AppResult<ApiResponse<Announcement>> {
    ensure_admin(user)?;
    let existing = Announcements::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(message) = payload.message {
        active.message = Set(required_message(&message)?);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let announcement = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Announcement updated",
        announcement.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Announcements::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "announcement_delete",
        "announcements",
        serde_json::json!({ "announcement_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Announcement deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn required_message(message: &str) -> AppResult<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message is required".into()));
    }
    Ok(message.to_string())
}
