use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::announcements::{AnnouncementList, CreateAnnouncementRequest, UpdateAnnouncementRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Announcement,
    response::ApiResponse,
    services::announcement_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_active).post(create_announcement))
        .route("/admin/all", get(list_all))
        .route(
            "/{id}",
            put(update_announcement).delete(delete_announcement),
        )
}

#[utoipa::path(
    get,
    path = "/api/announcements",
    responses(
        (status = 200, description = "Active announcements", body = ApiResponse<AnnouncementList>)
    ),
    tag = "Announcements"
)]
pub async fn list_active(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<AnnouncementList>>> {
    let resp = announcement_service::list_active(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/announcements/admin/all",
    responses(
        (status = 200, description = "All announcements", body = ApiResponse<AnnouncementList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AnnouncementList>>> {
    let resp = announcement_service::list_all(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Announcement created", body = ApiResponse<Announcement>),
        (status = 400, description = "Empty message"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_announcement(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Announcement>>)> {
    let resp = announcement_service::create(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/announcements/{id}",
    params(("id" = i32, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementRequest,
    responses(
        (status = 200, description = "Announcement updated", body = ApiResponse<Announcement>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_announcement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    let resp = announcement_service::update(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = i32, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_announcement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = announcement_service::delete(&state, &user, id).await?;
    Ok(Json(resp))
}
