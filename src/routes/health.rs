use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
}

impl HealthData {
    pub fn new(database_up: bool) -> Self {
        Self {
            status: "ok".to_string(),
            database: if database_up { "up" } else { "down" }.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let database_up = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    if !database_up {
        tracing::warn!("health check could not reach the database");
    }

    Json(ApiResponse::success(
        "Health check",
        HealthData::new(database_up),
        Some(Meta::empty()),
    ))
}
