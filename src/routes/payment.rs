use axum::{Json, Router, routing::post};

use crate::{
    dto::payment::{VerifyPaymentRequest, VerifyPaymentResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify_payment))
}

#[utoipa::path(
    post,
    path = "/api/payment/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = ApiResponse<VerifyPaymentResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn verify_payment(
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<VerifyPaymentResponse>>> {
    let resp = payment_service::verify_payment(&user, payload).await?;
    Ok(Json(resp))
}
