//! Placeholder payment verification. Every request is reported as verified; a real
//! gateway integration replaces this module.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::payment::{VerifyPaymentRequest, VerifyPaymentResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
};

pub async fn verify_payment(
    user: &AuthUser,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<VerifyPaymentResponse>> {
    let transaction_id = transaction_id();
    tracing::info!(
        user_id = user.user_id,
        order_id = ?payload.order_id,
        method = ?payload.payment_method,
        %transaction_id,
        "payment verification stubbed"
    );

    Ok(ApiResponse::success(
        "Payment verified",
        VerifyPaymentResponse {
            verified: true,
            transaction_id,
            order_id: payload.order_id,
        },
        Some(Meta::empty()),
    ))
}

fn transaction_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "TXN{}{}",
        Utc::now().timestamp_millis(),
        random[..8].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_always_verifies() {
        let user = AuthUser {
            user_id: 5,
            role: "user".into(),
        };
        let resp = verify_payment(
            &user,
            VerifyPaymentRequest {
                order_id: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let data = resp.data.unwrap();
        assert!(data.verified);
        assert_eq!(data.order_id, Some(12));
        assert!(data.transaction_id.starts_with("TXN"));
    }

    #[test]
    fn transaction_ids_are_unique() {
        assert_ne!(transaction_id(), transaction_id());
    }
}
