use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ShippingDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingDetails {
    /// Trim every field and reject blanks.
    pub fn normalized(self) -> Result<Self, AppError> {
        Ok(Self {
            name: required("name", self.name)?,
            phone: required("phone", self.phone)?,
            address: required("address", self.address)?,
            city: required("city", self.city)?,
            state: required("state", self.state)?,
            pincode: required("pincode", self.pincode)?,
        })
    }
}

fn required(label: &str, value: String) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!(
            "shippingDetails.{label} is required"
        )));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_details: ShippingDetails,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: i32,
    #[schema(value_type = String, example = "897.00")]
    pub total: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    #[schema(value_type = String, example = "12450.00")]
    pub total_revenue: Decimal,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    pub total_users: i64,
    pub active_products: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            name: " Asha ".into(),
            phone: "9876543210".into(),
            address: "12 MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            pincode: "411001".into(),
        }
    }

    #[test]
    fn shipping_is_trimmed() {
        let s = shipping().normalized().unwrap();
        assert_eq!(s.name, "Asha");
        assert_eq!(s.pincode, "411001");
    }

    #[test]
    fn blank_shipping_field_is_named() {
        let mut s = shipping();
        s.city = "  ".into();
        match s.normalized() {
            Err(AppError::Validation(msg)) => assert!(msg.contains("city")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn request_uses_camel_case() {
        let body = serde_json::json!({
            "items": [{ "productId": 4, "quantity": 2 }],
            "shippingDetails": {
                "name": "A", "phone": "1", "address": "x",
                "city": "c", "state": "s", "pincode": "1"
            },
            "paymentMethod": "cod"
        });
        let req: PlaceOrderRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.items[0].product_id, 4);
        assert_eq!(req.payment_method, PaymentMethod::Cod);
    }
}
