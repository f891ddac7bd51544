use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{Product, money_fits},
};

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Uploaded file pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw multipart fields for product create/update. Every field is optional here;
/// [`ProductForm::into_new_product`] enforces what a create requires.
#[derive(Debug, Default, Clone)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub stock: Option<String>,
    pub is_active: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub stock: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductForm {
    pub fn set_text(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = Some(value),
            "description" => self.description = Some(value),
            "price" => self.price = Some(value),
            "category" => self.category = Some(value),
            "stock" => self.stock = Some(value),
            "is_active" | "isActive" => self.is_active = Some(value),
            _ => {}
        }
    }

    pub fn into_new_product(self) -> Result<(NewProduct, Option<ImageUpload>), AppError> {
        let name = non_blank(self.name)
            .ok_or_else(|| AppError::Validation("name is required".into()))?;
        let price = match non_blank(self.price) {
            Some(raw) => parse_price(&raw)?,
            None => return Err(AppError::Validation("price is required".into())),
        };
        let stock = match non_blank(self.stock) {
            Some(raw) => parse_stock(&raw)?,
            None => 0,
        };
        let is_active = match non_blank(self.is_active) {
            Some(raw) => parse_bool(&raw)?,
            None => true,
        };
        Ok((
            NewProduct {
                name,
                description: non_blank(self.description),
                price,
                category: non_blank(self.category),
                stock,
                is_active,
            },
            self.image,
        ))
    }

    pub fn into_changes(self) -> Result<(ProductChanges, Option<ImageUpload>), AppError> {
        let name = match self.name {
            Some(raw) if raw.trim().is_empty() => {
                return Err(AppError::Validation("name cannot be empty".into()));
            }
            other => other.map(|n| n.trim().to_string()),
        };
        let changes = ProductChanges {
            name,
            description: self.description.map(|d| d.trim().to_string()),
            price: non_blank(self.price).map(|raw| parse_price(&raw)).transpose()?,
            category: self.category.map(|c| c.trim().to_string()),
            stock: non_blank(self.stock).map(|raw| parse_stock(&raw)).transpose()?,
            is_active: non_blank(self.is_active)
                .map(|raw| parse_bool(&raw))
                .transpose()?,
        };
        Ok((changes, self.image))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_price(raw: &str) -> Result<Decimal, AppError> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("price `{raw}` is not a number")))?;
    if price.is_sign_negative() {
        return Err(AppError::Validation("price cannot be negative".into()));
    }
    let price = price.round_dp(2);
    if !money_fits(price) {
        return Err(AppError::Validation(format!("price `{raw}` is too large")));
    }
    Ok(price)
}

fn parse_stock(raw: &str) -> Result<i32, AppError> {
    let stock: i32 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("stock `{raw}` is not an integer")))?;
    if stock < 0 {
        return Err(AppError::Validation("stock cannot be negative".into()));
    }
    Ok(stock)
}

fn parse_bool(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::Validation(format!("`{raw}` is not a boolean"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    Archived,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProductResponse {
    pub product_id: i32,
    pub outcome: DeleteOutcome,
}
