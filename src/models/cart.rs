use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    database::Record,
    error::{AppError, Result},
    models::{AttributeKind, AttributeOption},
};

pub const MAX_TAG_DATA_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: i32,
    pub session_id: String,
    pub product_id: i32,
    pub certificate_color: Option<String>,
    pub frame_color: Option<String>,
    pub frame_size: Option<String>,
    pub frame_thickness: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for CartLine {
    const TABLE: &'static str = "carts";
}

impl CartLine {
    pub fn choice(&self, kind: AttributeKind) -> Option<&str> {
        match kind {
            AttributeKind::CertificateColor => self.certificate_color.as_deref(),
            AttributeKind::FrameColor => self.frame_color.as_deref(),
            AttributeKind::FrameSize => self.frame_size.as_deref(),
            AttributeKind::FrameThickness => self.frame_thickness.as_deref(),
        }
    }
}

/// A buyer's tag text. Belongs to a cart line until checkout moves it onto
/// the order line; exactly one of the two references is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagSelection {
    pub id: i32,
    pub product_id: i32,
    pub cart_line_id: Option<i32>,
    pub order_line_id: Option<i32>,
    pub tag_name: String,
    pub tag_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for TagSelection {
    const TABLE: &'static str = "tag_selections";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagChoice {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub session_id: String,
    pub product_id: i32,
    pub certificate_color: Option<String>,
    pub frame_color: Option<String>,
    pub frame_size: Option<String>,
    pub frame_thickness: Option<String>,
    #[serde(default)]
    pub tag_options: Vec<TagChoice>,
}

impl AddToCartRequest {
    pub fn choice(&self, kind: AttributeKind) -> Option<&str> {
        let value = match kind {
            AttributeKind::CertificateColor => self.certificate_color.as_deref(),
            AttributeKind::FrameColor => self.frame_color.as_deref(),
            AttributeKind::FrameSize => self.frame_size.as_deref(),
            AttributeKind::FrameThickness => self.frame_thickness.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct CartDetailsResponse {
    pub cart_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub is_digital: bool,
    pub thumbnail: Option<String>,
    pub certificate_color: Option<String>,
    pub frame_color: Option<String>,
    pub frame_size: Option<String>,
    pub frame_thickness: Option<String>,
    pub tags: Vec<TagChoice>,
}

/// Rejects a chosen value that is not one of the product's active options.
/// An absent choice is always accepted.
pub fn validate_choice(
    kind: AttributeKind,
    chosen: Option<&str>,
    offered: &[AttributeOption],
) -> Result<()> {
    let Some(chosen) = chosen else {
        return Ok(());
    };

    if offered.iter().any(|opt| opt.status && opt.name == chosen) {
        return Ok(());
    }

    Err(AppError::BadRequest(format!(
        "{} '{}' is not offered for this product",
        kind.label(),
        chosen
    )))
}

pub fn validate_tags(tags: &[TagChoice]) -> Result<()> {
    for tag in tags {
        if tag.name.trim().is_empty() {
            return Err(AppError::BadRequest("Tag name is required".to_string()));
        }
        if tag.data.chars().count() > MAX_TAG_DATA_LEN {
            return Err(AppError::BadRequest(format!(
                "Tag '{}' is longer than {} characters",
                tag.name, MAX_TAG_DATA_LEN
            )));
        }
    }
    Ok(())
}
