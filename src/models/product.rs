use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::database::Record;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub product_name: String,
    pub url_name: Option<String>,
    pub offer_price: Option<Decimal>,
    pub price: Decimal,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub care_instructions: Option<String>,
    pub delivery_info: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_desc: Option<String>,
    pub status: bool,
    pub priority: i32,
    pub product_type: Option<String>,
    pub product_trading_type: Option<String>,
    pub product_category: Option<String>,
    pub is_digital: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Product {
    const TABLE: &'static str = "products";
}

impl Product {
    /// Price a buyer pays: the offer price when one is set, else the list price.
    pub fn effective_price(&self) -> Decimal {
        match self.offer_price {
            Some(offer) if offer > Decimal::ZERO => offer,
            _ => self.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub image: String,
    pub status: String,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ProductImage {
    const TABLE: &'static str = "product_images";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub user_name: String,
    pub title: Option<String>,
    pub review: Option<String>,
    pub rating: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Review {
    const TABLE: &'static str = "product_ratings";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewImage {
    pub id: i32,
    pub product_rating_id: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ReviewImage {
    const TABLE: &'static str = "product_review_images";
}

/// Review with its image paths aggregated, as listed on product pages.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i32,
    pub product_id: i32,
    pub user_name: String,
    pub title: Option<String>,
    pub review: Option<String>,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub review_images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub user_name: String,
    pub title: Option<String>,
    pub review: Option<String>,
    pub rating: i32,
    pub created_at: String,
    pub review_images: Vec<String>,
}

impl From<ReviewRow> for ReviewResponse {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            user_name: row.user_name,
            title: row.title,
            review: row.review,
            rating: row.rating,
            created_at: row.created_at.format("%b %d, %Y").to_string(),
            review_images: row.review_images,
        }
    }
}

/// The four per-product option lists a buyer picks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    CertificateColor,
    FrameColor,
    FrameSize,
    FrameThickness,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::CertificateColor,
        AttributeKind::FrameColor,
        AttributeKind::FrameSize,
        AttributeKind::FrameThickness,
    ];

    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::CertificateColor => "certificate_colors",
            AttributeKind::FrameColor => "frame_colors",
            AttributeKind::FrameSize => "frame_sizes",
            AttributeKind::FrameThickness => "frame_thicknesses",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::CertificateColor => "Certificate color",
            AttributeKind::FrameColor => "Frame color",
            AttributeKind::FrameSize => "Frame size",
            AttributeKind::FrameThickness => "Frame thickness",
        }
    }

    /// Resolves the two path segments used by the routes, e.g. `frame/color`.
    pub fn from_segments(group: &str, attribute: &str) -> Option<Self> {
        match (group, attribute) {
            ("certificate", "color") => Some(AttributeKind::CertificateColor),
            ("frame", "color") => Some(AttributeKind::FrameColor),
            ("frame", "size") => Some(AttributeKind::FrameSize),
            ("frame", "thickness") => Some(AttributeKind::FrameThickness),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttributeOption {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub status: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagOption {
    pub id: i32,
    pub product_id: i32,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub priority: i32,
    pub tag_optional: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for TagOption {
    const TABLE: &'static str = "product_tag_options";
}

#[derive(Debug, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub product_images: Vec<ProductImage>,
    pub product_ratings: Vec<Review>,
    pub product_tag_options: Vec<TagOption>,
    pub certificate_colors: Vec<AttributeOption>,
    pub frame_colors: Vec<AttributeOption>,
    pub frame_size: Vec<AttributeOption>,
    pub frame_thickness: Vec<AttributeOption>,
}

/// Product fields collected from the admin's multipart form.
#[derive(Debug, Default)]
pub struct NewProduct {
    pub product_name: String,
    pub url_name: String,
    pub offer_price: Option<Decimal>,
    pub price: Decimal,
    pub thumbnail: String,
    pub description: String,
    pub care_instructions: Option<String>,
    pub delivery_info: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_desc: Option<String>,
    pub status: bool,
    pub priority: i32,
    pub product_type: Option<String>,
    pub product_category: Option<String>,
    pub is_digital: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductQuery {
    pub product_id: i32,
    pub description: Option<String>,
    pub delivery_info: Option<String>,
    pub care_instructions: Option<String>,
    pub offer_price: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub product_type: Option<String>,
    pub search_name: Option<String>,
    pub product_category_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductIdQuery {
    pub product_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttributeListQuery {
    pub product_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AttributeOptionRequest {
    pub name: String,
    pub status: bool,
    pub priority: Option<i32>,
    pub product_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct TagOptionRequest {
    pub product_id: i32,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub priority: i32,
    pub tag_optional: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_route_segments() {
        assert_eq!(
            AttributeKind::from_segments("frame", "thickness"),
            Some(AttributeKind::FrameThickness)
        );
        assert_eq!(
            AttributeKind::from_segments("certificate", "color"),
            Some(AttributeKind::CertificateColor)
        );
        assert_eq!(AttributeKind::from_segments("certificate", "size"), None);
    }

    #[test]
    fn every_kind_has_its_own_table() {
        let tables: std::collections::HashSet<_> =
            AttributeKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables.len(), AttributeKind::ALL.len());
    }
}
