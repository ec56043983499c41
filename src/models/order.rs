use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{database::Record, models::TagChoice};

// DB models

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub shipping_address_id: i32,
    pub txn_id: String,
    pub payment_ref: String,
    pub sub_total: Decimal,
    pub c_gst: Decimal,
    pub s_gst: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub invoice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Order {
    const TABLE: &'static str = "orders";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub amount: Decimal,
    pub certificate_color: String,
    pub frame_color: String,
    pub frame_size: String,
    pub frame_thickness: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for OrderLine {
    const TABLE: &'static str = "order_details";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderStatusEntry {
    pub id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub order_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for OrderStatusEntry {
    const TABLE: &'static str = "order_status";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub payment_id: String,
    /// Minor currency units, as reported by the gateway.
    pub payment_amount: i64,
    pub payment_status: String,
    pub payment_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PaymentRecord {
    const TABLE: &'static str = "payment_details";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingAddress {
    pub id: i32,
    pub user_id: i32,
    pub user_email: String,
    pub user_fname: String,
    pub user_lname: String,
    pub user_address: String,
    pub city: String,
    pub landmark: Option<String>,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub contact_mobile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ShippingAddress {
    const TABLE: &'static str = "user_shipping_address";
}

/// Admin order listing row with the latest status attached.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderListItem {
    pub id: i32,
    pub txn_id: String,
    pub user_id: i32,
    pub username: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub invoice: Option<String>,
    pub current_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Insert types

#[derive(Debug, Clone)]
pub struct NewShippingAddress {
    pub user_id: i32,
    pub user_email: String,
    pub user_fname: String,
    pub user_lname: String,
    pub user_address: String,
    pub city: String,
    pub landmark: Option<String>,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub contact_mobile: String,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub shipping_address_id: i32,
    pub txn_id: String,
    pub payment_ref: String,
    pub sub_total: Decimal,
    pub c_gst: Decimal,
    pub s_gst: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub order_id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub amount: Decimal,
    pub certificate_color: String,
    pub frame_color: String,
    pub frame_size: String,
    pub frame_thickness: String,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i32,
    pub user_id: i32,
    pub payment_id: String,
    pub payment_amount: i64,
    pub payment_status: String,
    pub payment_response: serde_json::Value,
}

// Request types

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub username: String,
    pub phone: String,
    pub email: Option<String>,
    pub user_email: String,
    pub user_fname: String,
    pub user_lname: String,
    pub user_address: String,
    pub city: String,
    pub landmark: Option<String>,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub contact_mobile: String,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub payment_id: String,
}

impl CheckoutRequest {
    pub fn shipping_address(&self, user_id: i32) -> NewShippingAddress {
        NewShippingAddress {
            user_id,
            user_email: self.user_email.clone(),
            user_fname: self.user_fname.clone(),
            user_lname: self.user_lname.clone(),
            user_address: self.user_address.clone(),
            city: self.city.clone(),
            landmark: self.landmark.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
            country: self.country.clone(),
            contact_mobile: self.contact_mobile.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderQuery {
    pub total_amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub order_status: String,
}

// Response types

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub order_id: i32,
    pub replayed: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub message: String,
    pub razorpay_order: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryUser {
    pub id: i32,
    pub username: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryAddress {
    pub user_email: String,
    pub full_name: String,
    pub user_fname: String,
    pub user_lname: String,
    pub user_address: String,
    pub city: String,
    pub landmark: Option<String>,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub contact_mobile: String,
}

impl From<&ShippingAddress> for SummaryAddress {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            user_email: address.user_email.clone(),
            full_name: format!("{} {}", address.user_fname, address.user_lname),
            user_fname: address.user_fname.clone(),
            user_lname: address.user_lname.clone(),
            user_address: address.user_address.clone(),
            city: address.city.clone(),
            landmark: address.landmark.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            country: address.country.clone(),
            contact_mobile: address.contact_mobile.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryProduct {
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub is_digital: bool,
    pub thumbnail: Option<String>,
    pub thumbnail_url: String,
    pub certificate_color: String,
    pub frame_color: String,
    pub frame_size: String,
    pub frame_thickness: String,
    pub tags: Vec<TagChoice>,
}

/// Denormalised snapshot of a placed order, shared by the confirmation
/// e-mail, the invoice and the order details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: i32,
    pub txn_id: String,
    pub user: SummaryUser,
    pub shipping_address: SummaryAddress,
    pub products: Vec<SummaryProduct>,
    pub sub_total: Decimal,
    pub c_gst: Decimal,
    pub s_gst: Decimal,
    pub total_amount: Decimal,
    /// Total without shipping.
    pub amount: Decimal,
    pub shipping_fee: Decimal,
    pub paid_amount: Decimal,
    #[serde(rename = "WEB_URL")]
    pub tracking_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusHistoryItem {
    pub title: String,
    pub description: String,
}

impl From<&OrderStatusEntry> for StatusHistoryItem {
    fn from(entry: &OrderStatusEntry) -> Self {
        Self {
            title: entry.order_status.clone(),
            description: entry.created_at.format("%d/%m/%Y").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsResponse {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub order_status: Vec<StatusHistoryItem>,
    pub invoice_url: Option<String>,
}
