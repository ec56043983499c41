use std::sync::Arc;

use askama::Template;
use chrono::{DateTime, Duration, Local, Utc};

use crate::{
    error::{AppError, Result},
    models::OrderSummary,
    services::{
        checkout::CheckoutStore, render_service::DocumentRenderer, storage_service::ObjectStore,
    },
};

pub const ORDER_CONFIRMATION_SUBJECT: &str = "Order Confirmation";

#[derive(Template)]
#[template(path = "order_summary.html")]
struct OrderSummaryHtml<'a> {
    data: &'a OrderSummary,
    delivery_date: &'a str,
    day_name: &'a str,
}

/// Expected delivery date as `(YYYY-MM-DD, weekday name)`.
pub fn delivery_estimate(now: DateTime<Local>, days: i64) -> (String, String) {
    let date = now + Duration::days(days);
    (
        date.format("%Y-%m-%d").to_string(),
        date.format("%A").to_string(),
    )
}

/// Renders the order summary page used for both the e-mail and the invoice.
pub fn render_order_summary(
    summary: &OrderSummary,
    now: DateTime<Local>,
    delivery_days: i64,
) -> Result<String> {
    let (delivery_date, day_name) = delivery_estimate(now, delivery_days);

    OrderSummaryHtml {
        data: summary,
        delivery_date: &delivery_date,
        day_name: &day_name,
    }
    .render()
    .map_err(|e| AppError::InternalError(format!("Failed to render order summary: {}", e)))
}

pub fn invoice_key(now: DateTime<Utc>) -> String {
    format!("invoice/order_invoice_{}.pdf", now.format("%Y%m%d%H%M%S"))
}

pub struct InvoiceService {
    renderer: Arc<dyn DocumentRenderer>,
    objects: Arc<dyn ObjectStore>,
    orders: Arc<dyn CheckoutStore>,
    delivery_days: i64,
}

impl InvoiceService {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        objects: Arc<dyn ObjectStore>,
        orders: Arc<dyn CheckoutStore>,
        delivery_days: i64,
    ) -> Self {
        Self {
            renderer,
            objects,
            orders,
            delivery_days,
        }
    }

    pub fn delivery_days(&self) -> i64 {
        self.delivery_days
    }

    /// Renders, uploads and records the invoice PDF. Returns its URL.
    pub async fn publish(&self, summary: &OrderSummary) -> Result<String> {
        let html = render_order_summary(summary, Local::now(), self.delivery_days)?;
        let pdf = self.renderer.html_to_pdf(&html).await?;

        let key = invoice_key(Utc::now());
        let url = self.objects.put(&key, pdf, "application/pdf").await?;

        self.orders.attach_invoice(&summary.txn_id, &url).await?;

        tracing::info!("Invoice for order {} stored at {}", summary.txn_id, url);
        Ok(url)
    }
}
