use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::{AppError, Result},
    models::{
        Order, OrderDetailsResponse, OrderLine, OrderListItem, OrderStatus, OrderStatusEntry,
        Product, ShippingAddress, StatusHistoryItem, TagSelection, TransitionPolicy, User,
    },
    services::checkout::{SummaryLine, build_summary},
};

pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderListItem>> {
    let orders = sqlx::query_as::<_, OrderListItem>(
        "SELECT o.id, o.txn_id, o.user_id, u.username, o.total_amount, o.paid_amount,
                o.invoice, s.order_status AS current_status, o.created_at
         FROM orders o
         JOIN users u ON u.id = o.user_id
         LEFT JOIN LATERAL (
             SELECT order_status FROM order_status
             WHERE order_id = o.id
             ORDER BY created_at DESC, id DESC
             LIMIT 1
         ) s ON TRUE
         ORDER BY o.created_at DESC, o.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

const HISTORY_SQL: &str =
    "SELECT * FROM order_status WHERE order_id = $1 ORDER BY created_at DESC, id DESC";

/// Status rows of an order, most recent first.
pub async fn status_history(pool: &PgPool, order_id: i32) -> Result<Vec<OrderStatusEntry>> {
    let entries = sqlx::query_as::<_, OrderStatusEntry>(HISTORY_SQL)
        .bind(order_id)
        .fetch_all(pool)
        .await?;

    Ok(entries)
}

/// The status rows of one order, seen from inside a transaction.
#[async_trait]
pub trait StatusLog: Send {
    /// Locks the order and returns its buyer, `None` when it does not exist.
    async fn lock_order(&mut self, order_id: i32) -> Result<Option<i32>>;

    /// Most recent first.
    async fn history(&mut self, order_id: i32) -> Result<Vec<OrderStatusEntry>>;

    async fn insert(&mut self, order_id: i32, user_id: i32, status: &str) -> Result<OrderStatusEntry>;
}

struct PgStatusLog {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StatusLog for PgStatusLog {
    async fn lock_order(&mut self, order_id: i32) -> Result<Option<i32>> {
        let user_id = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user_id)
    }

    async fn history(&mut self, order_id: i32) -> Result<Vec<OrderStatusEntry>> {
        let entries = sqlx::query_as::<_, OrderStatusEntry>(HISTORY_SQL)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(entries)
    }

    async fn insert(&mut self, order_id: i32, user_id: i32, status: &str) -> Result<OrderStatusEntry> {
        let entry = sqlx::query_as::<_, OrderStatusEntry>(
            "INSERT INTO order_status (order_id, user_id, order_status) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry)
    }
}

/// Checks `next` against the current status and appends it.
pub async fn record_status(
    log: &mut dyn StatusLog,
    order_id: i32,
    next: &OrderStatus,
    policy: TransitionPolicy,
) -> Result<OrderStatusEntry> {
    let user_id = log
        .lock_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let current = log
        .history(order_id)
        .await?
        .first()
        .map(|entry| OrderStatus::parse(&entry.order_status));

    policy.check(order_id, current.as_ref(), next)?;

    let entry = log.insert(order_id, user_id, next.as_str()).await?;
    tracing::info!("Order {} moved to status {}", order_id, next);
    Ok(entry)
}

/// Appends a status row. Rows are never updated; the newest one is current.
pub async fn append_status(
    pool: &PgPool,
    order_id: i32,
    next: &OrderStatus,
    policy: TransitionPolicy,
) -> Result<OrderStatusEntry> {
    let mut log = PgStatusLog {
        tx: pool.begin().await?,
    };

    let entry = record_status(&mut log, order_id, next, policy).await?;
    log.tx.commit().await?;

    Ok(entry)
}

/// Rebuilds the order summary from stored rows for the details page.
pub async fn order_details(
    pool: &PgPool,
    txn_id: &str,
    image_url: &str,
    web_url: &str,
) -> Result<OrderDetailsResponse> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE txn_id = $1 ORDER BY id LIMIT 1")
        .bind(txn_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(order.user_id)
        .fetch_one(pool)
        .await?;

    let address = sqlx::query_as::<_, ShippingAddress>(
        "SELECT * FROM user_shipping_address WHERE id = $1",
    )
    .bind(order.shipping_address_id)
    .fetch_one(pool)
    .await?;

    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT * FROM order_details WHERE order_id = $1 ORDER BY id",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    let line_ids: Vec<i32> = lines.iter().map(|l| l.id).collect();
    let product_ids: Vec<i32> = lines.iter().map(|l| l.product_id).collect();

    let products: HashMap<i32, Product> =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(&product_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

    let mut tags: HashMap<i32, Vec<TagSelection>> = HashMap::new();
    let selections = sqlx::query_as::<_, TagSelection>(
        "SELECT * FROM tag_selections WHERE order_line_id = ANY($1) ORDER BY id",
    )
    .bind(&line_ids)
    .fetch_all(pool)
    .await?;
    for selection in selections {
        if let Some(line_id) = selection.order_line_id {
            tags.entry(line_id).or_default().push(selection);
        }
    }

    let mut summary_lines = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = products.get(&line.product_id).ok_or_else(|| {
            AppError::NotFound(format!("Product {} not found", line.product_id))
        })?;
        summary_lines.push(SummaryLine {
            line,
            product,
            tags: tags.get(&line.id).map(Vec::as_slice).unwrap_or_default(),
        });
    }

    let summary = build_summary(&order, &user, &address, &summary_lines, image_url, web_url);
    let history = status_history(pool, order.id).await?;

    Ok(OrderDetailsResponse {
        summary,
        order_status: history.iter().map(StatusHistoryItem::from).collect(),
        invoice_url: order.invoice,
    })
}
