//! Postgres side of the checkout workflow. Every write of one checkout goes
//! through a single `sqlx::Transaction`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::{AppError, Result},
    models::{
        CartLine, Job, NewOrder, NewOrderLine, NewPayment, NewShippingAddress, NewUser, Order,
        OrderLine, OrderStatusEntry, PaymentRecord, Product, ShippingAddress, TagSelection, User,
    },
    services::checkout::{CheckoutStore, CheckoutTx},
};

#[derive(Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCheckoutTx { tx }))
    }

    async fn find_order_by_payment_ref(&self, payment_id: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_ref = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    async fn attach_invoice(&self, txn_id: &str, url: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET invoice = $1, updated_at = NOW() WHERE txn_id = $2",
        )
        .bind(url)
        .bind(txn_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order not found".to_string()));
        }

        Ok(())
    }
}

pub struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

fn persistence(what: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        tracing::error!("Checkout failed to {}: {:?}", what, e);
        AppError::PersistenceError(e.to_string())
    }
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn lock(&mut self, key: &str) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_order_by_payment_ref(&mut self, payment_id: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_ref = $1")
            .bind(payment_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(order)
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, phone, password) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(persistence("create user"))
    }

    async fn insert_shipping_address(
        &mut self,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress> {
        sqlx::query_as::<_, ShippingAddress>(
            "INSERT INTO user_shipping_address
                (user_id, user_email, user_fname, user_lname, user_address, city, landmark,
                 state, pincode, country, contact_mobile)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(address.user_id)
        .bind(&address.user_email)
        .bind(&address.user_fname)
        .bind(&address.user_lname)
        .bind(&address.user_address)
        .bind(&address.city)
        .bind(&address.landmark)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(&address.country)
        .bind(&address.contact_mobile)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(persistence("store the shipping address"))
    }

    async fn claim_cart_lines(&mut self, session_id: &str) -> Result<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT * FROM carts WHERE session_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(session_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(lines)
    }

    async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(products)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>> {
        sqlx::query_as::<_, Order>(
            "INSERT INTO orders
                (user_id, shipping_address_id, txn_id, payment_ref, sub_total, c_gst, s_gst,
                 shipping_fee, total_amount, paid_amount)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (payment_ref) DO NOTHING
             RETURNING *",
        )
        .bind(order.user_id)
        .bind(order.shipping_address_id)
        .bind(&order.txn_id)
        .bind(&order.payment_ref)
        .bind(order.sub_total)
        .bind(order.c_gst)
        .bind(order.s_gst)
        .bind(order.shipping_fee)
        .bind(order.total_amount)
        .bind(order.paid_amount)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("create the order"))
    }

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> Result<OrderLine> {
        sqlx::query_as::<_, OrderLine>(
            "INSERT INTO order_details
                (order_id, user_id, product_id, quantity, amount, certificate_color,
                 frame_color, frame_size, frame_thickness)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(line.order_id)
        .bind(line.user_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.amount)
        .bind(&line.certificate_color)
        .bind(&line.frame_color)
        .bind(&line.frame_size)
        .bind(&line.frame_thickness)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(persistence("create an order line"))
    }

    async fn move_tag_selections(
        &mut self,
        cart_line_id: i32,
        order_line_id: i32,
    ) -> Result<Vec<TagSelection>> {
        let tags = sqlx::query_as::<_, TagSelection>(
            "UPDATE tag_selections
             SET cart_line_id = NULL, order_line_id = $2, updated_at = NOW()
             WHERE cart_line_id = $1
             RETURNING *",
        )
        .bind(cart_line_id)
        .bind(order_line_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(persistence("move tag selections"))?;

        Ok(tags)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentRecord> {
        sqlx::query_as::<_, PaymentRecord>(
            "INSERT INTO payment_details
                (order_id, user_id, payment_id, payment_amount, payment_status, payment_response)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(payment.order_id)
        .bind(payment.user_id)
        .bind(&payment.payment_id)
        .bind(payment.payment_amount)
        .bind(&payment.payment_status)
        .bind(&payment.payment_response)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(persistence("store the payment"))
    }

    async fn append_order_status(
        &mut self,
        order_id: i32,
        user_id: i32,
        status: &str,
    ) -> Result<OrderStatusEntry> {
        sqlx::query_as::<_, OrderStatusEntry>(
            "INSERT INTO order_status (order_id, user_id, order_status) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(persistence("record the order status"))
    }

    async fn delete_cart_lines(&mut self, session_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn enqueue_job(&mut self, job: &Job, max_attempts: i32) -> Result<()> {
        sqlx::query("INSERT INTO jobs (kind, payload, max_attempts) VALUES ($1, $2, $3)")
            .bind(job.kind())
            .bind(job.payload()?)
            .bind(max_attempts)
            .execute(&mut *self.tx)
            .await
            .map_err(persistence("queue a job"))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
