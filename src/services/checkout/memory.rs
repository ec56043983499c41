//! In-memory store behind the checkout and job traits.
//!
//! A transaction holds the store's mutex for its whole life and works on a
//! copy of the state. `commit` writes the copy back and dropping the
//! transaction throws it away.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, Result},
    models::{
        CartLine, Job, JobStatus, NewOrder, NewOrderLine, NewPayment, NewShippingAddress, NewUser,
        Order, OrderLine, OrderStatusEntry, PaymentRecord, Product, QueuedJob, ShippingAddress,
        TagSelection, User, UserRole, UserStatus,
    },
    services::{
        checkout::{CheckoutStore, CheckoutTx},
        job_service::JobStore,
    },
};

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    next_id: i32,
    pub users: Vec<User>,
    pub addresses: Vec<ShippingAddress>,
    pub products: Vec<Product>,
    pub carts: Vec<CartLine>,
    pub tags: Vec<TagSelection>,
    pub orders: Vec<Order>,
    pub lines: Vec<OrderLine>,
    pub payments: Vec<PaymentRecord>,
    pub statuses: Vec<OrderStatusEntry>,
    pub jobs: Vec<QueuedJob>,
    pub locks: Vec<String>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn add_product(&self, name: &str, price: i64) -> Product {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let product = Product {
            id: state.next_id(),
            product_name: name.to_string(),
            url_name: None,
            offer_price: None,
            price: Decimal::from(price),
            thumbnail: Some(format!("products/{}.png", name.to_lowercase())),
            description: None,
            care_instructions: None,
            delivery_info: None,
            meta_title: None,
            meta_keywords: None,
            meta_desc: None,
            status: true,
            priority: 0,
            product_type: None,
            product_trading_type: None,
            product_category: None,
            is_digital: false,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        product
    }

    pub async fn add_cart_line(
        &self,
        session_id: &str,
        product_id: i32,
        frame_color: Option<&str>,
    ) -> CartLine {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let line = CartLine {
            id: state.next_id(),
            session_id: session_id.to_string(),
            product_id,
            certificate_color: None,
            frame_color: frame_color.map(str::to_string),
            frame_size: None,
            frame_thickness: None,
            created_at: now,
            updated_at: now,
        };
        state.carts.push(line.clone());
        line
    }

    pub async fn add_tag(&self, cart_line: &CartLine, name: &str, data: &str) -> TagSelection {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let tag = TagSelection {
            id: state.next_id(),
            product_id: cart_line.product_id,
            cart_line_id: Some(cart_line.id),
            order_line_id: None,
            tag_name: name.to_string(),
            tag_data: data.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.tags.push(tag.clone());
        tag
    }

    pub async fn add_user(&self, username: &str, phone: Option<&str>, email: Option<&str>) -> User {
        let mut state = self.state.lock().await;
        let user = new_user(
            state.next_id(),
            &NewUser {
                username: username.to_string(),
                email: email.map(str::to_string),
                phone: phone.map(str::to_string),
                password_hash: "hash".to_string(),
            },
        );
        state.users.push(user.clone());
        user
    }

    pub async fn enqueue(&self, job: &Job, max_attempts: i32) {
        let mut state = self.state.lock().await;
        push_job(&mut state, job, max_attempts).expect("job payload encodes");
    }
}

fn new_user(id: i32, user: &NewUser) -> User {
    let now = Utc::now();
    User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        password: Some(user.password_hash.clone()),
        profile_pic: None,
        status: UserStatus::Active,
        role: UserRole::Customer,
        created_at: now,
        updated_at: now,
    }
}

fn push_job(state: &mut MemoryState, job: &Job, max_attempts: i32) -> Result<()> {
    let now = Utc::now();
    let queued = QueuedJob {
        id: state.next_id(),
        kind: job.kind().to_string(),
        payload: job.payload()?,
        status: JobStatus::Pending,
        attempts: 0,
        max_attempts,
        run_at: now,
        last_error: None,
        created_at: now,
        updated_at: now,
    };
    state.jobs.push(queued);
    Ok(())
}

pub(crate) struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }

    async fn find_order_by_payment_ref(&self, payment_id: &str) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.payment_ref == payment_id)
            .cloned())
    }

    async fn attach_invoice(&self, txn_id: &str, url: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.txn_id == txn_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        order.invoice = Some(url.to_string());
        Ok(())
    }
}

#[async_trait]
impl CheckoutTx for MemoryTx {
    async fn lock(&mut self, key: &str) -> Result<()> {
        self.work.locks.push(key.to_string());
        Ok(())
    }

    async fn find_order_by_payment_ref(&mut self, payment_id: &str) -> Result<Option<Order>> {
        Ok(self
            .work
            .orders
            .iter()
            .find(|o| o.payment_ref == payment_id)
            .cloned())
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<User>> {
        Ok(self
            .work
            .users
            .iter()
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        Ok(self
            .work
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        let user = new_user(self.work.next_id(), user);
        self.work.users.push(user.clone());
        Ok(user)
    }

    async fn insert_shipping_address(
        &mut self,
        address: &NewShippingAddress,
    ) -> Result<ShippingAddress> {
        let now = Utc::now();
        let row = ShippingAddress {
            id: self.work.next_id(),
            user_id: address.user_id,
            user_email: address.user_email.clone(),
            user_fname: address.user_fname.clone(),
            user_lname: address.user_lname.clone(),
            user_address: address.user_address.clone(),
            city: address.city.clone(),
            landmark: address.landmark.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            country: address.country.clone(),
            contact_mobile: address.contact_mobile.clone(),
            created_at: now,
            updated_at: now,
        };
        self.work.addresses.push(row.clone());
        Ok(row)
    }

    async fn claim_cart_lines(&mut self, session_id: &str) -> Result<Vec<CartLine>> {
        Ok(self
            .work
            .carts
            .iter()
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>> {
        Ok(self
            .work
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>> {
        if self
            .work
            .orders
            .iter()
            .any(|o| o.payment_ref == order.payment_ref)
        {
            return Ok(None);
        }

        let now = Utc::now();
        let row = Order {
            id: self.work.next_id(),
            user_id: order.user_id,
            shipping_address_id: order.shipping_address_id,
            txn_id: order.txn_id.clone(),
            payment_ref: order.payment_ref.clone(),
            sub_total: order.sub_total,
            c_gst: order.c_gst,
            s_gst: order.s_gst,
            shipping_fee: order.shipping_fee,
            total_amount: order.total_amount,
            paid_amount: order.paid_amount,
            invoice: None,
            created_at: now,
            updated_at: now,
        };
        self.work.orders.push(row.clone());
        Ok(Some(row))
    }

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> Result<OrderLine> {
        let now = Utc::now();
        let row = OrderLine {
            id: self.work.next_id(),
            order_id: line.order_id,
            user_id: line.user_id,
            product_id: line.product_id,
            quantity: line.quantity,
            amount: line.amount,
            certificate_color: line.certificate_color.clone(),
            frame_color: line.frame_color.clone(),
            frame_size: line.frame_size.clone(),
            frame_thickness: line.frame_thickness.clone(),
            created_at: now,
            updated_at: now,
        };
        self.work.lines.push(row.clone());
        Ok(row)
    }

    async fn move_tag_selections(
        &mut self,
        cart_line_id: i32,
        order_line_id: i32,
    ) -> Result<Vec<TagSelection>> {
        let mut moved = Vec::new();
        for tag in self
            .work
            .tags
            .iter_mut()
            .filter(|t| t.cart_line_id == Some(cart_line_id))
        {
            tag.cart_line_id = None;
            tag.order_line_id = Some(order_line_id);
            moved.push(tag.clone());
        }
        Ok(moved)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentRecord> {
        let now = Utc::now();
        let row = PaymentRecord {
            id: self.work.next_id(),
            order_id: payment.order_id,
            user_id: payment.user_id,
            payment_id: payment.payment_id.clone(),
            payment_amount: payment.payment_amount,
            payment_status: payment.payment_status.clone(),
            payment_response: payment.payment_response.clone(),
            created_at: now,
            updated_at: now,
        };
        self.work.payments.push(row.clone());
        Ok(row)
    }

    async fn append_order_status(
        &mut self,
        order_id: i32,
        user_id: i32,
        status: &str,
    ) -> Result<OrderStatusEntry> {
        let now = Utc::now();
        let row = OrderStatusEntry {
            id: self.work.next_id(),
            order_id,
            user_id,
            order_status: status.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.work.statuses.push(row.clone());
        Ok(row)
    }

    async fn delete_cart_lines(&mut self, session_id: &str) -> Result<u64> {
        let before = self.work.carts.len();
        self.work.carts.retain(|c| c.session_id != session_id);
        Ok((before - self.work.carts.len()) as u64)
    }

    async fn enqueue_job(&mut self, job: &Job, max_attempts: i32) -> Result<()> {
        push_job(&mut self.work, job, max_attempts)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn claim_next(&self) -> Result<Option<QueuedJob>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let Some(job) = state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending && j.run_at <= now)
            .min_by_key(|j| (j.run_at, j.id))
        else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.attempts += 1;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: i32) -> Result<()> {
        self.update_job(id, |job| job.status = JobStatus::Done).await
    }

    async fn retry(&self, id: i32, run_at: DateTime<Utc>, error: &str) -> Result<()> {
        self.update_job(id, |job| {
            job.status = JobStatus::Pending;
            job.run_at = run_at;
            job.last_error = Some(error.to_string());
        })
        .await
    }

    async fn fail(&self, id: i32, error: &str) -> Result<()> {
        self.update_job(id, |job| {
            job.status = JobStatus::Failed;
            job.last_error = Some(error.to_string());
        })
        .await
    }
}

impl MemoryStore {
    async fn update_job(&self, id: i32, apply: impl FnOnce(&mut QueuedJob)) -> Result<()> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
        apply(job);
        Ok(())
    }

    /// Makes every pending job due now, as if its backoff had elapsed.
    pub async fn release_backoff(&self) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for job in state.jobs.iter_mut().filter(|j| j.status == JobStatus::Pending) {
            job.run_at = now;
        }
    }
}
