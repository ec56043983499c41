use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        CartLine, Job, NewOrder, NewOrderLine, NewPayment, NewShippingAddress, NewUser, Order,
        OrderLine, OrderStatusEntry, PaymentRecord, Product, ShippingAddress, TagSelection, User,
    },
};

/// Persistence seam of the checkout workflow.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CheckoutTx>>;

    async fn find_order_by_payment_ref(&self, payment_id: &str) -> Result<Option<Order>>;

    /// Writes the invoice URL onto the order with this gateway order id.
    /// Fails with `NotFound` when no such order exists.
    async fn attach_invoice(&self, txn_id: &str, url: &str) -> Result<()>;
}

/// One open checkout transaction. Dropping it without `commit` discards
/// every write made through it.
#[async_trait]
pub trait CheckoutTx: Send {
    /// Serialises transactions on `key` until this one ends.
    async fn lock(&mut self, key: &str) -> Result<()>;

    async fn find_order_by_payment_ref(&mut self, payment_id: &str) -> Result<Option<Order>>;

    async fn find_user_by_phone(&mut self, phone: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>>;

    async fn insert_user(&mut self, user: &NewUser) -> Result<User>;

    async fn insert_shipping_address(&mut self, address: &NewShippingAddress)
    -> Result<ShippingAddress>;

    /// Locks and returns every cart line of the session, oldest first.
    async fn claim_cart_lines(&mut self, session_id: &str) -> Result<Vec<CartLine>>;

    async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>>;

    /// Returns `None` when an order already holds this payment reference.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>>;

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> Result<OrderLine>;

    /// Re-points every tag of the cart line at the order line.
    async fn move_tag_selections(
        &mut self,
        cart_line_id: i32,
        order_line_id: i32,
    ) -> Result<Vec<TagSelection>>;

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentRecord>;

    async fn append_order_status(
        &mut self,
        order_id: i32,
        user_id: i32,
        status: &str,
    ) -> Result<OrderStatusEntry>;

    async fn delete_cart_lines(&mut self, session_id: &str) -> Result<u64>;

    async fn enqueue_job(&mut self, job: &Job, max_attempts: i32) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
