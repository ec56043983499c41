//! Fakes for the external collaborators and the database error surface.

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::json;
use sqlx::error::{DatabaseError, ErrorKind};

use crate::{
    error::{AppError, Result},
    services::{
        email_service::Mailer,
        payment_service::{GatewayOrderRequest, GatewayPayment, PaymentGateway},
        render_service::DocumentRenderer,
        storage_service::{ObjectStore, object_url},
    },
};

#[derive(Default)]
pub(crate) struct FakeGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
    pub fetches: AtomicUsize,
    pub refunds: Mutex<Vec<(String, i64)>>,
    pub orders: Mutex<Vec<GatewayOrderRequest>>,
}

impl FakeGateway {
    pub fn with_payment(id: &str, amount: i64, order_id: Option<&str>) -> Self {
        let gateway = Self::default();
        gateway.add_payment(id, amount, order_id);
        gateway
    }

    pub fn add_payment(&self, id: &str, amount: i64, order_id: Option<&str>) {
        self.add_payment_with_status(id, amount, order_id, "captured");
    }

    pub fn add_payment_with_status(
        &self,
        id: &str,
        amount: i64,
        order_id: Option<&str>,
        status: &str,
    ) {
        let raw = json!({
            "id": id,
            "entity": "payment",
            "amount": amount,
            "currency": "INR",
            "status": status,
            "order_id": order_id,
        });
        let payment = GatewayPayment::from_raw(raw).expect("valid fake payment");
        self.payments
            .lock()
            .unwrap()
            .insert(id.to_string(), payment);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<serde_json::Value> {
        self.orders.lock().unwrap().push(request.clone());
        Ok(json!({
            "id": "order_fake",
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "status": "created",
        }))
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| AppError::PaymentNotFound(payment_id.to_string()))
    }

    async fn refund_payment(&self, payment_id: &str, amount: i64) -> Result<()> {
        self.refunds
            .lock()
            .unwrap()
            .push((payment_id.to_string(), amount));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
    failures_left: AtomicUsize,
}

impl FakeMailer {
    pub fn failing(times: usize) -> Self {
        Self {
            sent: Mutex::default(),
            failures_left: AtomicUsize::new(times),
        }
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_html(&self, recipient: &str, subject: &str, html: &str) -> Result<()> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(AppError::InternalError("mail server unavailable".to_string()));
        }
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            html.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRenderer;

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(html.as_bytes());
        Ok(pdf)
    }
}

#[derive(Default)]
pub(crate) struct FakeObjectStore {
    pub objects: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), body.len()));
        Ok(object_url("test-bucket", "ap-south-1", key))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Violation {
    Unique,
    ForeignKey,
}

#[derive(Debug)]
struct ConstraintViolation(Violation);

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} constraint violated", self.0)
    }
}

impl std::error::Error for ConstraintViolation {}

impl DatabaseError for ConstraintViolation {
    fn message(&self) -> &str {
        "constraint violated"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(match self.0 {
            Violation::Unique => "23505",
            Violation::ForeignKey => "23503",
        }))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.0 {
            Violation::Unique => ErrorKind::UniqueViolation,
            Violation::ForeignKey => ErrorKind::ForeignKeyViolation,
        }
    }
}

/// A Postgres-style constraint error without a database.
pub(crate) fn constraint_violation(violation: Violation) -> sqlx::Error {
    sqlx::Error::Database(Box::new(ConstraintViolation(violation)))
}
