//! Turns a session's cart into a paid order.
//!
//! Everything the workflow writes goes through one `CheckoutTx`: the buyer,
//! the shipping snapshot, the order with its lines and tags, the payment
//! record, the first status row, the cart removal and the queued
//! e-mail/invoice jobs. Either all of it commits or none of it does.
//!
//! A gateway payment id places at most one order. Repeated calls with the
//! same id return the existing order with `replayed = true`.

mod identity;
#[cfg(test)]
pub(crate) mod memory;
mod store;
mod summary;

use std::{collections::HashMap, sync::Arc};

pub use identity::resolve_or_create;
pub use store::{CheckoutStore, CheckoutTx};
pub use summary::{SummaryLine, build_summary};

use crate::{
    config::{AppConfig, TaxConfig},
    error::{AppError, Result},
    models::{
        CheckoutRequest, Job, NewOrder, NewOrderLine, NewPayment, Order, OrderStatus,
        OrderSummary, Product,
    },
    services::{
        payment_service::{GatewayPayment, PaymentGateway},
        tax_service,
    },
};

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub image_url: String,
    pub web_url: String,
    pub tax: TaxConfig,
    pub password_cost: u32,
    pub refund_on_failure: bool,
    pub job_max_attempts: i32,
}

impl From<&AppConfig> for CheckoutSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            image_url: config.media.image_url.clone(),
            web_url: config.media.web_url.clone(),
            tax: config.tax.clone(),
            password_cost: config.auth.password_cost,
            refund_on_failure: config.checkout.refund_on_failure,
            job_max_attempts: config.jobs.max_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order_id: i32,
    pub replayed: bool,
    pub summary: Option<OrderSummary>,
}

impl CheckoutOutcome {
    fn replayed(order: &Order) -> Self {
        Self {
            order_id: order.id,
            replayed: true,
            summary: None,
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn CheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub async fn checkout(&self, session_id: &str, request: &CheckoutRequest) -> Result<CheckoutOutcome> {
        if let Some(order) = self.store.find_order_by_payment_ref(&request.payment_id).await? {
            tracing::info!(
                "Payment {} already placed order {}, returning it",
                request.payment_id,
                order.id
            );
            return Ok(CheckoutOutcome::replayed(&order));
        }

        self.place_order(session_id, request).await
    }

    async fn place_order(&self, session_id: &str, request: &CheckoutRequest) -> Result<CheckoutOutcome> {
        let payment = self.gateway.fetch_payment(&request.payment_id).await?;
        if !payment.is_settled() {
            tracing::warn!(
                "Payment {} for session {} is {}, not placing an order",
                payment.id,
                session_id,
                payment.status
            );
            return Err(AppError::Conflict(format!(
                "Payment {} is {} and cannot be used for an order",
                payment.id, payment.status
            )));
        }

        match self.run_transaction(session_id, request, &payment).await {
            Ok(outcome) => {
                if !outcome.replayed {
                    tracing::info!(
                        "Order {} placed for session {} with payment {}",
                        outcome.order_id,
                        session_id,
                        payment.id
                    );
                }
                Ok(outcome)
            }
            Err(err) => {
                self.compensate(&payment, &err).await;
                Err(err)
            }
        }
    }

    async fn compensate(&self, payment: &GatewayPayment, err: &AppError) {
        if !self.settings.refund_on_failure {
            tracing::error!(
                "Checkout failed after payment {} ({} minor units) was confirmed, needs manual reconciliation: {}",
                payment.id,
                payment.amount,
                err
            );
            return;
        }

        match self.gateway.refund_payment(&payment.id, payment.amount).await {
            Ok(()) => tracing::warn!("Refunded payment {} after failed checkout: {}", payment.id, err),
            Err(refund_err) => tracing::error!(
                "Refund of payment {} failed after checkout error ({}): {}",
                payment.id,
                err,
                refund_err
            ),
        }
    }

    async fn run_transaction(
        &self,
        session_id: &str,
        request: &CheckoutRequest,
        payment: &GatewayPayment,
    ) -> Result<CheckoutOutcome> {
        let mut tx = self.store.begin().await?;

        tx.lock(&format!("payment:{}", request.payment_id)).await?;
        tx.lock(&format!("cart:{}", session_id)).await?;

        if let Some(order) = tx.find_order_by_payment_ref(&request.payment_id).await? {
            return Ok(CheckoutOutcome::replayed(&order));
        }

        let user = resolve_or_create(tx.as_mut(), request, self.settings.password_cost).await?;
        let address = tx
            .insert_shipping_address(&request.shipping_address(user.id))
            .await?;

        let cart = tx.claim_cart_lines(session_id).await?;
        if cart.is_empty() {
            return Err(AppError::EmptyCart(session_id.to_string()));
        }

        let mut product_ids: Vec<i32> = cart.iter().map(|line| line.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let products: HashMap<i32, Product> = tx
            .products_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut cart_total = request.shipping_fee;
        for line in &cart {
            let product = products.get(&line.product_id).ok_or_else(|| {
                AppError::NotFound(format!("Product {} not found", line.product_id))
            })?;
            cart_total += product.effective_price();
        }
        if cart_total != request.total_amount {
            tracing::warn!(
                "Session {} submitted total {} but cart prices add up to {}",
                session_id,
                request.total_amount,
                cart_total
            );
        }

        let split = tax_service::split_gst(request.total_amount, &self.settings.tax);
        let txn_id = payment
            .order_id
            .clone()
            .unwrap_or_else(|| payment.id.clone());

        let Some(order) = tx
            .insert_order(&NewOrder {
                user_id: user.id,
                shipping_address_id: address.id,
                txn_id,
                payment_ref: request.payment_id.clone(),
                sub_total: split.sub_total,
                c_gst: split.c_gst,
                s_gst: split.s_gst,
                shipping_fee: request.shipping_fee,
                total_amount: request.total_amount,
                paid_amount: request.total_amount,
            })
            .await?
        else {
            drop(tx);
            return self.existing_order(&request.payment_id).await;
        };

        let mut placed = Vec::with_capacity(cart.len());
        for line in &cart {
            let product = &products[&line.product_id];
            let order_line = tx
                .insert_order_line(&NewOrderLine {
                    order_id: order.id,
                    user_id: user.id,
                    product_id: line.product_id,
                    quantity: 1,
                    amount: product.effective_price(),
                    certificate_color: line.certificate_color.clone().unwrap_or_default(),
                    frame_color: line.frame_color.clone().unwrap_or_default(),
                    frame_size: line.frame_size.clone().unwrap_or_default(),
                    frame_thickness: line.frame_thickness.clone().unwrap_or_default(),
                })
                .await?;
            let tags = tx.move_tag_selections(line.id, order_line.id).await?;
            placed.push((order_line, tags));
        }

        tx.insert_payment(&NewPayment {
            order_id: order.id,
            user_id: user.id,
            payment_id: payment.id.clone(),
            payment_amount: payment.amount,
            payment_status: payment.status.clone(),
            payment_response: payment.raw.clone(),
        })
        .await?;

        tx.append_order_status(order.id, user.id, OrderStatus::Pending.as_str())
            .await?;

        tx.delete_cart_lines(session_id).await?;

        let lines: Vec<SummaryLine<'_>> = placed
            .iter()
            .map(|(line, tags)| SummaryLine {
                line,
                product: &products[&line.product_id],
                tags,
            })
            .collect();
        let summary = build_summary(
            &order,
            &user,
            &address,
            &lines,
            &self.settings.image_url,
            &self.settings.web_url,
        );

        let recipient = user
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| request.user_email.clone());
        let max_attempts = self.settings.job_max_attempts;
        tx.enqueue_job(
            &Job::OrderConfirmationEmail {
                recipient,
                summary: summary.clone(),
            },
            max_attempts,
        )
        .await?;
        tx.enqueue_job(
            &Job::InvoicePdf {
                summary: summary.clone(),
            },
            max_attempts,
        )
        .await?;

        tx.commit().await?;

        Ok(CheckoutOutcome {
            order_id: order.id,
            replayed: false,
            summary: Some(summary),
        })
    }

    async fn existing_order(&self, payment_id: &str) -> Result<CheckoutOutcome> {
        let order = self
            .store
            .find_order_by_payment_ref(payment_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!("Order for payment {} vanished", payment_id))
            })?;
        Ok(CheckoutOutcome::replayed(&order))
    }
}

#[cfg(test)]
mod tests;
