use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::OrderSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// Side effect queued by checkout and run by the job worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    OrderConfirmationEmail {
        recipient: String,
        summary: OrderSummary,
    },
    InvoicePdf {
        summary: OrderSummary,
    },
}

#[derive(Serialize, Deserialize)]
struct EmailPayload {
    recipient: String,
    summary: OrderSummary,
}

#[derive(Serialize, Deserialize)]
struct InvoicePayload {
    summary: OrderSummary,
}

impl Job {
    pub const EMAIL_KIND: &'static str = "order_confirmation_email";
    pub const INVOICE_KIND: &'static str = "invoice_pdf";

    pub fn kind(&self) -> &'static str {
        match self {
            Job::OrderConfirmationEmail { .. } => Self::EMAIL_KIND,
            Job::InvoicePdf { .. } => Self::INVOICE_KIND,
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            Job::OrderConfirmationEmail { recipient, summary } => {
                serde_json::to_value(EmailPayload {
                    recipient: recipient.clone(),
                    summary: summary.clone(),
                })
            }
            Job::InvoicePdf { summary } => serde_json::to_value(InvoicePayload {
                summary: summary.clone(),
            }),
        };
        value.map_err(|e| AppError::InternalError(format!("Failed to encode job payload: {}", e)))
    }

    pub fn from_parts(kind: &str, payload: serde_json::Value) -> Result<Self> {
        let decode_err =
            |e: serde_json::Error| AppError::InternalError(format!("Bad {} payload: {}", kind, e));

        match kind {
            Self::EMAIL_KIND => {
                let p: EmailPayload = serde_json::from_value(payload).map_err(decode_err)?;
                Ok(Job::OrderConfirmationEmail {
                    recipient: p.recipient,
                    summary: p.summary,
                })
            }
            Self::INVOICE_KIND => {
                let p: InvoicePayload = serde_json::from_value(payload).map_err(decode_err)?;
                Ok(Job::InvoicePdf { summary: p.summary })
            }
            other => Err(AppError::InternalError(format!("Unknown job kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueuedJob {
    pub id: i32,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
