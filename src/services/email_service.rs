use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client as SesClient,
    types::{Body, Content, Destination, EmailContent, Message},
};

use crate::error::{AppError, Result};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_html(&self, recipient: &str, subject: &str, html: &str) -> Result<()>;
}

pub struct SesMailer {
    client: SesClient,
    sender: String,
}

impl SesMailer {
    pub fn new(client: SesClient, sender: impl Into<String>) -> Self {
        Self {
            client,
            sender: sender.into(),
        }
    }
}

fn utf8(data: &str, what: &str) -> Result<Content> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to build e-mail {}: {}", what, e)))
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send_html(&self, recipient: &str, subject: &str, html: &str) -> Result<()> {
        let destination = Destination::builder().to_addresses(recipient).build();

        let body = Body::builder().html(utf8(html, "body")?).build();

        let message = Message::builder()
            .subject(utf8(subject, "subject")?)
            .body(body)
            .build();

        let content = EmailContent::builder().simple(message).build();

        self.client
            .send_email()
            .from_email_address(&self.sender)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email to {}: {:?}", recipient, e);
                AppError::InternalError(format!("Failed to send email to {}", recipient))
            })?;

        Ok(())
    }
}
