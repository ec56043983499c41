use rust_decimal::Decimal;
use std::{env, str::FromStr, time::Duration};

use crate::{
    error::{AppError, Result},
    models::TransitionPolicy,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub razorpay: RazorpayConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub mail: MailConfig,
    pub invoice: InvoiceConfig,
    pub jobs: JobConfig,
    pub checkout: CheckoutConfig,
    pub tax: TaxConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub password_cost: u32,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory every uploaded image lives under; also served at `/images`.
    pub root: String,
    /// Public prefix joined with a stored relative path, e.g. `http://host/`.
    pub image_url: String,
    /// Order tracking page prefix; the gateway order id is appended.
    pub web_url: String,
    pub upload_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub wkhtmltopdf_path: String,
    pub timeout: Duration,
    pub delivery_days: i64,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub poll_interval: Duration,
    pub max_attempts: i32,
    pub base_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub status_policy: TransitionPolicy,
    pub refund_on_failure: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TaxConfig {
    pub prices_with_tax: bool,
    /// Combined GST percentage, split evenly into CGST and SGST.
    pub tax_rate: Decimal,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&get, "PORT", 8000)?,
                max_body_size: parsed(&get, "MAX_BODY_SIZE", 10_485_760)?,
            },
            database: DatabaseConfig {
                url: required(&get, "DB_URL")?,
                max_connections: parsed(&get, "DB_MAX_CONNECTIONS", 20)?,
            },
            cors: CorsConfig {
                allowed_origins: get("FRONTEND_URL")
                    .unwrap_or_default()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            auth: AuthConfig {
                jwt_secret: secret(&get, "JWT_SECRET")?,
                access_token_minutes: parsed(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
                refresh_token_days: parsed(&get, "REFRESH_TOKEN_EXPIRE_DAYS", 30)?,
                password_cost: parsed(&get, "PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?,
            },
            razorpay: RazorpayConfig {
                key_id: required(&get, "RAZORPAY_KEY_ID")?,
                key_secret: secret(&get, "RAZORPAY_KEY_SECRET")?,
                base_url: get("RAZORPAY_BASE_URL")
                    .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string()),
                currency: get("RAZORPAY_CURRENCY").unwrap_or_else(|| "INR".to_string()),
                timeout: Duration::from_secs(parsed(&get, "RAZORPAY_TIMEOUT_SECS", 15)?),
            },
            storage: StorageConfig {
                bucket: required(&get, "S3_BUCKET_NAME")?,
                region: get("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            },
            media: MediaConfig {
                root: get("MEDIA_ROOT").unwrap_or_else(|| "images".to_string()),
                image_url: with_trailing_slash(
                    get("IMAGE_URL").unwrap_or_else(|| "http://localhost:8000/".to_string()),
                ),
                web_url: with_trailing_slash(
                    get("WEB_URL")
                        .unwrap_or_else(|| "http://localhost:3000/order-tracking/".to_string()),
                ),
                upload_timeout: Duration::from_secs(parsed(&get, "UPLOAD_TIMEOUT_SECS", 30)?),
            },
            mail: MailConfig {
                sender: get("MAIL_SENDER").unwrap_or_else(|| "noreply@example.com".to_string()),
            },
            invoice: InvoiceConfig {
                wkhtmltopdf_path: get("WKHTMLTOPDF_PATH")
                    .unwrap_or_else(|| "wkhtmltopdf".to_string()),
                timeout: Duration::from_secs(parsed(&get, "INVOICE_TIMEOUT_SECS", 60)?),
                delivery_days: parsed(&get, "DELIVERY_ESTIMATE_DAYS", 4)?,
            },
            jobs: JobConfig {
                poll_interval: Duration::from_millis(parsed(&get, "JOB_POLL_INTERVAL_MS", 2000)?),
                max_attempts: parsed(&get, "JOB_MAX_ATTEMPTS", 5)?,
                base_backoff: Duration::from_secs(parsed(&get, "JOB_BACKOFF_SECS", 30)?),
            },
            checkout: CheckoutConfig {
                status_policy: parsed(&get, "ORDER_STATUS_POLICY", TransitionPolicy::Permissive)?,
                refund_on_failure: parsed(&get, "CHECKOUT_REFUND_ON_FAILURE", false)?,
            },
            tax: TaxConfig {
                prices_with_tax: parsed(&get, "PRICES_WITH_TAX", false)?,
                tax_rate: parsed(&get, "TAX_RATE", Decimal::ZERO)?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn required<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::ConfigError(format!("{} not set", key)))
}

fn secret<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = required(get, key)?;
    if value == "changethis" {
        return Err(AppError::ConfigError(format!(
            "The value of {} is \"changethis\", please change it",
            key
        )));
    }
    Ok(value)
}

fn parsed<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key).filter(|value| !value.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("Invalid {} value", key))),
        None => Ok(default),
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
