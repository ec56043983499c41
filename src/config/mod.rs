mod app_config;
mod aws;
mod s3_config;
mod ses_config;

pub use app_config::{
    AppConfig, AuthConfig, CheckoutConfig, CorsConfig, DatabaseConfig, InvoiceConfig, JobConfig,
    MailConfig, MediaConfig, RazorpayConfig, ServerConfig, StorageConfig, TaxConfig,
};
pub use aws::load_sdk_config;
pub use s3_config::*;
pub use ses_config::*;
