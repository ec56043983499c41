use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{self, AppConfig},
    database,
    error::{AppError, Result},
    queries::{checkout_queries::PgCheckoutStore, job_queries::PgJobStore},
    routes,
    services::{
        checkout::{CheckoutService, CheckoutSettings, CheckoutStore},
        email_service::SesMailer,
        image_service::ImageStore,
        invoice_service::InvoiceService,
        job_service::{JobHandler, JobWorker},
        payment_service::{PaymentGateway, RazorpayClient},
        render_service::Wkhtmltopdf,
        storage_service::S3Store,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub checkout: CheckoutService,
    pub gateway: Arc<dyn PaymentGateway>,
    pub images: ImageStore,
}

/// The HTTP router plus the background worker that drains the job queue.
pub struct Application {
    pub router: Router,
    pub worker: JobWorker,
}

pub async fn build(config: &AppConfig) -> Result<Application> {
    let pool = database::create_pool(&config.database).await?;

    let sdk_config = config::load_sdk_config(&config.storage.region).await?;
    let s3_client = config::load_s3_client(&sdk_config);
    let ses_client = config::load_ses_client(&sdk_config);

    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(&config.razorpay)?);
    let orders: Arc<dyn CheckoutStore> = Arc::new(PgCheckoutStore::new(pool.clone()));

    let invoices = InvoiceService::new(
        Arc::new(Wkhtmltopdf::new(
            config.invoice.wkhtmltopdf_path.clone(),
            config.invoice.timeout,
        )),
        Arc::new(S3Store::new(
            s3_client,
            &config.storage.bucket,
            &config.storage.region,
            config.invoice.timeout,
        )),
        orders.clone(),
        config.invoice.delivery_days,
    );
    let handler = JobHandler::new(
        Arc::new(SesMailer::new(ses_client, config.mail.sender.clone())),
        invoices,
    );

    let jobs = PgJobStore::new(pool.clone());
    let requeued = jobs.requeue_interrupted().await?;
    if requeued > 0 {
        tracing::warn!("Requeued {} jobs interrupted by the last shutdown", requeued);
    }
    let worker = JobWorker::new(Arc::new(jobs), handler, &config.jobs);

    let state = AppState {
        db: pool,
        config: Arc::new(config.clone()),
        checkout: CheckoutService::new(orders, gateway.clone(), CheckoutSettings::from(config)),
        gateway,
        images: ImageStore::new(config.media.root.clone(), config.media.upload_timeout),
    };

    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::ConfigError(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins)
        .allow_credentials(true);

    let router = routes::create_router(state.clone())
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(Application { router, worker })
}
