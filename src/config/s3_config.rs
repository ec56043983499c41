use aws_config::SdkConfig;
use aws_sdk_s3::Client as S3Client;

pub fn load_s3_client(sdk_config: &SdkConfig) -> S3Client {
    let s3_client = S3Client::new(sdk_config);

    tracing::info!("AWS S3 client initialized");

    s3_client
}
