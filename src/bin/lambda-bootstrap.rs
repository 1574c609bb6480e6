use anyhow::{anyhow, Result};
use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{run, service_fn, LambdaEvent};
use s3_thumbnailer::error::ThumbnailError;
use s3_thumbnailer::{app, client};
use tracing::{info, warn};

/// Generate a thumbnail for the object referenced by an S3 event,
/// returning the key it was written to.
async fn function_handler(event: LambdaEvent<S3Event>) -> Result<String> {
    match serde_json::to_string(&event.payload) {
        Ok(json) => info!("Event: {}", json),
        Err(e) => warn!("Event: {:?} (couldn't serialize as JSON: {})", event.payload, e),
    }
    app::current()
        .handle(&event.payload, client::current())
        .await
        .map_err(ThumbnailError::into_report)
}

/// Run an AWS Lambda function that listens to S3 object-created
/// events, and writes a resized copy of each uploaded image next to
/// the original.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
    app::init()?;
    client::init().await?;

    run(service_fn(function_handler))
        .await
        .map_err(|e| anyhow!("{:?}", e))
}
