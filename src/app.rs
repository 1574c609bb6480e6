//! Defines the read-only application state and the thumbnail
//! pipeline that runs for each invocation.

use crate::client::{download, upload, ObjectStore};
use crate::conf::Settings;
use crate::error::ThumbnailError;
use crate::key::KeyMapper;
use crate::transform::{thumbnail, BoundingBox};
use crate::trigger::{DerivedNaming, InvocationEvent};
use anyhow::{anyhow, bail, Result};
use aws_lambda_events::event::s3::S3Event;
use envy::from_env;
use once_cell::sync::OnceCell;
use tracing::{error, info, instrument, warn};

/// An App is an initialized application state, derived from
/// settings.
#[derive(Debug)]
pub struct App {
    /// The original settings.
    pub settings: Settings,

    /// Derives thumbnail keys from source keys.
    pub key_mapper: KeyMapper,

    /// The box thumbnails are fitted into.
    pub bounds: BoundingBox,
}

impl App {
    /// Initialize an App instance given a settings struct. Consumes
    /// the settings struct.
    pub fn new(settings: Settings) -> Result<Self> {
        if settings.max_width == 0 || settings.max_height == 0 {
            bail!(
                "thumbnail dimensions must be positive, got {}x{}",
                settings.max_width,
                settings.max_height
            );
        }
        if settings.source_prefix.is_empty() {
            bail!("the source prefix can't be empty");
        }
        Ok(App {
            key_mapper: KeyMapper::new(&settings.source_prefix, &settings.target_prefix),
            bounds: BoundingBox {
                width: settings.max_width,
                height: settings.max_height,
            },
            settings,
        })
    }

    /// Handle an invocation event, producing the key of the written
    /// thumbnail.
    #[instrument(skip(self, event, store))]
    pub async fn handle<S: ObjectStore>(
        &self,
        event: &S3Event,
        store: &S,
    ) -> Result<String, ThumbnailError> {
        let result = self.run(event, store).await;
        if let Err(e) = &result {
            error!(stage = %e.stage(), "Failed to generate thumbnail: {:?}", e);
        }
        result
    }

    async fn run<S: ObjectStore>(
        &self,
        event: &S3Event,
        store: &S,
    ) -> Result<String, ThumbnailError> {
        let InvocationEvent { bucket, key } = InvocationEvent::from_s3_event(event)?;
        info!("Bucket: {:?}, source key: {:?}", bucket, key);
        let naming = DerivedNaming::from_key(&key)?;
        info!(
            "Filename: {:?}, extension: {:?}",
            naming.filename, naming.extension
        );

        let target_key = self.key_mapper.map(&key);
        let target_bucket = self.settings.target_bucket.as_deref().unwrap_or(&bucket);
        info!("Target key: {:?}", target_key);
        if target_key == key && target_bucket == bucket {
            warn!(
                "Key {:?} doesn't start with {:?}; the source object will be overwritten",
                key, self.key_mapper.source_prefix
            );
        }

        let original = download(store, &bucket, &key).await?;
        info!("Original image size: {}", original.len());

        let resized = thumbnail(original, &naming.encoding_format, self.bounds)?;
        let resized_size = resized.len();

        upload(
            store,
            target_bucket,
            &target_key,
            resized,
            &naming.encoding_format,
        )
        .await?;
        info!("Resized image size: {}", resized_size);
        info!("Thumbnail written to {:?}", target_key);
        Ok(target_key)
    }
}

/// Global App instance.
static CURRENT: OnceCell<App> = OnceCell::new();

/// Initialize the global App instance.
pub fn init() -> Result<()> {
    let settings = from_env()?;
    let app = App::new(settings)?;
    CURRENT
        .set(app)
        .map_err(|_| anyhow!("app::CURRENT was already initialized"))
}

/// Get the current App instance, or panic if it hasn't been
/// initialized.
pub fn current() -> &'static App {
    CURRENT.get().expect("app is not initialized")
}
