//! Defines configuration as read from the environment.

use serde::Deserialize;

/// Default `source_prefix` value.
fn default_source_prefix() -> String {
    String::from("original/")
}

/// Default `target_prefix` value.
fn default_target_prefix() -> String {
    String::from("thumb/")
}

/// Default `max_width` and `max_height` value.
fn default_max_dimension() -> u32 {
    200
}

/// The thumbnailer reads an uploaded image from S3, shrinks it to fit
/// a bounding box, and writes it back under a derived key. Every
/// setting has a default, so an empty environment is a valid
/// configuration.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// The key prefix of uploaded originals. It gets replaced by
    /// `target_prefix` to build the thumbnail key. Keys not starting
    /// with it are mapped to themselves.
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    /// The key prefix thumbnails are written under.
    #[serde(default = "default_target_prefix")]
    pub target_prefix: String,

    /// Maximum width of a thumbnail, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,

    /// Maximum height of a thumbnail, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,

    /// Defines a bucket to receive the thumbnails. If omitted, it will
    /// be the same bucket as the one in the triggering event.
    #[serde(default)]
    pub target_bucket: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_prefix: default_source_prefix(),
            target_prefix: default_target_prefix(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            target_bucket: None,
        }
    }
}
