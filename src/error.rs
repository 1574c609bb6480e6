//! Defines the failure values of a thumbnail invocation.

use std::fmt;
use thiserror::Error;

/// Boxed cause carried by storage failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by the storage capability.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found")]
    NotFound(#[source] BoxError),

    #[error("access denied")]
    AccessDenied(#[source] BoxError),

    #[error("transport error")]
    Transport(#[source] BoxError),
}

/// The pipeline stage an error originated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Fetch,
    Transform,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Decode => "decode",
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::Write => "write",
        })
    }
}

/// Every way an invocation can fail. All of them are fatal; the
/// invoking host decides whether to retry.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("cannot infer an image format from key {key:?}")]
    InvalidKeyFormat { key: String },

    #[error("failed to fetch object {key:?} from bucket {bucket:?}")]
    FetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to decode source image")]
    DecodeFailed(#[source] image::ImageError),

    #[error("unsupported encoding format {0:?}")]
    UnsupportedEncodingFormat(String),

    #[error("failed to encode thumbnail as {format:?}")]
    EncodeFailed {
        format: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write object {key:?} to bucket {bucket:?}")]
    WriteFailed {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },
}

impl ThumbnailError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            ThumbnailError::InvalidEvent(_) | ThumbnailError::InvalidKeyFormat { .. } => {
                Stage::Decode
            }
            ThumbnailError::FetchFailed { .. } => Stage::Fetch,
            ThumbnailError::DecodeFailed(_)
            | ThumbnailError::UnsupportedEncodingFormat(_)
            | ThumbnailError::EncodeFailed { .. } => Stage::Transform,
            ThumbnailError::WriteFailed { .. } => Stage::Write,
        }
    }

    /// Flatten the error into a single message naming the stage and
    /// every cause, as reported to the Lambda runtime.
    pub fn into_report(self) -> anyhow::Error {
        let stage = self.stage();
        anyhow::anyhow!("{} stage: {:#}", stage, anyhow::Error::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn fetch_failures_keep_their_cause() {
        let err = ThumbnailError::FetchFailed {
            bucket: String::from("b"),
            key: String::from("original/cat.png"),
            source: StorageError::NotFound("NoSuchKey: The specified key does not exist.".into()),
        };
        assert_eq!(err.stage(), Stage::Fetch);
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "object not found");
        assert_eq!(
            cause.source().unwrap().to_string(),
            "NoSuchKey: The specified key does not exist."
        );
    }

    #[test]
    fn reports_name_the_stage_and_the_causes() {
        let err = ThumbnailError::WriteFailed {
            bucket: String::from("b"),
            key: String::from("thumb/cat.png"),
            source: StorageError::AccessDenied("AccessDenied: bucket policy".into()),
        };
        assert_eq!(
            err.into_report().to_string(),
            "write stage: failed to write object \"thumb/cat.png\" to bucket \"b\": \
             access denied: AccessDenied: bucket policy"
        );
    }

    #[test]
    fn key_errors_belong_to_the_decode_stage() {
        let err = ThumbnailError::InvalidKeyFormat {
            key: String::from("uploads/doc"),
        };
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.stage().to_string(), "decode");
    }
}
