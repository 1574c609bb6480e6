//! Defines a _trigger_, the input for the handling of an event
//! through the thumbnail pipeline. The trigger is built from the S3
//! event, and carries the naming information derived from the object
//! key.

use crate::error::ThumbnailError;
use aws_lambda_events::event::s3::S3Event;
use percent_encoding::percent_decode_str;
use tracing::{instrument, warn};

/// The bucket and decoded key of the object that triggered an
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationEvent {
    pub bucket: String,
    pub key: String,
}

impl InvocationEvent {
    /// Builds the invocation input from the first record of an S3
    /// event. Notifications for object-created events carry one
    /// record each; any further records are ignored.
    #[instrument(skip(event))]
    pub fn from_s3_event(event: &S3Event) -> Result<Self, ThumbnailError> {
        let record = event
            .records
            .first()
            .ok_or_else(|| ThumbnailError::InvalidEvent(String::from("event has no records")))?;
        if event.records.len() > 1 {
            warn!(
                "Event contains {} records; only the first one is handled",
                event.records.len()
            );
        }
        let bucket = record
            .s3
            .bucket
            .name
            .clone()
            .ok_or_else(|| ThumbnailError::InvalidEvent(String::from("record has no bucket name")))?;
        let raw_key = record
            .s3
            .object
            .key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ThumbnailError::InvalidEvent(String::from("record has no object key")))?;
        let key = decode_key(raw_key)?;
        Ok(InvocationEvent { bucket, key })
    }
}

/// Percent-decodes an object key as found in S3 notifications. A `+`
/// is kept literally.
pub fn decode_key(raw: &str) -> Result<String, ThumbnailError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| ThumbnailError::InvalidEvent(format!("object key {:?} is not UTF-8: {}", raw, e)))
}

/// Names derived from a decoded object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedNaming {
    /// Last path segment of the key.
    pub filename: String,
    /// Lowercased text after the last `.` of the filename.
    pub extension: String,
    /// The codec's name for the format, see [`encoding_format`].
    pub encoding_format: String,
}

impl DerivedNaming {
    /// Derive the filename, extension and target format of a key. A
    /// key without an extension is rejected, since its format can't
    /// be inferred.
    pub fn from_key(key: &str) -> Result<Self, ThumbnailError> {
        let filename = key.rsplit('/').next().unwrap_or(key);
        let extension = match filename.rsplit_once('.') {
            Some((_, extension)) if !extension.is_empty() => extension.to_lowercase(),
            _ => {
                return Err(ThumbnailError::InvalidKeyFormat {
                    key: String::from(key),
                })
            }
        };
        Ok(DerivedNaming {
            filename: String::from(filename),
            encoding_format: encoding_format(&extension),
            extension,
        })
    }

    /// The content type of objects encoded in this format.
    pub fn content_type(&self) -> String {
        content_type(&self.encoding_format)
    }
}

/// Map a lowercase file extension to the format name used for
/// encoding and content types.
pub fn encoding_format(extension: &str) -> String {
    match extension {
        "jpg" => String::from("jpeg"),
        other => String::from(other),
    }
}

/// Content type for an encoding format.
pub fn content_type(encoding_format: &str) -> String {
    format!("image/{}", encoding_format)
}


#[cfg(test)]
mod tests {
    use super::fixtures::s3_event;
    use super::*;

    #[test]
    fn first_record_is_decoded() {
        let event = s3_event("b", &["original/cat.png", "original/dog.png"]);
        let trigger = InvocationEvent::from_s3_event(&event).unwrap();
        assert_eq!(trigger.bucket, "b");
        assert_eq!(trigger.key, "original/cat.png");
    }

    #[test]
    fn empty_event_is_rejected() {
        let event = s3_event("b", &[]);
        assert!(matches!(
            InvocationEvent::from_s3_event(&event),
            Err(ThumbnailError::InvalidEvent(_))
        ));
    }

    #[test]
    fn percent_encoded_non_ascii_keys_are_decoded() {
        // original/고양이.PNG
        let event = s3_event("b", &["original/%EA%B3%A0%EC%96%91%EC%9D%B4.PNG"]);
        let trigger = InvocationEvent::from_s3_event(&event).unwrap();
        assert_eq!(trigger.key, "original/고양이.PNG");
        let naming = DerivedNaming::from_key(&trigger.key).unwrap();
        assert_eq!(naming.filename, "고양이.PNG");
        assert_eq!(naming.extension, "png");
        assert_eq!(naming.encoding_format, "png");
    }

    #[test]
    fn decoding_plain_keys_is_a_no_op() {
        let key = "original/a+b c.png";
        assert_eq!(decode_key(key).unwrap(), key);
        assert_eq!(decode_key(&decode_key(key).unwrap()).unwrap(), key);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(
            decode_key("original/%FF.png"),
            Err(ThumbnailError::InvalidEvent(_))
        ));
    }

    #[test]
    fn jpg_is_negotiated_to_jpeg() {
        let naming = DerivedNaming::from_key("original/pic.JPG").unwrap();
        assert_eq!(naming.extension, "jpg");
        assert_eq!(naming.encoding_format, "jpeg");
        assert_eq!(naming.content_type(), "image/jpeg");
    }

    #[test]
    fn other_extensions_are_kept() {
        for extension in ["png", "jpeg", "gif", "webp", "tiff"] {
            assert_eq!(encoding_format(extension), extension);
        }
    }

    #[test]
    fn extension_comes_from_the_filename() {
        let naming = DerivedNaming::from_key("original/v1.2/archive.tar.gz").unwrap();
        assert_eq!(naming.filename, "archive.tar.gz");
        assert_eq!(naming.extension, "gz");
    }

    #[test]
    fn keys_without_extension_fail() {
        for key in ["uploads/doc", "uploads.d/doc", "original/cat."] {
            assert!(
                matches!(
                    DerivedNaming::from_key(key),
                    Err(ThumbnailError::InvalidKeyFormat { .. })
                ),
                "{} should be rejected",
                key
            );
        }
    }
}
