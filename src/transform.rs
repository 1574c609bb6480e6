//! Thumbnail transform: decode an image, shrink it to fit a bounding
//! box while keeping its aspect ratio, and encode it into the
//! negotiated format.

use crate::error::ThumbnailError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use tracing::{debug, instrument};

/// The box thumbnails must fit in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            width: 200,
            height: 200,
        }
    }
}

/// Compute the dimensions of an image of `width`×`height` scaled to
/// fit inside `bounds`. Images that already fit keep their size.
pub fn fit_inside(width: u32, height: u32, bounds: BoundingBox) -> (u32, u32) {
    if width <= bounds.width && height <= bounds.height {
        return (width, height);
    }
    let ratio = f64::min(
        bounds.width as f64 / width as f64,
        bounds.height as f64 / height as f64,
    );
    let scaled = |side: u32, limit: u32| ((side as f64 * ratio).round() as u32).clamp(1, limit);
    (scaled(width, bounds.width), scaled(height, bounds.height))
}

/// Resolve an encoding format name to the codec's output format.
pub fn output_format(encoding_format: &str) -> Result<ImageOutputFormat, ThumbnailError> {
    let unsupported = || ThumbnailError::UnsupportedEncodingFormat(String::from(encoding_format));
    let format = ImageFormat::from_extension(encoding_format).ok_or_else(unsupported)?;
    match ImageOutputFormat::from(format) {
        ImageOutputFormat::Unsupported(_) => Err(unsupported()),
        output => Ok(output),
    }
}

/// Produce a thumbnail of `buffer` encoded as `encoding_format`. The
/// source format is detected from the bytes themselves.
#[instrument(skip(buffer), fields(size = buffer.len()))]
pub fn thumbnail(
    buffer: Vec<u8>,
    encoding_format: &str,
    bounds: BoundingBox,
) -> Result<Vec<u8>, ThumbnailError> {
    let output = output_format(encoding_format)?;
    let image = image::load_from_memory(&buffer).map_err(ThumbnailError::DecodeFailed)?;
    drop(buffer);

    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_inside(width, height, bounds);
    debug!(width, height, new_width, new_height, "Computed thumbnail dimensions");
    let resized = if (new_width, new_height) == (width, height) {
        image
    } else {
        image.resize_exact(new_width, new_height, FilterType::Lanczos3)
    };

    encode(resized, output, encoding_format)
}

/// Convert the image to a pixel layout the target encoder accepts.
fn encodable(image: DynamicImage, output: &ImageOutputFormat) -> DynamicImage {
    match output {
        ImageOutputFormat::Png | ImageOutputFormat::Tiff => image,
        ImageOutputFormat::Jpeg(_) => match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        ImageOutputFormat::Farbfeld => DynamicImage::ImageRgba16(image.to_rgba16()),
        ImageOutputFormat::OpenExr => DynamicImage::ImageRgba32F(image.to_rgba32f()),
        _ => match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => image,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
    }
}

fn encode(
    image: DynamicImage,
    output: ImageOutputFormat,
    encoding_format: &str,
) -> Result<Vec<u8>, ThumbnailError> {
    let image = encodable(image, &output);
    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), output)
        .map_err(|source| ThumbnailError::EncodeFailed {
            format: String::from(encoding_format),
            source,
        })?;
    Ok(encoded)
}
