//! Artwork selection and resizing

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::Deserialize;
use std::future::Future;
use std::io::Cursor;
use tracing::debug;

use crate::error::Result;

/// Provider size keys, largest first
pub const LAST_FM_SIZES: [&str; 6] = ["mega", "extralarge", "large", "medium", "small", ""];

/// JPEG quality of resized artwork
const JPEG_QUALITY: u8 = 85;

/// One image entry of a provider response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SizedImage {
    #[serde(rename = "#text", default)]
    pub url: String,
    #[serde(default)]
    pub size: String,
}

/// Read width and height without decoding the pixels
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    Ok(ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()?)
}

/// Width and height differ by less than 5% of the height
pub fn is_roughly_square(width: u32, height: u32) -> bool {
    (height as f64 - width as f64).abs() < 0.05 * height as f64
}

/// Download the largest roughly square image
///
/// Sizes are tried from largest to smallest; a size missing from `images`,
/// a failed download, an undecodable body or a non-square image all move on
/// to the next size. `None` when no size qualifies.
pub async fn select_largest_image<F, Fut>(images: &[SizedImage], fetch: F) -> Option<Bytes>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Bytes>>,
{
    for size in LAST_FM_SIZES {
        let Some(candidate) = images.iter().find(|i| i.size == size) else {
            continue;
        };
        if candidate.url.is_empty() {
            continue;
        }

        let data = match fetch(candidate.url.clone()).await {
            Ok(data) => data,
            Err(e) => {
                debug!("Skipping {} image {}: {}", size, candidate.url, e);
                continue;
            }
        };
        match image_dimensions(&data) {
            Ok((width, height)) if is_roughly_square(width, height) => return Some(data),
            Ok((width, height)) => {
                debug!("Skipping {} image {}x{}: not square", size, width, height)
            }
            Err(e) => debug!("Skipping {} image {}: {}", size, candidate.url, e),
        }
    }
    None
}

/// Shrink artwork to fit within `max` pixels and encode it as JPEG
pub fn fit_within(data: &[u8], max: u32) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;
    let img = resize_to_fit(img, max);

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder.encode_image(&img.to_rgb8())?;
    Ok(output)
}

fn resize_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max && height <= max {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = max as f64 / width as f64;
        (max, (height as f64 * ratio) as u32)
    } else {
        let ratio = max as f64 / height as f64;
        ((width as f64 * ratio) as u32, max)
    };
    debug!(
        "Resizing artwork: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    img.resize(new_width, new_height, FilterType::Lanczos3)
}
