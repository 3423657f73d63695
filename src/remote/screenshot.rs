//! Screenshot capture.
//!
//! Grabs the current frame from a video element and encodes it off the
//! async runtime. The result carries the encoded bytes as a payload-ready
//! buffer plus the mime type and the playback position of the frame.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::debug;

use super::element::{ElementError, ElementKind, MediaElement, RawFrame};

/// Format used when the caller does not name one.
pub const DEFAULT_MIME: &str = "image/png";

/// Jpeg quality used when the caller does not pass one.
const DEFAULT_JPEG_QUALITY: u8 = 90;

/// An encoded screenshot.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub data: Bytes,
    pub mime: String,
    /// Playback position of the captured frame, in seconds.
    pub time: f64,
}

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("screenshot target is not a video")]
    UnsupportedTarget,
    #[error("video has no decoded frame to capture")]
    EmptyFrame,
    #[error("unsupported screenshot format: {0}")]
    UnsupportedMime(String),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("encoder task aborted")]
    EncoderGone,
}

/// Output formats the capture path knows how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    fn from_mime(mime: &str) -> Result<Self, ScreenshotError> {
        match mime {
            "image/png" => Ok(Self::Png),
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            other => Err(ScreenshotError::UnsupportedMime(other.to_string())),
        }
    }

    const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Capture and encode the current frame of `element`.
///
/// `quality` is `0.0..=1.0` and only affects jpeg output. Fails with
/// [`ScreenshotError::UnsupportedTarget`] on non-video elements and
/// [`ScreenshotError::UnsupportedMime`] for formats outside png/jpeg.
pub async fn capture(
    element: &dyn MediaElement,
    mime: &str,
    quality: Option<f64>,
) -> Result<Screenshot, ScreenshotError> {
    if element.kind() != ElementKind::Video {
        return Err(ScreenshotError::UnsupportedTarget);
    }
    let format = OutputFormat::from_mime(mime)?;
    let frame = element.capture_frame().await?;
    if frame.width == 0 || frame.height == 0 || frame.rgba.is_empty() {
        return Err(ScreenshotError::EmptyFrame);
    }
    let time = frame.time;
    debug!(width = frame.width, height = frame.height, ?format, "encoding frame");

    // Encoding is CPU-bound; keep it off the async workers.
    let data = tokio::task::spawn_blocking(move || encode(&frame, format, quality))
        .await
        .map_err(|_| ScreenshotError::EncoderGone)??;

    Ok(Screenshot {
        data,
        mime: format.mime().to_string(),
        time,
    })
}

fn encode(frame: &RawFrame, format: OutputFormat, quality: Option<f64>) -> Result<Bytes, ScreenshotError> {
    let image = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.to_vec())
        .ok_or(ScreenshotError::EmptyFrame)?;
    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(image).write_to(&mut out, ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            let quality = quality.map_or(DEFAULT_JPEG_QUALITY, |q| {
                (q.clamp(0.0, 1.0) * 100.0).round() as u8
            });
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            // Jpeg has no alpha channel.
            DynamicImage::ImageRgba8(image)
                .to_rgb8()
                .write_with_encoder(encoder)?;
        }
    }
    Ok(Bytes::from(out.into_inner()))
}
