//! # Image Processing Module
//!
//! This module wraps the image codecs behind the [`ImageTransform`] trait so
//! the optimization pipeline never talks to a codec library directly.
//!
//! ## Pipeline for a single image
//! 1. **Probe**: detect the container format and pixel dimensions
//! 2. **Re-encode**: lossy pass into the intermediate format (WebP by default)
//!    at the configured quality
//! 3. **Convert**: decode the intermediate bytes and write them back in the
//!    original container format, so file names and extensions never change
//!
//! ## Codecs
//! - **JPEG / PNG / GIF**: encoded and decoded with the `image` crate
//! - **WebP**: lossy encoding through `webp` (libwebp); the `image` crate only
//!   encodes lossless WebP, but decodes both
//!
//! ## Example
//! ```rust,ignore
//! let codec = CodecTransform::new();
//! let metadata = codec.probe(&bytes)?;
//! let intermediate = codec.reencode(&bytes, IntermediateFormat::Webp, 80)?;
//! let optimized = codec.convert(&intermediate, metadata.format, 80)?;
//! ```

use crate::config::IntermediateFormat;
use crate::error::OptimizeError;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, Frame, ImageEncoder as _, ImageFormat};
use std::fmt;
use std::io::Cursor;

/// Container formats an optimized image can be written back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ContainerFormat {
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// What the probe step learns about an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    /// Some decoders cannot report a height
    pub height: Option<u32>,
    pub format: ContainerFormat,
}

impl ImageMetadata {
    /// "WxH", with "?" standing in for an unknown height
    pub fn dimensions(&self) -> String {
        match self.height {
            Some(height) => format!("{}x{}", self.width, height),
            None => format!("{}x?", self.width),
        }
    }
}

/// Decode/re-encode collaborator used by the optimizer.
///
/// Implementations must be usable from a blocking worker thread.
pub trait ImageTransform: Send + Sync {
    /// Detect format and dimensions of an encoded image
    fn probe(&self, data: &[u8]) -> Result<ImageMetadata, OptimizeError>;

    /// Lossy re-encode into the intermediate format
    fn reencode(
        &self,
        data: &[u8],
        target: IntermediateFormat,
        quality: u8,
    ) -> Result<Vec<u8>, OptimizeError>;

    /// Re-wrap encoded bytes into a container format
    fn convert(
        &self,
        data: &[u8],
        container: ContainerFormat,
        quality: u8,
    ) -> Result<Vec<u8>, OptimizeError>;
}

/// [`ImageTransform`] backed by the `image` and `webp` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct CodecTransform;

impl CodecTransform {
    pub fn new() -> Self {
        Self
    }

    fn decode(data: &[u8]) -> Result<DynamicImage, OptimizeError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| OptimizeError::Transform(format!("decode failed: {}", e)))?
            .decode()
            .map_err(|e| OptimizeError::Transform(format!("decode failed: {}", e)))
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
        // JPEG has no alpha channel
        let rgb = image.to_rgb8();
        let mut output = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| OptimizeError::Transform(format!("jpeg encode failed: {}", e)))?;
        Ok(output.into_inner())
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
        let mut output = Cursor::new(Vec::new());
        let encoder =
            PngEncoder::new_with_quality(&mut output, CompressionType::Best, FilterType::Adaptive);
        let written = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        } else {
            let rgb = image.to_rgb8();
            encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        };
        written.map_err(|e| OptimizeError::Transform(format!("png encode failed: {}", e)))?;
        Ok(output.into_inner())
    }

    fn encode_gif(image: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
        let mut output = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut output);
            encoder
                .encode_frame(Frame::new(image.to_rgba8()))
                .map_err(|e| OptimizeError::Transform(format!("gif encode failed: {}", e)))?;
        }
        Ok(output)
    }

    fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(OptimizeError::Transform("cannot encode an empty image".to_string()));
        }

        let has_alpha = image.color().has_alpha();
        let pixels = if has_alpha {
            image.to_rgba8().into_raw()
        } else {
            image.to_rgb8().into_raw()
        };
        let encoder = if has_alpha {
            webp::Encoder::from_rgba(&pixels, width, height)
        } else {
            webp::Encoder::from_rgb(&pixels, width, height)
        };
        let encoded = encoder
            .encode_simple(false, quality as f32)
            .map_err(|e| OptimizeError::Transform(format!("webp encode failed: {:?}", e)))?;

        if encoded.is_empty() {
            return Err(OptimizeError::Transform("webp encode produced no data".to_string()));
        }
        Ok(encoded.to_vec())
    }
}

impl ImageTransform for CodecTransform {
    fn probe(&self, data: &[u8]) -> Result<ImageMetadata, OptimizeError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| OptimizeError::Metadata(e.to_string()))?;

        let detected = reader
            .format()
            .ok_or_else(|| OptimizeError::Metadata("unknown image format".to_string()))?;
        let format = ContainerFormat::from_image_format(detected).ok_or_else(|| {
            OptimizeError::Metadata(format!("unsupported image format: {:?}", detected))
        })?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| OptimizeError::Metadata(e.to_string()))?;
        if width == 0 {
            return Err(OptimizeError::Metadata("image has no width".to_string()));
        }

        Ok(ImageMetadata {
            width,
            height: (height > 0).then_some(height),
            format,
        })
    }

    fn reencode(
        &self,
        data: &[u8],
        target: IntermediateFormat,
        quality: u8,
    ) -> Result<Vec<u8>, OptimizeError> {
        let image = Self::decode(data)?;
        match target {
            IntermediateFormat::Webp => Self::encode_webp(&image, quality),
            IntermediateFormat::Jpeg => Self::encode_jpeg(&image, quality),
        }
    }

    fn convert(
        &self,
        data: &[u8],
        container: ContainerFormat,
        quality: u8,
    ) -> Result<Vec<u8>, OptimizeError> {
        let image = Self::decode(data)?;
        match container {
            ContainerFormat::Jpeg => Self::encode_jpeg(&image, quality),
            ContainerFormat::Png => Self::encode_png(&image),
            ContainerFormat::Gif => Self::encode_gif(&image),
            ContainerFormat::WebP => Self::encode_webp(&image, quality),
        }
    }
}
