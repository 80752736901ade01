//! Image decoding and preparation for embedding

use crate::layout::ImageDimensions;
use crate::types::ImageFailure;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// One entry of a conversion request
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Image file on disk
    Path(PathBuf),
    /// Image already in memory
    Memory { name: String, bytes: Arc<[u8]> },
}

impl ImageSource {
    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        ImageSource::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Human-readable name for logs and error messages
    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Memory { name, .. } => name.clone(),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

/// PDF stream filter of an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// Original JPEG bytes, embedded unchanged
    DctDecode,
    /// Raw 8-bit samples, zlib-compressed
    FlateDecode,
}

impl ImageFilter {
    pub fn pdf_name(self) -> &'static str {
        match self {
            ImageFilter::DctDecode => "DCTDecode",
            ImageFilter::FlateDecode => "FlateDecode",
        }
    }
}

/// Color space of an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageColorSpace {
    DeviceRgb,
    DeviceGray,
}

impl ImageColorSpace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            ImageColorSpace::DeviceRgb => "DeviceRGB",
            ImageColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// Image data ready to be written as a PDF image XObject
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub filter: ImageFilter,
    pub color_space: ImageColorSpace,
    pub data: Vec<u8>,
    /// Zlib-compressed 8-bit alpha channel, if the image has one
    pub soft_mask: Option<Vec<u8>>,
}

/// A decoded image: its measured size plus its embeddable form
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub dimensions: ImageDimensions,
    pub encoded: EncodedImage,
}

/// Read and decode one image source.
pub async fn load_image(source: &ImageSource) -> Result<DecodedImage, ImageFailure> {
    let bytes: Arc<[u8]> = match source {
        ImageSource::Path(path) => tokio::fs::read(path).await?.into(),
        ImageSource::Memory { bytes, .. } => Arc::clone(bytes),
    };

    // Decoding and compression are CPU-bound
    tokio::task::spawn_blocking(move || decode_image(&bytes)).await?
}

/// Decode image bytes, measure them and prepare them for embedding.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, ImageFailure> {
    let format = image::guess_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)?;

    let (width_px, height_px) = (image.width(), image.height());
    let dimensions = ImageDimensions::from_pixels(width_px, height_px).ok_or(
        ImageFailure::InvalidDimensions {
            width: width_px,
            height: height_px,
        },
    )?;

    let passthrough = match format {
        ImageFormat::Jpeg => jpeg_passthrough_space(bytes)?,
        _ => None,
    };
    let encoded = match passthrough {
        Some(color_space) => EncodedImage {
            width_px,
            height_px,
            filter: ImageFilter::DctDecode,
            color_space,
            data: bytes.to_vec(),
            soft_mask: None,
        },
        None => encode_raster(&image)?,
    };

    log::debug!(
        "Decoded {:?} image {}x{} ({})",
        format,
        width_px,
        height_px,
        encoded.filter.pdf_name()
    );

    Ok(DecodedImage {
        dimensions,
        encoded,
    })
}

/// Color space for embedding a JPEG unchanged, from the components stored in
/// the file. CMYK and YCCK decode to RGB and must be re-encoded.
fn jpeg_passthrough_space(bytes: &[u8]) -> Result<Option<ImageColorSpace>, ImageFailure> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))?;
    Ok(match decoder.original_color_type() {
        ExtendedColorType::Rgb8 => Some(ImageColorSpace::DeviceRgb),
        ExtendedColorType::L8 => Some(ImageColorSpace::DeviceGray),
        _ => None,
    })
}

fn encode_raster(image: &DynamicImage) -> Result<EncodedImage, ImageFailure> {
    let soft_mask = if image.color().has_alpha() {
        let alphas: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
        Some(zlib_compress(&alphas)?)
    } else {
        None
    };

    let rgb = image.to_rgb8();
    Ok(EncodedImage {
        width_px: rgb.width(),
        height_px: rgb.height(),
        filter: ImageFilter::FlateDecode,
        color_space: ImageColorSpace::DeviceRgb,
        data: zlib_compress(rgb.as_raw())?,
        soft_mask,
    })
}

fn zlib_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
