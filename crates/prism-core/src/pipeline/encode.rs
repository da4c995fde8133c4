//! Encoding augmented images and writing them without clobbering files.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{PipelineError, PipelineResult};

/// Upper bound on numeric suffixes tried for one base name.
const MAX_SUFFIX: u32 = 100_000;

/// Encodes images in the configured output format.
#[derive(Debug, Clone)]
pub struct ImageEncoder {
    config: OutputConfig,
}

/// Encoded bytes ready to be written, with the extension to write them under.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub extension: String,
}

impl ImageEncoder {
    /// Create a new encoder with the given output settings.
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Pick the output format for an image decoded as `source`.
    ///
    /// Source formats the encoder cannot write fall back to PNG.
    pub fn target_format(&self, source: ImageFormat) -> ImageFormat {
        match self.config.format.as_str() {
            "png" => ImageFormat::Png,
            "jpeg" => ImageFormat::Jpeg,
            _ => match source {
                ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Gif
                | ImageFormat::Tiff
                | ImageFormat::WebP => source,
                _ => ImageFormat::Png,
            },
        }
    }

    /// Encode to bytes. `path` is only used for error context.
    pub fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        path: &Path,
    ) -> PipelineResult<Vec<u8>> {
        let prepared = prepare(image, format);
        let mut buffer = Cursor::new(Vec::new());
        let result = if format == ImageFormat::Jpeg {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, self.config.jpeg_quality);
            prepared.write_with_encoder(encoder)
        } else {
            prepared.write_to(&mut buffer, format)
        };
        result.map_err(|e| PipelineError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(buffer.into_inner())
    }

    /// Encode `image` in the target format for a `source_format` input.
    pub fn encode_for(
        &self,
        image: &DynamicImage,
        source_format: ImageFormat,
        source_path: &Path,
    ) -> PipelineResult<EncodedImage> {
        let format = self.target_format(source_format);
        Ok(EncodedImage {
            bytes: self.encode(image, format, source_path)?,
            format,
            extension: extension_for(format, source_path),
        })
    }

    /// Reuse the untouched source bytes when no re-encoding is needed.
    ///
    /// Returns `None` when the configured output format differs from the
    /// source format, in which case the caller has to encode.
    pub fn passthrough(
        &self,
        bytes: Vec<u8>,
        source_format: ImageFormat,
        source_path: &Path,
    ) -> Option<EncodedImage> {
        (self.target_format(source_format) == source_format).then(|| EncodedImage {
            bytes,
            format: source_format,
            extension: extension_for(source_format, source_path),
        })
    }
}

/// Write `encoded` to `{dir}/{base}__{NNN}.{ext}` using the first suffix that
/// does not exist yet. Files are opened with `create_new`, so nothing already
/// on disk is ever overwritten.
pub fn write_unique(encoded: &EncodedImage, dir: &Path, base: &str) -> PipelineResult<PathBuf> {
    create_unique(&encoded.bytes, dir, base, &encoded.extension)
}

fn create_unique(bytes: &[u8], dir: &Path, base: &str, ext: &str) -> PipelineResult<PathBuf> {
    for n in 1..=MAX_SUFFIX {
        let path = dir.join(format!("{base}__{n:03}.{ext}"));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(PipelineError::io(&path, e)),
        };
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| PipelineError::io(&path, e))?;
        return Ok(path);
    }

    Err(PipelineError::io(
        dir.join(base),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free output filename"),
    ))
}

/// Keep the source extension when it already names `format`, else use the
/// format's canonical extension.
fn extension_for(format: ImageFormat, source_path: &Path) -> String {
    let candidates = format.extensions_str();
    source_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| candidates.contains(&ext.as_str()))
        .unwrap_or_else(|| candidates.first().copied().unwrap_or("png").to_string())
}

/// Convert pixel layouts the target encoder cannot handle.
fn prepare(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    let convert = match format {
        ImageFormat::Jpeg => match color {
            ColorType::L8 | ColorType::Rgb8 => None,
            ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                Some(DynamicImage::ImageLuma8(image.to_luma8()))
            }
            _ => Some(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        ImageFormat::Png => match color {
            ColorType::Rgb32F | ColorType::Rgba32F => {
                Some(DynamicImage::ImageRgba16(image.to_rgba16()))
            }
            _ => None,
        },
        _ => match color {
            ColorType::Rgb8 | ColorType::Rgba8 => None,
            _ if color.has_alpha() => Some(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Some(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
    };
    match convert {
        Some(converted) => Cow::Owned(converted),
        None => Cow::Borrowed(image),
    }
}
