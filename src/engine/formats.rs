//! Encoder catalogue of the native engine and the mapping from per-encoder
//! JSON options to `image` codec settings.

use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::engine::EncoderInfo;
use crate::utils::{EngineError, EngineResult};

// ── Default settings ──────────────────────────────────────────────────────────────────

const JPEG_QUALITY: u8 = 75;
const PNG_LEVEL: u8 = 2;
const AVIF_QUALITY: u8 = 50;
const AVIF_SPEED: u8 = 6;

/// Encoders provided by the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoder {
    Mozjpeg,
    Oxipng,
    Webp,
    Avif,
}

impl Encoder {
    pub(crate) const ALL: [Encoder; 4] = [Self::Mozjpeg, Self::Oxipng, Self::Webp, Self::Avif];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Mozjpeg => "mozjpeg",
            Self::Oxipng => "oxipng",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Mozjpeg => "jpg",
            Self::Oxipng => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// AVIF can be written but not read back.
    fn decodes(self) -> bool {
        !matches!(self, Self::Avif)
    }

    pub(crate) fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|encoder| encoder.name() == name)
            .ok_or_else(|| EngineError::UnknownEncoder(name.to_string()))
    }

    /// Encodes `image`, applying `options` over this encoder's defaults.
    pub(crate) fn encode(self, image: &DynamicImage, options: &Value) -> EngineResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let result = match self {
            Self::Mozjpeg => {
                let opts: MozjpegOptions = parse_options(self.name(), options)?;
                check_quality(self.name(), opts.quality)?;
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, opts.quality))
            }
            Self::Oxipng => {
                let opts: OxipngOptions = parse_options(self.name(), options)?;
                let compression = match opts.level {
                    0..=1 => CompressionType::Fast,
                    2..=4 => CompressionType::Default,
                    _ => CompressionType::Best,
                };
                image.write_with_encoder(PngEncoder::new_with_quality(
                    &mut buffer,
                    compression,
                    FilterType::Adaptive,
                ))
            }
            Self::Webp => {
                let _: WebpOptions = parse_options(self.name(), options)?;
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
            }
            Self::Avif => {
                let opts: AvifOptions = parse_options(self.name(), options)?;
                check_quality(self.name(), opts.quality)?;
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                    &mut buffer,
                    opts.speed.clamp(1, 10),
                    opts.quality,
                ))
            }
        };

        result.map_err(|e| EngineError::encode(self.name(), e.to_string()))?;
        Ok(buffer)
    }
}

lazy_static! {
    /// Advertised encoder list, built once.
    pub(crate) static ref ENCODERS: Vec<EncoderInfo> = Encoder::ALL
        .into_iter()
        .map(|encoder| EncoderInfo {
            name: encoder.name().to_string(),
            extension: encoder.extension().to_string(),
            decodes: encoder.decodes(),
        })
        .collect();
}

// ── Per-encoder options ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MozjpegOptions {
    quality: u8,
}

impl Default for MozjpegOptions {
    fn default() -> Self {
        Self { quality: JPEG_QUALITY }
    }
}

/// `level` follows oxipng's 0-6 scale, bucketed onto the PNG compression presets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OxipngOptions {
    level: u8,
}

impl Default for OxipngOptions {
    fn default() -> Self {
        Self { level: PNG_LEVEL }
    }
}

/// WebP output is always lossless; no settings are read.
#[derive(Debug, Default, Deserialize)]
struct WebpOptions {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AvifOptions {
    quality: u8,
    speed: u8,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            quality: AVIF_QUALITY,
            speed: AVIF_SPEED,
        }
    }
}

/// Deserializes an options object; `null` means defaults.
pub(crate) fn parse_options<T>(name: &str, options: &Value) -> EngineResult<T>
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    T::deserialize(options).map_err(|e| EngineError::invalid_options(name, e.to_string()))
}

fn check_quality(name: &str, quality: u8) -> EngineResult<()> {
    if quality == 0 || quality > 100 {
        return Err(EngineError::invalid_options(
            name,
            format!("quality must be between 1 and 100, got {quality}"),
        ));
    }
    Ok(())
}
