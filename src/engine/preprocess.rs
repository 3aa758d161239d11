//! Preprocessors of the native engine: resize, quantize, rotate.

use color_quant::NeuQuant;
use image::DynamicImage;
use image::imageops::FilterType;

use crate::core::{PreprocessOptions, QuantOptions, ResizeMethod, ResizeOptions, RotateOptions};
use crate::utils::{EngineError, EngineResult};

// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const QUANT_SAMPLE_FACTOR: i32 = 10;

/// Applies every enabled section of `options`, in order resize, quant, rotate.
pub(crate) fn apply(image: DynamicImage, options: &PreprocessOptions) -> EngineResult<DynamicImage> {
    let mut image = image;
    if let Some(resize) = options.resize.as_ref().filter(|r| r.enabled) {
        image = apply_resize(image, resize)?;
    }
    if let Some(quant) = options.quant.as_ref().filter(|q| q.enabled) {
        image = apply_quant(image, quant)?;
    }
    if let Some(rotate) = options.rotate.as_ref().filter(|r| r.enabled) {
        image = apply_rotate(image, rotate);
    }
    Ok(image)
}

fn filter_type(method: ResizeMethod) -> FilterType {
    match method {
        ResizeMethod::Nearest => FilterType::Nearest,
        ResizeMethod::Triangle => FilterType::Triangle,
        ResizeMethod::Catrom => FilterType::CatmullRom,
        ResizeMethod::Gaussian => FilterType::Gaussian,
        ResizeMethod::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Resizes to the requested box. A single dimension keeps the aspect ratio.
fn apply_resize(image: DynamicImage, settings: &ResizeOptions) -> EngineResult<DynamicImage> {
    let (orig_w, orig_h) = (image.width(), image.height());
    let (width, height) = match (settings.width, settings.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale_axis(orig_h, w, orig_w)),
        (None, Some(h)) => (scale_axis(orig_w, h, orig_h), h),
        (None, None) => {
            return Err(EngineError::preprocess(
                "resize: either width or height is required",
            ));
        }
    };

    if width == 0 || height == 0 {
        return Err(EngineError::preprocess(format!(
            "resize: target size {width}x{height} is empty"
        )));
    }
    if (width, height) == (orig_w, orig_h) {
        return Ok(image);
    }

    Ok(image.resize_exact(width, height, filter_type(settings.method)))
}

fn scale_axis(other: u32, target: u32, source: u32) -> u32 {
    let scaled = (f64::from(other) * f64::from(target) / f64::from(source)).round() as u32;
    scaled.max(1)
}

/// Reduces the image to at most `num_colors` colours.
fn apply_quant(image: DynamicImage, settings: &QuantOptions) -> EngineResult<DynamicImage> {
    if !(2..=256).contains(&settings.num_colors) {
        return Err(EngineError::preprocess(format!(
            "quant: numColors must be between 2 and 256, got {}",
            settings.num_colors
        )));
    }

    let mut rgba = image.to_rgba8();
    let quantizer = NeuQuant::new(QUANT_SAMPLE_FACTOR, settings.num_colors as usize, rgba.as_raw());
    let palette = quantizer.color_map_rgba();
    for pixel in rgba.pixels_mut() {
        let index = quantizer.index_of(&pixel.0) * 4;
        pixel.0.copy_from_slice(&palette[index..index + 4]);
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}

fn apply_rotate(image: DynamicImage, settings: &RotateOptions) -> DynamicImage {
    match settings.num_rotations % 4 {
        1 => image.rotate90(),
        2 => image.rotate180(),
        3 => image.rotate270(),
        _ => image,
    }
}
