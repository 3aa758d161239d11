use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{StreamExt, stream};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;

use image_optimizer_pipeline::{
    ComputedOptions, EncodeOptions, EngineError, ImageFile, NativeEngine, PipelineConfig,
    PipelineError, PreprocessOptions, ResourcePoolManager, SizeBox, TransformOptions, transform,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn manager() -> ResourcePoolManager {
    let config = PipelineConfig {
        idle_timeout_ms: 20,
        pool_workers: Some(2),
        ..PipelineConfig::default()
    };
    ResourcePoolManager::new(Arc::new(NativeEngine::new()), &config)
}

fn dimensions(file: &ImageFile) -> (u32, u32) {
    let decoded = image::load_from_memory(file.bytes().unwrap()).unwrap();
    (decoded.width(), decoded.height())
}

#[tokio::test]
async fn png_is_reencoded_with_default_encoder() {
    let manager = manager();
    let out = transform(&manager, TransformOptions::defaults())
        .transform_file(ImageFile::buffer("img/dot.png", png(32, 16)))
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].path, PathBuf::from("img/dot.png"));
    assert_eq!(dimensions(&out[0]), (32, 16));
    manager.flush().await;
    assert!(!manager.is_active());
}

#[tokio::test]
async fn one_input_many_formats() {
    let manager = manager();
    let encode = EncodeOptions::single("webp")
        .with("mozjpeg", json!({"quality": 80}))
        .with("oxipng", json!({"level": 4}));

    let mut out = transform(&manager, encode)
        .transform_file(ImageFile::buffer("photo.png", png(24, 24)))
        .await
        .unwrap();
    out.sort_by(|a, b| a.path.cmp(&b.path));

    let paths: Vec<_> = out.iter().map(|f| f.path.clone()).collect();
    assert_eq!(paths, ["photo.jpg", "photo.png", "photo.webp"].map(PathBuf::from));
    for file in &out {
        assert_eq!(dimensions(file), (24, 24), "{}", file.path.display());
    }
}

#[tokio::test]
async fn callback_resize_reaches_the_pixels() {
    let manager = manager();
    let options = TransformOptions::computed(|size| ComputedOptions {
        encode_options: None,
        preprocess_options: Some(
            PreprocessOptions::default().with_resize(size.contain(200, None).into()),
        ),
    });

    let out = transform(&manager, options)
        .transform_file(ImageFile::buffer("wide.png", png(400, 200)))
        .await
        .unwrap();
    assert_eq!(dimensions(&out[0]), (200, 100));
}

#[tokio::test]
async fn square_png_to_avif() {
    let manager = manager();
    let options = TransformOptions::with_preprocess(
        EncodeOptions::new().with("avif", json!({"speed": 10})),
        PreprocessOptions::default().with_resize(SizeBox::new(100, 100).into()),
    );

    let out = transform(&manager, options)
        .transform_file(ImageFile::buffer("logo.png", png(200, 200)))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].path, PathBuf::from("logo.avif"));
    assert!(!out[0].bytes().unwrap().is_empty());
}

#[tokio::test]
async fn square_png_to_avif_from_encoder_map_json() {
    let manager = manager();
    let options = TransformOptions::from_json(json!({
        "avif": {"speed": 10},
        "preprocessOptions": {"resize": {"enabled": true, "width": 100, "height": 100}}
    }))
    .unwrap();

    let out = transform(&manager, options)
        .transform_file(ImageFile::buffer("logo.png", png(200, 200)))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].path, PathBuf::from("logo.avif"));
    assert!(!out[0].bytes().unwrap().is_empty());
}

#[tokio::test]
async fn mixed_stream_reports_bad_files_and_passes_others() {
    let manager = manager();
    let files = vec![
        ImageFile::buffer("a.png", png(8, 8)),
        ImageFile::buffer("broken.jpg", b"definitely not a jpeg".to_vec()),
        ImageFile::buffer("readme.md", b"# hi".to_vec()),
        ImageFile::null("nested"),
    ];

    let results: Vec<_> = transform(&manager, TransformOptions::defaults())
        .transform_stream(stream::iter(files))
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, PathBuf::from("broken.jpg"));

    let readme = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .find(|f| f.path == PathBuf::from("readme.md"))
        .unwrap();
    assert_eq!(&readme.bytes().unwrap()[..], b"# hi");
}

#[tokio::test]
async fn options_from_json() {
    let manager = manager();
    let options = TransformOptions::from_json(json!({
        "encodeOptions": {"webp": {}},
        "preprocessOptions": {"rotate": {"enabled": true, "numRotations": 1}}
    }))
    .unwrap();

    let out = transform(&manager, options)
        .transform_file(ImageFile::buffer("tall.png", png(10, 30)))
        .await
        .unwrap();
    assert_eq!(out[0].path, PathBuf::from("tall.webp"));
    assert_eq!(dimensions(&out[0]), (30, 10));
}

#[tokio::test]
async fn bad_quant_settings_fail_in_preprocess() {
    let manager = manager();
    let options = TransformOptions::from_json(json!({
        "webp": {},
        "preprocessOptions": {"quant": {"enabled": true, "numColors": 1}}
    }))
    .unwrap();

    let err = transform(&manager, options)
        .transform_file(ImageFile::buffer("flat.png", png(8, 8)))
        .await
        .unwrap_err();
    assert_eq!(err.path, PathBuf::from("flat.png"));
    assert!(
        matches!(err.source, PipelineError::Preprocess(EngineError::Preprocess(_))),
        "{:?}",
        err.source
    );
}
