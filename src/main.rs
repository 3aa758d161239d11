// Command-line front end: re-encodes every image of a directory tree into
// another directory through the shared codec pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, bail};
use clap::Parser;
use futures::{StreamExt, future, stream};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use image_optimizer_pipeline::utils::fs;
use image_optimizer_pipeline::{
    NativeEngine, PipelineConfig, ResourcePoolManager, TransformOptions, transform,
};

#[derive(Parser, Debug)]
#[command(name = "image-optimizer-pipeline", version, about)]
struct Cli {
    /// Directory to read files from
    input: PathBuf,

    /// Directory the processed files are written to
    output: PathBuf,

    /// Encode/preprocess options: inline JSON or a path to a JSON file
    #[arg(long)]
    options: Option<String>,

    /// Pipeline config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `image_optimizer_pipeline=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn load_options(raw: Option<&str>) -> anyhow::Result<TransformOptions> {
    let Some(raw) = raw else {
        return Ok(TransformOptions::defaults());
    };

    let json = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw).with_context(|| format!("Cannot read options file '{raw}'"))?
    };
    let value = serde_json::from_str(&json).context("Options are not valid JSON")?;
    TransformOptions::from_json(value).context("Invalid options")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    let options = load_options(cli.options.as_deref())?;
    debug!("Config: {:?}", config);
    debug!("Options: {:?}", options);

    let entries = fs::list_entries(&cli.input)
        .with_context(|| format!("Cannot list '{}'", cli.input.display()))?;
    info!("Processing {} entries from {}", entries.len(), cli.input.display());

    let manager = ResourcePoolManager::new(Arc::new(NativeEngine::new()), &config);
    let transformer =
        transform(&manager, options).with_max_concurrent_files(config.max_concurrent_files());

    let read_failures = Arc::new(AtomicUsize::new(0));
    let input = cli.input.clone();
    let failures = Arc::clone(&read_failures);
    let files = stream::iter(entries)
        .then(move |path| {
            let input = input.clone();
            async move {
                let result = fs::read_image_file(&input, &path).await;
                (path, result)
            }
        })
        .filter_map(move |(path, result)| {
            future::ready(match result {
                Ok(file) => Some(file),
                Err(e) => {
                    error!("Cannot read {}: {}", path.display(), e);
                    failures.fetch_add(1, Ordering::Relaxed);
                    None
                }
            })
        });

    let mut results = std::pin::pin!(transformer.transform_stream(files));
    let (mut written, mut failed) = (0usize, 0usize);
    while let Some(result) = results.next().await {
        match result {
            Ok(file) => match fs::write_image_file(&cli.output, &file).await {
                Ok(path) => {
                    debug!("Wrote {}", path.display());
                    written += 1;
                }
                Err(e) => {
                    error!("Cannot write {}: {}", file.path.display(), e);
                    failed += 1;
                }
            },
            Err(e) => {
                error!("{}", e);
                failed += 1;
            }
        }
    }

    manager.flush().await;

    let failed = failed + read_failures.load(Ordering::Relaxed);
    info!("Done: {} files written, {} failures", written, failed);
    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}
