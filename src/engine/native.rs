//! Native codec engine built on the `image` crate.
//!
//! Each decode, preprocess and encode runs inside `tokio::task::spawn_blocking`
//! so the async runtime is never blocked. A pool is a worker budget: a
//! semaphore with one permit per worker, closed when the pool is closed.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use super::formats::{ENCODERS, Encoder};
use super::{CodecEngine, DecodedImage, EncodedImage, EncoderInfo, EnginePool, preprocess};
use crate::core::{PreprocessOptions, SizeBox};
use crate::utils::{EngineError, EngineResult};

/// Engine backed by the `image` crate's codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl CodecEngine for NativeEngine {
    fn encoders(&self) -> Vec<EncoderInfo> {
        ENCODERS.clone()
    }

    fn create_pool(&self, concurrency: usize) -> EngineResult<Arc<dyn EnginePool>> {
        if concurrency == 0 {
            return Err(EngineError::pool_creation("pool needs at least one worker"));
        }
        debug!("Creating native codec pool with {} workers", concurrency);
        Ok(Arc::new(NativePool {
            workers: Arc::new(Semaphore::new(concurrency)),
        }))
    }
}

struct NativePool {
    workers: Arc<Semaphore>,
}

/// Runs `job` on the blocking thread pool once a worker permit is free.
async fn run_job<T, F>(workers: &Semaphore, job: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    let _permit = workers.acquire().await?;
    tokio::task::spawn_blocking(job).await?
}

#[async_trait]
impl EnginePool for NativePool {
    async fn decode(&self, contents: Bytes) -> EngineResult<Box<dyn DecodedImage>> {
        let bitmap = run_job(&self.workers, move || {
            image::load_from_memory(&contents).map_err(|e| EngineError::decode(e.to_string()))
        })
        .await?;

        Ok(Box::new(NativeImage {
            workers: Arc::clone(&self.workers),
            bitmap: Arc::new(bitmap),
        }))
    }

    async fn close(&self) -> EngineResult<()> {
        self.workers.close();
        debug!("Native codec pool closed");
        Ok(())
    }
}

struct NativeImage {
    workers: Arc<Semaphore>,
    bitmap: Arc<DynamicImage>,
}

#[async_trait]
impl DecodedImage for NativeImage {
    fn size(&self) -> SizeBox {
        SizeBox::new(self.bitmap.width(), self.bitmap.height())
    }

    async fn preprocess(&mut self, options: &PreprocessOptions) -> EngineResult<()> {
        let bitmap = Arc::clone(&self.bitmap);
        let options = options.clone();
        let processed = run_job(&self.workers, move || {
            preprocess::apply(Arc::unwrap_or_clone(bitmap), &options)
        })
        .await?;
        self.bitmap = Arc::new(processed);
        Ok(())
    }

    async fn encode(&self, encoder: &str, options: &Value) -> EngineResult<EncodedImage> {
        let codec = Encoder::from_name(encoder)?;
        let bitmap = Arc::clone(&self.bitmap);
        let options = options.clone();
        let binary = run_job(&self.workers, move || codec.encode(&bitmap, &options)).await?;

        Ok(EncodedImage {
            encoder: codec.name().to_string(),
            binary: Bytes::from(binary),
            extension: codec.extension().to_string(),
        })
    }
}
