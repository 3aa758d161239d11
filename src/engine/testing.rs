//! In-memory engine for tests.
//!
//! Contents decode from the ASCII form `"<width>x<height>"`; anything else is
//! a decode failure. Encodes produce `"<encoder>:<width>x<height>"`. Every
//! operation fails with `PoolClosed` if its pool was closed before or while it
//! ran, and closing a pool twice panics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use super::{CodecEngine, DecodedImage, EncodedImage, EncoderInfo, EnginePool};
use crate::core::{PreprocessOptions, SizeBox};
use crate::utils::{EngineError, EngineResult};

const CATALOGUE: [(&str, &str, bool); 4] = [
    ("mozjpeg", "jpg", true),
    ("oxipng", "png", true),
    ("webp", "webp", true),
    ("avif", "avif", false),
];

#[derive(Default)]
pub(crate) struct FakeState {
    pub pools_created: AtomicUsize,
    pub pools_closed: AtomicUsize,
    pub fail_next_create: AtomicBool,
    pub encodes_finished: AtomicUsize,
    pub fail_encoder: Mutex<Option<String>>,
    pub encode_delays: Mutex<HashMap<String, Duration>>,
    pub decode_delay: Mutex<Duration>,
    pub preprocess_calls: Mutex<Vec<PreprocessOptions>>,
    pub encode_calls: Mutex<Vec<(String, Value)>>,
    pub pool_sizes: Mutex<Vec<usize>>,
}

impl FakeState {
    pub fn created(&self) -> usize {
        self.pools_created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.pools_closed.load(Ordering::SeqCst)
    }

    pub fn set_encode_delay(&self, encoder: &str, delay: Duration) {
        self.encode_delays.lock().insert(encoder.to_string(), delay);
    }

    pub fn fail_encoder(&self, encoder: &str) {
        *self.fail_encoder.lock() = Some(encoder.to_string());
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeEngine {
    pub state: Arc<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodecEngine for FakeEngine {
    fn encoders(&self) -> Vec<EncoderInfo> {
        CATALOGUE
            .iter()
            .map(|(name, extension, decodes)| EncoderInfo {
                name: name.to_string(),
                extension: extension.to_string(),
                decodes: *decodes,
            })
            .collect()
    }

    fn create_pool(&self, concurrency: usize) -> EngineResult<Arc<dyn EnginePool>> {
        if self.state.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(EngineError::pool_creation("simulated failure"));
        }
        self.state.pools_created.fetch_add(1, Ordering::SeqCst);
        self.state.pool_sizes.lock().push(concurrency);
        Ok(Arc::new(FakePool {
            shared: Arc::new(PoolShared {
                closed: AtomicBool::new(false),
                state: Arc::clone(&self.state),
            }),
        }))
    }
}

struct PoolShared {
    closed: AtomicBool,
    state: Arc<FakeState>,
}

impl PoolShared {
    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::PoolClosed);
        }
        Ok(())
    }
}

struct FakePool {
    shared: Arc<PoolShared>,
}

fn parse_size(contents: &[u8]) -> Option<SizeBox> {
    let text = std::str::from_utf8(contents).ok()?;
    let (w, h) = text.trim().split_once('x')?;
    Some(SizeBox::new(w.parse().ok()?, h.parse().ok()?))
}

#[async_trait]
impl EnginePool for FakePool {
    async fn decode(&self, contents: Bytes) -> EngineResult<Box<dyn DecodedImage>> {
        self.shared.ensure_open()?;
        let delay = *self.shared.state.decode_delay.lock();
        tokio::time::sleep(delay).await;
        self.shared.ensure_open()?;

        let size = parse_size(&contents).ok_or_else(|| EngineError::decode("unrecognized data"))?;
        Ok(Box::new(FakeImage {
            shared: Arc::clone(&self.shared),
            size,
        }))
    }

    async fn close(&self) -> EngineResult<()> {
        let was_closed = self.shared.closed.swap(true, Ordering::SeqCst);
        assert!(!was_closed, "pool closed twice");
        tokio::task::yield_now().await;
        self.shared.state.pools_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeImage {
    shared: Arc<PoolShared>,
    size: SizeBox,
}

#[async_trait]
impl DecodedImage for FakeImage {
    fn size(&self) -> SizeBox {
        self.size
    }

    async fn preprocess(&mut self, options: &PreprocessOptions) -> EngineResult<()> {
        self.shared.ensure_open()?;
        self.shared.state.preprocess_calls.lock().push(options.clone());
        if let Some(resize) = options.resize.as_ref().filter(|r| r.enabled) {
            self.size = SizeBox::new(
                resize.width.unwrap_or(self.size.width),
                resize.height.unwrap_or(self.size.height),
            );
        }
        Ok(())
    }

    async fn encode(&self, encoder: &str, options: &Value) -> EngineResult<EncodedImage> {
        self.shared.ensure_open()?;
        let state = &self.shared.state;
        let extension = CATALOGUE
            .iter()
            .find(|(name, _, _)| *name == encoder)
            .map(|(_, extension, _)| extension.to_string())
            .ok_or_else(|| EngineError::UnknownEncoder(encoder.to_string()))?;

        state.encode_calls.lock().push((encoder.to_string(), options.clone()));
        let delay = state.encode_delays.lock().get(encoder).copied().unwrap_or_default();
        tokio::time::sleep(delay).await;
        self.shared.ensure_open()?;

        state.encodes_finished.fetch_add(1, Ordering::SeqCst);
        if state.fail_encoder.lock().as_deref() == Some(encoder) {
            return Err(EngineError::encode(encoder, "simulated failure"));
        }

        let binary = format!("{encoder}:{}x{}", self.size.width, self.size.height);
        Ok(EncodedImage {
            encoder: encoder.to_string(),
            binary: Bytes::from(binary),
            extension,
        })
    }
}
