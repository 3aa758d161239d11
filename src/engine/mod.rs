//! Codec engine boundary.
//!
//! The pipeline never touches pixels itself. It talks to a [`CodecEngine`],
//! which advertises its encoders and creates [`EnginePool`]s; a pool decodes
//! bytes into a [`DecodedImage`], which can be preprocessed in place and
//! encoded any number of times.
//!
//! - [`NativeEngine`]: engine built on the `image` crate.

mod formats;
mod native;
mod preprocess;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::core::{PreprocessOptions, SizeBox};
use crate::utils::EngineResult;

pub use native::NativeEngine;

/// An encoder advertised by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderInfo {
    /// Name used as the key in encode options, e.g. `"oxipng"`
    pub name: String,
    /// Canonical output extension without the dot, e.g. `"png"`
    pub extension: String,
    /// Whether the engine can also decode files with this extension
    pub decodes: bool,
}

/// Output of one encode.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub encoder: String,
    pub binary: Bytes,
    pub extension: String,
}

/// A codec library able to create worker pools.
pub trait CodecEngine: Send + Sync + 'static {
    /// Encoders this engine provides. Read once when a pool manager is built.
    fn encoders(&self) -> Vec<EncoderInfo>;

    /// Creates a pool running at most `concurrency` jobs at a time.
    fn create_pool(&self, concurrency: usize) -> EngineResult<Arc<dyn EnginePool>>;
}

/// Shared worker pool of an engine.
#[async_trait]
pub trait EnginePool: Send + Sync {
    /// Decodes encoded bytes into a bitmap.
    async fn decode(&self, contents: Bytes) -> EngineResult<Box<dyn DecodedImage>>;

    /// Releases the pool's resources. Work submitted afterwards fails.
    async fn close(&self) -> EngineResult<()>;
}

/// A decoded bitmap bound to the pool that produced it.
#[async_trait]
pub trait DecodedImage: Send + Sync {
    fn size(&self) -> SizeBox;

    /// Applies the enabled preprocessors, replacing the bitmap.
    async fn preprocess(&mut self, options: &PreprocessOptions) -> EngineResult<()>;

    /// Encodes the current bitmap with one encoder.
    async fn encode(&self, encoder: &str, options: &Value) -> EngineResult<EncodedImage>;
}
