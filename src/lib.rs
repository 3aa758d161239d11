// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod engine;
pub mod processing;

// Public exports for external consumers
pub use crate::core::{
    ComputedOptions, Contents, EncodeOptions, ImageFile, ImageSize, PipelineConfig,
    PreprocessOptions, SizeBox, TransformOptions,
};
pub use engine::{CodecEngine, NativeEngine};
pub use processing::{
    DefaultEncodeOptions, FileTransformer, PoolLease, ResourcePoolManager, TransformPipeline,
    transform,
};
pub use utils::{EngineError, PipelineError, PluginError};
