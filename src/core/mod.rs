//! Core pipeline types.
//!
//! - [`ImageFile`]: the file object flowing through the stream
//! - [`EncodeOptions`], [`PreprocessOptions`], [`TransformOptions`]: what to do with it
//! - [`ImageSize`] and [`SizeBox`]: fit-policy geometry for option callbacks
//! - [`PipelineConfig`]: pool and concurrency tuning

mod config;
mod file;
mod size;
mod types;

pub use config::PipelineConfig;
pub use file::{Contents, ImageFile};
pub use size::{ImageSize, SizeBox};
pub use types::{
    ComputedOptions, EncodeOptions, OptionsCallback, PreprocessOptions, QuantOptions,
    ResizeMethod, ResizeOptions, RotateOptions, TransformOptions,
};
