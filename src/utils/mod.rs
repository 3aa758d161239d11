pub mod error;
pub mod fs;

pub use error::{
    ConfigError, EngineError, EngineResult, PLUGIN_NAME, PipelineError, PipelineResult,
    PluginError,
};
