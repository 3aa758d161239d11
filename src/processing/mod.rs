mod defaults;
mod pipeline;
mod pool;
mod stream;

pub use defaults::DefaultEncodeOptions;
pub use pipeline::TransformPipeline;
pub use pool::{PoolLease, ResourcePoolManager};
pub use stream::{FileTransformer, transform};
