//! File-stream adapter around [`TransformPipeline`].

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

use crate::core::{ImageFile, TransformOptions};
use crate::processing::pipeline::TransformPipeline;
use crate::processing::pool::ResourcePoolManager;
use crate::utils::PluginError;

/// Builds a transformer that runs files through `manager`'s shared pool.
///
/// `options` may be [`TransformOptions`], a bare
/// [`EncodeOptions`](crate::core::EncodeOptions) map, or
/// [`ComputedOptions`](crate::core::ComputedOptions).
pub fn transform(
    manager: &ResourcePoolManager,
    options: impl Into<TransformOptions>,
) -> FileTransformer {
    FileTransformer::new(TransformPipeline::new(manager.clone(), options.into()))
}

/// Accepts files and yields the transformed files, with per-file errors
/// tagged by plugin name and path.
#[derive(Debug, Clone)]
pub struct FileTransformer {
    pipeline: Arc<TransformPipeline>,
    max_concurrent_files: usize,
}

impl FileTransformer {
    /// The concurrency cap starts at the manager's configured
    /// `maxConcurrentFiles`.
    pub fn new(pipeline: TransformPipeline) -> Self {
        Self {
            max_concurrent_files: pipeline.manager().max_concurrent_files(),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Caps how many files are between decode and emit at once; at least 1.
    pub fn with_max_concurrent_files(mut self, limit: usize) -> Self {
        self.max_concurrent_files = limit.max(1);
        self
    }

    pub fn max_concurrent_files(&self) -> usize {
        self.max_concurrent_files
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Transforms a single file.
    pub async fn transform_file(&self, file: ImageFile) -> Result<Vec<ImageFile>, PluginError> {
        let path = file.path.clone();
        match self.pipeline.process(file).await {
            Ok(outputs) => {
                info!("Processed {} ({} outputs)", path.display(), outputs.len());
                Ok(outputs)
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                Err(PluginError::new(path, e))
            }
        }
    }

    /// Transforms every file of `files`.
    ///
    /// Up to [`max_concurrent_files`](Self::max_concurrent_files) files are in
    /// flight at once and results are yielded as files finish, so output
    /// order across files is not the input order. A failed file yields one
    /// error and does not stop the others.
    pub fn transform_stream<S>(
        &self,
        files: S,
    ) -> impl Stream<Item = Result<ImageFile, PluginError>> + Send + use<S>
    where
        S: Stream<Item = ImageFile> + Send + 'static,
    {
        let transformer = self.clone();
        files
            .map(move |file| {
                let transformer = transformer.clone();
                async move { transformer.transform_file(file).await }
            })
            .buffer_unordered(self.max_concurrent_files)
            .flat_map(|result| {
                let items = match result {
                    Ok(outputs) => outputs.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
    }
}
