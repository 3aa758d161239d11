//! Per-file transform: decode once, optionally preprocess, encode N ways.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use crate::core::{ComputedOptions, Contents, EncodeOptions, ImageFile, ImageSize, TransformOptions};
use crate::processing::pool::{PoolLease, ResourcePoolManager};
use crate::utils::{PipelineError, PipelineResult};

/// Runs files through the shared codec pool with one set of options.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    manager: ResourcePoolManager,
    options: TransformOptions,
}

impl TransformPipeline {
    pub fn new(manager: ResourcePoolManager, options: TransformOptions) -> Self {
        Self { manager, options }
    }

    pub fn manager(&self) -> &ResourcePoolManager {
        &self.manager
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transforms one file into zero or more output files.
    ///
    /// Content-less files and files with an extension the engine does not
    /// handle come back unchanged. Otherwise the result holds one file per
    /// requested encoder, in the order the encodes finished. If any encode
    /// fails the whole file fails and no output is returned.
    pub async fn process(&self, file: ImageFile) -> PipelineResult<Vec<ImageFile>> {
        if file.is_null() {
            return Ok(vec![file]);
        }
        let contents = match &file.contents {
            Contents::Buffer(bytes) => bytes.clone(),
            _ => return Err(PipelineError::StreamingNotSupported),
        };

        let Some(extname) = file
            .extname()
            .filter(|ext| self.manager.default_options().supports(ext))
        else {
            debug!("Passing through {}", file.path.display());
            return Ok(vec![file]);
        };

        let lease = self
            .manager
            .acquire()
            .map_err(PipelineError::PoolUnavailable)?;
        let result = self.encode_file(&lease, file, &extname, contents).await;
        lease.release();
        result
    }

    async fn encode_file(
        &self,
        lease: &PoolLease,
        file: ImageFile,
        extname: &str,
        contents: Bytes,
    ) -> PipelineResult<Vec<ImageFile>> {
        let mut image = lease
            .pool()
            .decode(contents)
            .await
            .map_err(PipelineError::Decode)?;

        let decoded = image.size();
        let ComputedOptions {
            encode_options,
            preprocess_options,
        } = self.options.resolve(&ImageSize::new(
            decoded.width,
            decoded.height,
            file.path.clone(),
        ));
        let encode = self.encode_options_for(encode_options, extname);

        if let Some(preprocess) = preprocess_options.filter(|p| !p.is_empty()) {
            debug!("Preprocessing {}: {:?}", file.path.display(), preprocess);
            image
                .preprocess(&preprocess)
                .await
                .map_err(PipelineError::Preprocess)?;
        }

        debug!(
            "Encoding {} ({}x{}) as {}",
            file.path.display(),
            decoded.width,
            decoded.height,
            encode.encoders().collect::<Vec<_>>().join(", ")
        );

        let image = &*image;
        let mut pending: FuturesUnordered<_> = encode
            .iter()
            .map(|(encoder, options)| image.encode(encoder, options))
            .collect();

        // Drain every encode before deciding; nothing may still be running
        // on the pool once the lease is released.
        let mut outputs = Vec::with_capacity(encode.len());
        let mut failure = None;
        while let Some(result) = pending.next().await {
            match result {
                Ok(encoded) => {
                    let mut output = file.clone_with_contents(encoded.binary);
                    output.set_extname(&encoded.extension);
                    debug!("{} -> {}", encoded.encoder, output.path.display());
                    outputs.push(output);
                }
                Err(e) => {
                    warn!("Encode failed for {}: {}", file.path.display(), e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(PipelineError::Encode(e)),
            None => Ok(outputs),
        }
    }

    fn encode_options_for(&self, resolved: Option<EncodeOptions>, extname: &str) -> EncodeOptions {
        match resolved {
            Some(options) if !options.is_empty() => options,
            _ => self
                .manager
                .default_options()
                .get(extname)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
