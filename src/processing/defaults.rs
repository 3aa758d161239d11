//! Default encoder per file extension.

use std::collections::BTreeMap;

use crate::core::EncodeOptions;
use crate::engine::EncoderInfo;

/// Extension → single-encoder options, e.g. `".png"` → `{oxipng: {}}`.
///
/// Built once from an engine's advertised encoders. Only extensions the
/// engine can also decode are listed; every other file passes through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultEncodeOptions {
    by_extension: BTreeMap<String, EncodeOptions>,
}

impl DefaultEncodeOptions {
    pub fn from_encoders(encoders: &[EncoderInfo]) -> Self {
        let by_extension = encoders
            .iter()
            .filter(|encoder| encoder.decodes)
            .map(|encoder| {
                (
                    format!(".{}", encoder.extension.to_lowercase()),
                    EncodeOptions::single(&encoder.name),
                )
            })
            .collect();
        Self { by_extension }
    }

    /// Looks up an extension given as `".png"`; matching ignores case.
    pub fn get(&self, extname: &str) -> Option<&EncodeOptions> {
        self.by_extension.get(&extname.to_lowercase())
    }

    pub fn supports(&self, extname: &str) -> bool {
        self.get(extname).is_some()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }
}
