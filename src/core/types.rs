//! Encode and preprocess option types.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::size::{ImageSize, SizeBox};

/// Mapping from encoder name to that encoder's options object.
///
/// An empty options object (`{}`) means "use the encoder defaults".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodeOptions(BTreeMap<String, Value>);

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single encoder with default settings.
    pub fn single(encoder: impl Into<String>) -> Self {
        Self::new().with(encoder, Value::Object(Default::default()))
    }

    /// Adds or replaces one encoder entry.
    pub fn with(mut self, encoder: impl Into<String>, options: Value) -> Self {
        self.insert(encoder, options);
        self
    }

    pub fn insert(&mut self, encoder: impl Into<String>, options: Value) {
        self.0.insert(encoder.into(), options);
    }

    pub fn get(&self, encoder: &str) -> Option<&Value> {
        self.0.get(encoder)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn encoders(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, options)| (name.as_str(), options))
    }
}

/// Preprocessors to run once on a decoded image before any encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreprocessOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<QuantOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<RotateOptions>,
}

impl PreprocessOptions {
    pub fn is_empty(&self) -> bool {
        self.resize.is_none() && self.quant.is_none() && self.rotate.is_none()
    }

    pub fn with_resize(mut self, resize: ResizeOptions) -> Self {
        self.resize = Some(resize);
        self
    }

    pub fn with_quant(mut self, quant: QuantOptions) -> Self {
        self.quant = Some(quant);
        self
    }

    pub fn with_rotate(mut self, rotate: RotateOptions) -> Self {
        self.rotate = Some(rotate);
        self
    }
}

/// Resampling filter used by the resize preprocessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    Nearest,
    Triangle,
    Catrom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// Resize settings.
///
/// With only one of `width`/`height` the other follows the aspect ratio; with
/// both the image is resized to exactly that size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub method: ResizeMethod,
}

impl ResizeOptions {
    /// Enabled resize to a fixed width, keeping the aspect ratio.
    pub fn width(width: u32) -> Self {
        Self {
            enabled: true,
            width: Some(width),
            ..Self::default()
        }
    }
}

impl From<SizeBox> for ResizeOptions {
    fn from(size: SizeBox) -> Self {
        Self {
            enabled: true,
            width: Some(size.width),
            height: Some(size.height),
            method: ResizeMethod::default(),
        }
    }
}

fn default_num_colors() -> u16 {
    255
}

/// Palette reduction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_num_colors")]
    pub num_colors: u16,
}

impl QuantOptions {
    pub fn colors(num_colors: u16) -> Self {
        Self {
            enabled: true,
            num_colors,
        }
    }
}

impl Default for QuantOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            num_colors: default_num_colors(),
        }
    }
}

/// Rotation in clockwise quarter turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub num_rotations: u8,
}

impl RotateOptions {
    pub fn quarter_turns(num_rotations: u8) -> Self {
        Self {
            enabled: true,
            num_rotations,
        }
    }
}

/// Options chosen for one file, either statically or by a callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedOptions {
    #[serde(default)]
    pub encode_options: Option<EncodeOptions>,
    #[serde(default)]
    pub preprocess_options: Option<PreprocessOptions>,
}

/// Per-file options callback. Invoked once per decoded file.
pub type OptionsCallback = Arc<dyn Fn(&ImageSize) -> ComputedOptions + Send + Sync>;

/// Pipeline configuration: fixed options, or options computed per file from
/// its decoded size.
#[derive(Clone)]
pub enum TransformOptions {
    Static {
        encode: EncodeOptions,
        preprocess: Option<PreprocessOptions>,
    },
    Computed(OptionsCallback),
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::Static {
            encode: EncodeOptions::new(),
            preprocess: None,
        }
    }
}

impl TransformOptions {
    /// Re-encode every file with its extension's default encoder.
    pub fn defaults() -> Self {
        Self::default()
    }

    pub fn encode(encode: EncodeOptions) -> Self {
        Self::Static {
            encode,
            preprocess: None,
        }
    }

    pub fn with_preprocess(encode: EncodeOptions, preprocess: PreprocessOptions) -> Self {
        Self::Static {
            encode,
            preprocess: Some(preprocess),
        }
    }

    pub fn computed<F>(callback: F) -> Self
    where
        F: Fn(&ImageSize) -> ComputedOptions + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(callback))
    }

    /// Builds options from JSON.
    ///
    /// Accepts `null`, a combined object with `encodeOptions` and optional
    /// `preprocessOptions`, or an encoder map (`{"webp": {}}`) that may carry
    /// a nested `preprocessOptions` entry next to the encoders.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) if map.contains_key("encodeOptions") => {
                let options: ComputedOptions = serde_json::from_value(Value::Object(map))?;
                Ok(options.into())
            }
            Value::Object(mut map) => {
                let preprocess: Option<PreprocessOptions> = map
                    .remove("preprocessOptions")
                    .map(serde_json::from_value)
                    .transpose()?;
                let encode: EncodeOptions = serde_json::from_value(Value::Object(map))?;
                Ok(Self::Static { encode, preprocess })
            }
            other => Ok(Self::encode(serde_json::from_value(other)?)),
        }
    }

    /// Resolves the options for one decoded file.
    pub fn resolve(&self, size: &ImageSize) -> ComputedOptions {
        match self {
            Self::Static { encode, preprocess } => ComputedOptions {
                encode_options: Some(encode.clone()),
                preprocess_options: preprocess.clone(),
            },
            Self::Computed(callback) => callback(size),
        }
    }
}

impl From<EncodeOptions> for TransformOptions {
    fn from(encode: EncodeOptions) -> Self {
        Self::encode(encode)
    }
}

impl From<ComputedOptions> for TransformOptions {
    fn from(options: ComputedOptions) -> Self {
        Self::Static {
            encode: options.encode_options.unwrap_or_default(),
            preprocess: options.preprocess_options,
        }
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { encode, preprocess } => f
                .debug_struct("Static")
                .field("encode", encode)
                .field("preprocess", preprocess)
                .finish(),
            Self::Computed(_) => f.write_str("Computed(<callback>)"),
        }
    }
}
