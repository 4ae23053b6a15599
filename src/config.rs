use crate::codec::{Codec, CompressionLevel};
use crate::error::ConfigError;
use crate::layer::EncodingLayer;
use serde::{Deserialize, Serialize};

/// Serializable settings for an [`EncodingLayer`].
///
/// ```
/// use content_encoding_filter::EncodingConfig;
///
/// let config = EncodingConfig {
///     encoding: "deflate".into(),
///     level: 9,
///     strict: true,
/// };
/// let layer = config.build().unwrap();
/// assert!(layer.is_strict());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Content-coding name, `gzip` or `deflate`.
    pub encoding: String,
    /// zlib-style level: `-1` for the default, otherwise `0..=9`.
    pub level: i32,
    /// Reject unacceptable requests with 406 instead of passing them through.
    pub strict: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            encoding: Codec::Gzip.content_encoding().to_owned(),
            level: -1,
            strict: false,
        }
    }
}

impl EncodingConfig {
    /// Validates the settings and builds the layer.
    pub fn build(&self) -> Result<EncodingLayer, ConfigError> {
        let codec: Codec = self.encoding.parse()?;
        let level = CompressionLevel::try_from(self.level)?;
        Ok(EncodingLayer::with_level(codec, level)?.strict(self.strict))
    }
}

impl TryFrom<EncodingConfig> for EncodingLayer {
    type Error = ConfigError;

    fn try_from(config: EncodingConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let layer = EncodingConfig::default().build().unwrap();
        assert_eq!(layer.codec(), Codec::Gzip);
        assert_eq!(layer.level(), CompressionLevel::Default);
        assert!(!layer.is_strict());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EncodingConfig =
            serde_json::from_str(r#"{"encoding": "deflate", "strict": true}"#).unwrap();
        assert_eq!(config.level, -1);

        let layer = EncodingLayer::try_from(config).unwrap();
        assert_eq!(layer.codec(), Codec::Deflate);
        assert!(layer.is_strict());
    }

    #[test]
    fn test_invalid_config() {
        let config: EncodingConfig = serde_json::from_str(r#"{"level": 42}"#).unwrap();
        assert_eq!(config.build().unwrap_err(), ConfigError::InvalidLevel(42));

        let config: EncodingConfig = serde_json::from_str(r#"{"encoding": "zstd"}"#).unwrap();
        assert_eq!(
            config.build().unwrap_err(),
            ConfigError::UnsupportedEncoding("zstd".to_owned())
        );
    }
}
