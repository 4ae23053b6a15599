use crate::codec::{Codec, CompressionLevel};
use crate::error::ConfigError;
use crate::service::EncodingService;
use tower::Layer;

/// A Tower layer that negotiates one content-encoding per request and
/// compresses matching responses.
///
/// The configuration is fixed once the layer is built and shared by every
/// service it produces.
#[derive(Debug, Clone)]
pub struct EncodingLayer {
    codec: Codec,
    level: CompressionLevel,
    strict: bool,
}

impl EncodingLayer {
    /// Creates a lenient layer for `codec` at the default level.
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            level: CompressionLevel::Default,
            strict: false,
        }
    }

    /// Creates a lenient gzip layer at the default level.
    pub fn gzip() -> Self {
        Self::new(Codec::Gzip)
    }

    /// Creates a lenient deflate layer at the default level.
    pub fn deflate() -> Self {
        Self::new(Codec::Deflate)
    }

    /// Creates a layer for `codec` at `level`.
    ///
    /// Fails if `level` is out of range for the codec.
    pub fn with_level(codec: Codec, level: CompressionLevel) -> Result<Self, ConfigError> {
        Ok(Self {
            level: level.validate()?,
            ..Self::new(codec)
        })
    }

    /// Sets whether requests that do not accept the codec get a
    /// `406 Not Acceptable` instead of an uncompressed response.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The codec this layer compresses with.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// The configured compression level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Whether unacceptable requests are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl<S> Layer<S> for EncodingLayer {
    type Service = EncodingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EncodingService::new(inner, self.codec, self.level, self.strict)
    }
}
