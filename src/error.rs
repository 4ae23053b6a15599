use thiserror::Error;

/// Errors raised while building an [`EncodingLayer`](crate::EncodingLayer).
///
/// These never occur per request: a layer that was built successfully
/// negotiates every request without failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The compression level is outside the range supported by gzip/deflate.
    #[error("invalid compression level {0}, expected -1 (default) or 0..=9")]
    InvalidLevel(i64),
    /// The encoding name is not one this crate can produce.
    #[error("unsupported content encoding `{0}`")]
    UnsupportedEncoding(String),
}
