use crate::error::ConfigError;
use compression_codecs::{EncodeV2, deflate::DeflateEncoder, gzip::GzipEncoder};
use compression_core::Level;
use std::fmt;
use std::str::FromStr;

/// Supported compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Gzip compression (RFC 1952 container).
    Gzip,
    /// Deflate compression (raw RFC 1951 stream).
    Deflate,
}

impl Codec {
    /// Returns the Content-Encoding header value for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
        }
    }

    /// Creates a new encoder for this codec at the given level.
    pub fn encoder(&self, level: CompressionLevel) -> Box<dyn EncodeV2 + Send> {
        let level = level.into_core();
        match self {
            Codec::Gzip => Box::new(GzipEncoder::new(level.into())),
            Codec::Deflate => Box::new(DeflateEncoder::new(level.into())),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_encoding())
    }
}

impl FromStr for Codec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("gzip") || name.eq_ignore_ascii_case("x-gzip") {
            Ok(Codec::Gzip)
        } else if name.eq_ignore_ascii_case("deflate") {
            Ok(Codec::Deflate)
        } else {
            Err(ConfigError::UnsupportedEncoding(name.to_owned()))
        }
    }
}

/// Level of compression data should be compressed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Fastest compression, larger output.
    Fastest,
    /// The encoder's default trade-off.
    #[default]
    Default,
    /// Smallest output, slowest.
    Best,
    /// An explicit level in `0..=9`; `0` stores without compressing.
    Precise(u32),
}

impl CompressionLevel {
    /// Highest level accepted by [`CompressionLevel::Precise`].
    pub const MAX_PRECISE: u32 = 9;

    /// Checks that a [`CompressionLevel::Precise`] value is in range.
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            Self::Precise(n) if n > Self::MAX_PRECISE => Err(ConfigError::InvalidLevel(n.into())),
            level => Ok(level),
        }
    }

    fn into_core(self) -> Level {
        match self {
            Self::Fastest => Level::Fastest,
            Self::Default => Level::Default,
            Self::Best => Level::Best,
            Self::Precise(n) => Level::Precise(n.min(Self::MAX_PRECISE) as i32),
        }
    }
}

impl TryFrom<i32> for CompressionLevel {
    type Error = ConfigError;

    /// Maps zlib-style integers: `-1` is the default level, `0..=9` explicit.
    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            -1 => Ok(Self::Default),
            0..=9 => Ok(Self::Precise(level as u32)),
            other => Err(ConfigError::InvalidLevel(other.into())),
        }
    }
}
