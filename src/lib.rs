//! `Accept-Encoding` negotiation and response compression middleware for Tower.
//!
//! An [`EncodingLayer`] is configured with one codec (gzip or deflate), a
//! compression level and a strict flag. For every request it parses the
//! client's `Accept-Encoding` header and decides whether the codec is
//! acceptable:
//!
//! - accepted: the response body is compressed as it streams and
//!   `Content-Encoding` is set;
//! - not accepted, strict: the request is answered with `406 Not Acceptable`
//!   and the inner service is never called;
//! - not accepted, lenient: the response passes through uncompressed.
//!
//! # Example
//!
//! ```ignore
//! use content_encoding_filter::EncodingLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(EncodingLayer::gzip().strict(true))
//!     .service(my_service);
//! ```
//!
//! # Negotiation Rules
//!
//! - An absent or empty `Accept-Encoding` header accepts any encoding.
//! - An entry naming the codec decides on its own: `q=0` rejects, anything
//!   else accepts, whatever a `*` entry says.
//! - Otherwise a `*` entry decides the same way.
//! - Otherwise the codec is not acceptable.
//!
//! # Response Modifications
//!
//! When compression is applied:
//! - `Content-Encoding` header is set to the codec used
//! - `Content-Length` and `Accept-Ranges` headers are removed
//! - `Vary` header includes `Accept-Encoding`
//!
//! Responses that already have a `Content-Encoding`, carry a `Content-Range`,
//! or have a bodiless status (1xx, 204, 304) are never compressed.

#![deny(missing_docs)]

mod accept;
mod body;
mod codec;
mod config;
mod error;
mod future;
mod layer;
mod service;

pub use accept::{AcceptEncoding, Preference};
pub use body::EncodingBody;
pub use codec::{Codec, CompressionLevel};
pub use config::EncodingConfig;
pub use error::ConfigError;
pub use future::ResponseFuture;
pub use layer::EncodingLayer;
pub use service::EncodingService;
