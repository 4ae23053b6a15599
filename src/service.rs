use crate::accept::AcceptEncoding;
use crate::codec::{Codec, CompressionLevel};
use crate::future::ResponseFuture;
use http::Request;
use std::task::{Context, Poll};
use tower::Service;

/// Outcome of negotiating one request against the configured codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Negotiation {
    /// The client accepts the codec.
    Compress(Codec),
    /// Not accepted, but the filter is lenient.
    Passthrough,
    /// Not accepted and the filter is strict.
    Reject,
}

impl Negotiation {
    pub(crate) fn decide(accept: &AcceptEncoding, codec: Codec, strict: bool) -> Self {
        if accept.accepts(codec.content_encoding()) {
            Negotiation::Compress(codec)
        } else if strict {
            Negotiation::Reject
        } else {
            Negotiation::Passthrough
        }
    }
}

/// A Tower service that negotiates `Accept-Encoding` and compresses
/// response bodies.
#[derive(Debug, Clone)]
pub struct EncodingService<S> {
    inner: S,
    codec: Codec,
    level: CompressionLevel,
    strict: bool,
}

impl<S> EncodingService<S> {
    pub(crate) fn new(inner: S, codec: Codec, level: CompressionLevel, strict: bool) -> Self {
        Self {
            inner,
            codec,
            level,
            strict,
        }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for EncodingService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
{
    type Response = http::Response<crate::body::EncodingBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let accept = AcceptEncoding::from_headers(req.headers());
        let negotiation = Negotiation::decide(&accept, self.codec, self.strict);

        match negotiation {
            Negotiation::Reject => {
                tracing::debug!(
                    encoding = %self.codec,
                    strict = self.strict,
                    "client does not accept encoding, responding 406"
                );
                ResponseFuture::not_acceptable()
            }
            negotiation => {
                tracing::trace!(encoding = %self.codec, ?negotiation, "negotiated response encoding");
                ResponseFuture::new(self.inner.call(req), negotiation, self.level)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide() {
        let gzip_only = AcceptEncoding::parse("gzip");
        assert_eq!(
            Negotiation::decide(&gzip_only, Codec::Gzip, true),
            Negotiation::Compress(Codec::Gzip)
        );
        assert_eq!(
            Negotiation::decide(&gzip_only, Codec::Deflate, true),
            Negotiation::Reject
        );
        assert_eq!(
            Negotiation::decide(&gzip_only, Codec::Deflate, false),
            Negotiation::Passthrough
        );
    }

    #[test]
    fn test_decide_absent_header() {
        let absent = AcceptEncoding::default();
        assert_eq!(
            Negotiation::decide(&absent, Codec::Deflate, true),
            Negotiation::Compress(Codec::Deflate)
        );
    }
}
