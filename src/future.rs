use crate::body::EncodingBody;
use crate::codec::{Codec, CompressionLevel};
use crate::service::Negotiation;
use http::{HeaderMap, Response, StatusCode, header};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Future for encoding service responses.
    pub struct ResponseFuture<F> {
        #[pin]
        kind: Kind<F>,
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind<F> {
        Inner {
            #[pin]
            future: F,
            negotiation: Negotiation,
            level: CompressionLevel,
        },
        NotAcceptable,
    }
}

impl<F> ResponseFuture<F> {
    pub(crate) fn new(future: F, negotiation: Negotiation, level: CompressionLevel) -> Self {
        Self {
            kind: Kind::Inner {
                future,
                negotiation,
                level,
            },
        }
    }

    pub(crate) fn not_acceptable() -> Self {
        Self {
            kind: Kind::NotAcceptable,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<EncodingBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::NotAcceptable => Poll::Ready(Ok(not_acceptable_response())),
            KindProj::Inner {
                future,
                negotiation,
                level,
            } => match future.poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
                Poll::Ready(Ok(response)) => {
                    Poll::Ready(Ok(wrap_response(response, *negotiation, *level)))
                }
            },
        }
    }
}

fn not_acceptable_response<B>() -> Response<EncodingBody<B>> {
    let mut response = Response::new(EncodingBody::empty());
    *response.status_mut() = StatusCode::NOT_ACCEPTABLE;
    add_vary_accept_encoding(response.headers_mut());
    response
}

/// Wraps the response body according to the negotiation outcome.
fn wrap_response<B>(
    response: Response<B>,
    negotiation: Negotiation,
    level: CompressionLevel,
) -> Response<EncodingBody<B>> {
    let (mut parts, body) = response.into_parts();

    add_vary_accept_encoding(&mut parts.headers);

    let codec = match negotiation {
        Negotiation::Compress(codec) if should_compress(parts.status, &parts.headers) => codec,
        _ => return Response::from_parts(parts, EncodingBody::passthrough(body)),
    };

    let always_flush = parts
        .headers
        .get("x-accel-buffering")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("no"))
        || is_event_stream(&parts.headers);

    set_content_encoding(&mut parts.headers, codec);

    Response::from_parts(
        parts,
        EncodingBody::compressed(body, codec, level, always_flush),
    )
}

/// Responses that already carry an encoding, a byte range, or no body at all
/// are left alone.
fn should_compress(status: StatusCode, headers: &HeaderMap) -> bool {
    let bodiless = status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;

    !bodiless
        && !headers.contains_key(header::CONTENT_ENCODING)
        && !headers.contains_key(header::CONTENT_RANGE)
}

fn set_content_encoding(headers: &mut HeaderMap, codec: Codec) {
    headers.insert(
        header::CONTENT_ENCODING,
        header::HeaderValue::from_static(codec.content_encoding()),
    );
    // Compressed size is unknown and byte ranges no longer line up.
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::ACCEPT_RANGES);
}

/// Adds Accept-Encoding to the Vary header if not already present.
fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    let covered = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|v| v == "*" || v.eq_ignore_ascii_case("accept-encoding"));

    if !covered {
        headers.append(
            header::VARY,
            header::HeaderValue::from_static("accept-encoding"),
        );
    }
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response_with_headers<I>(body: &'static str, headers: I) -> Response<&'static str>
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut response = Response::new(body);
        for (name, value) in headers {
            response
                .headers_mut()
                .append(name, header::HeaderValue::from_static(value));
        }
        response
    }

    fn gzip(response: Response<&'static str>) -> Response<EncodingBody<&'static str>> {
        wrap_response(
            response,
            Negotiation::Compress(Codec::Gzip),
            CompressionLevel::Default,
        )
    }

    #[test]
    fn test_compress_sets_headers() {
        let response = make_response_with_headers(
            "hello world",
            [("content-length", "11"), ("accept-ranges", "bytes")],
        );
        let wrapped = gzip(response);

        assert!(wrapped.body().is_compressed());
        assert_eq!(
            wrapped.headers().get(header::CONTENT_ENCODING).unwrap(),
            "gzip"
        );
        assert!(wrapped.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(wrapped.headers().get(header::ACCEPT_RANGES).is_none());
        assert_eq!(
            wrapped.headers().get(header::VARY).unwrap(),
            "accept-encoding"
        );
    }

    #[test]
    fn test_deflate_content_encoding() {
        let wrapped = wrap_response(
            Response::new("hello"),
            Negotiation::Compress(Codec::Deflate),
            CompressionLevel::Precise(6),
        );
        assert_eq!(
            wrapped.headers().get(header::CONTENT_ENCODING).unwrap(),
            "deflate"
        );
    }

    #[test]
    fn test_passthrough_keeps_headers() {
        let response = make_response_with_headers(
            "hello world",
            [("content-length", "11"), ("accept-ranges", "bytes")],
        );
        let wrapped = wrap_response(response, Negotiation::Passthrough, CompressionLevel::Default);

        assert!(!wrapped.body().is_compressed());
        assert!(wrapped.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(wrapped.headers().get(header::CONTENT_LENGTH).unwrap(), "11");
        assert_eq!(
            wrapped.headers().get(header::ACCEPT_RANGES).unwrap(),
            "bytes"
        );
        assert_eq!(
            wrapped.headers().get(header::VARY).unwrap(),
            "accept-encoding"
        );
    }

    #[test]
    fn test_no_compress_when_content_encoding_present() {
        let response = make_response_with_headers("hello", [("content-encoding", "br")]);
        let wrapped = gzip(response);

        assert!(!wrapped.body().is_compressed());
        assert_eq!(
            wrapped.headers().get(header::CONTENT_ENCODING).unwrap(),
            "br"
        );
    }

    #[test]
    fn test_no_compress_range_response() {
        let response =
            make_response_with_headers("partial content", [("content-range", "bytes 0-99/200")]);
        assert!(!gzip(response).body().is_compressed());
    }

    #[test]
    fn test_no_compress_bodiless_status() {
        for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
            let mut response = Response::new("");
            *response.status_mut() = status;
            let wrapped = gzip(response);
            assert!(!wrapped.body().is_compressed());
            assert!(wrapped.headers().get(header::CONTENT_ENCODING).is_none());
        }
    }

    #[test]
    fn test_always_flush_detection() {
        let cases = [
            (vec![], false),
            (vec![("x-accel-buffering", "no")], true),
            (vec![("x-accel-buffering", "NO")], true),
            (vec![("x-accel-buffering", "yes")], false),
            (vec![("content-type", "text/event-stream; charset=utf-8")], true),
            (vec![("content-type", "text/html")], false),
        ];
        for (headers, expected) in cases {
            let wrapped = gzip(make_response_with_headers("data", headers));
            match wrapped.body() {
                EncodingBody::Compressed { state, .. } => {
                    assert_eq!(state.always_flush(), expected);
                }
                _ => panic!("Expected compressed body"),
            }
        }
    }

    #[test]
    fn test_vary_header_appended() {
        let wrapped = gzip(make_response_with_headers("hello", [("vary", "origin")]));
        let vary_values: Vec<_> = wrapped
            .headers()
            .get_all(header::VARY)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(vary_values, vec!["origin", "accept-encoding"]);
    }

    #[test]
    fn test_vary_header_not_duplicated() {
        let wrapped = gzip(make_response_with_headers(
            "hello",
            [("vary", "Origin, Accept-Encoding")],
        ));
        assert_eq!(wrapped.headers().get_all(header::VARY).iter().count(), 1);

        let wrapped = gzip(make_response_with_headers("hello", [("vary", "*")]));
        assert_eq!(wrapped.headers().get(header::VARY).unwrap(), "*");
    }

    #[test]
    fn test_not_acceptable_response() {
        let response = not_acceptable_response::<&'static str>();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert!(matches!(response.body(), EncodingBody::Empty));
        assert_eq!(
            response.headers().get(header::VARY).unwrap(),
            "accept-encoding"
        );
    }
}
