use http::HeaderMap;
use http::header::ACCEPT_ENCODING;

const WILDCARD: &str = "*";
const DEFAULT_QUALITY: f32 = 1.0;

/// A single `Accept-Encoding` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    token: String,
    quality: f32,
}

impl Preference {
    /// The content-coding token as written by the client, or `*`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The quality weight in `[0, 1]`.
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Returns true for the `*` entry.
    pub fn is_wildcard(&self) -> bool {
        self.token == WILDCARD
    }

    fn matches(&self, token: &str) -> bool {
        self.token.eq_ignore_ascii_case(token)
    }
}

/// Parsed `Accept-Encoding` preferences of a single request.
///
/// An empty list stands for an absent or empty header, which accepts any
/// encoding.
///
/// ```
/// use content_encoding_filter::AcceptEncoding;
///
/// let prefs = AcceptEncoding::parse("*;q=0, gzip;q=0.2");
/// assert!(prefs.accepts("gzip"));
/// assert!(!prefs.accepts("deflate"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptEncoding {
    preferences: Vec<Preference>,
}

impl AcceptEncoding {
    /// Parses a raw header value such as `"gzip;q=1.0, deflate;q=0.5"`.
    ///
    /// Malformed quality values fall back to `1.0`; parsing never fails.
    pub fn parse(header: &str) -> Self {
        let mut accept = Self::default();
        accept.extend_from(header);
        accept
    }

    /// Collects every `Accept-Encoding` line of a request into one list.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut accept = Self::default();
        for value in headers.get_all(ACCEPT_ENCODING) {
            match value.to_str() {
                Ok(line) => accept.extend_from(line),
                Err(_) => tracing::debug!("ignoring non-ascii accept-encoding line"),
            }
        }
        accept
    }

    fn extend_from(&mut self, header: &str) {
        self.preferences.extend(
            header
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .filter_map(parse_preference),
        );
    }

    /// The preferences in the order the client listed them.
    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    /// Returns true when the header was absent or empty.
    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }

    /// Decides whether `token` is an acceptable content-coding.
    ///
    /// An entry naming the token exactly always wins over `*`, whatever the
    /// qualities of the two are. With several entries for the same token the
    /// last one counts. A token matched by neither is not acceptable.
    pub fn accepts(&self, token: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let exact = self.preferences.iter().rev().find(|p| p.matches(token));
        let governing = exact.or_else(|| self.preferences.iter().rev().find(|p| p.is_wildcard()));

        governing.is_some_and(|p| p.quality > 0.0)
    }
}

/// Parses an entry like `"gzip"` or `"br; q=0.8"`.
fn parse_preference(part: &str) -> Option<Preference> {
    let mut params = part.split(';');
    let token = params.next()?.trim();
    if token.is_empty() {
        return None;
    }

    let quality = params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
        .map_or(DEFAULT_QUALITY, |(_, value)| parse_quality(value.trim()));

    Some(Preference {
        token: token.to_owned(),
        quality,
    })
}

fn parse_quality(value: &str) -> f32 {
    match value.parse::<f32>() {
        Ok(q) if (0.0..=1.0).contains(&q) => q,
        _ => DEFAULT_QUALITY,
    }
}
