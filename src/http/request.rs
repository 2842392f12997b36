use std::fmt;

use crate::http::headers::Headers;

/// HTTP protocol version from the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    /// Parses `HTTP/<major>.<minor>` where both parts are unsigned integers.
    ///
    /// ```
    /// # use gridserve::http::request::Version;
    /// assert_eq!(Version::parse("HTTP/1.1"), Some(Version::HTTP_11));
    /// assert_eq!(Version::parse("HTTP/1"), None);
    /// assert_eq!(Version::parse("http/1.1"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix("HTTP/")?;
        let (major, minor) = rest.split_once('.')?;

        Some(Version {
            major: parse_digits(major)?,
            minor: parse_digits(minor)?,
        })
    }

    /// The connection mode a request of this version gets when it sends no
    /// `Connection` header.
    pub fn default_connection(&self) -> ConnectionMode {
        if self.minor > 0 {
            ConnectionMode::KeepAlive
        } else {
            ConnectionMode::Close
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Whether the connection is reused after the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    KeepAlive,
    Close,
}

impl ConnectionMode {
    /// Resolves the mode from the version default and an optional
    /// `Connection` header. Only the exact values `keep-alive` and `close`
    /// override the default.
    pub fn negotiate(version: Version, header: Option<&str>) -> Self {
        match header {
            Some("keep-alive") => ConnectionMode::KeepAlive,
            Some("close") => ConnectionMode::Close,
            _ => version.default_connection(),
        }
    }
}

/// Transfer decoding applied to the request body before handlers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

impl ContentEncoding {
    /// Maps a `Content-Encoding` value to a supported decoder. Values are
    /// matched exactly.
    ///
    /// ```
    /// # use gridserve::http::request::ContentEncoding;
    /// assert_eq!(ContentEncoding::from_header("x-gzip"), Some(ContentEncoding::Gzip));
    /// assert_eq!(ContentEncoding::from_header("deflate"), None);
    /// assert_eq!(ContentEncoding::from_header("GZIP"), None);
    /// ```
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "identity" => Some(ContentEncoding::Identity),
            "gzip" | "x-gzip" => Some(ContentEncoding::Gzip),
            _ => None,
        }
    }
}

/// A fully validated request head.
///
/// Produced by [`crate::http::parser::parse_request`]. The body is not part
/// of this value; it stays on the connection and is read through
/// [`crate::http::exchange::Exchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token exactly as sent (case-sensitive)
    pub method: String,
    /// Raw request-target, not URL-decoded
    pub target: String,
    pub version: Version,
    /// Request headers in wire order
    pub headers: Headers,
    pub connection: ConnectionMode,
    /// Declared body length; `None` means the request has no body
    pub content_length: Option<u64>,
    pub content_encoding: ContentEncoding,
}

/// Builder for constructing Request values outside the parser.
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    version: Version,
    headers: Headers,
    content_length: Option<u64>,
    content_encoding: ContentEncoding,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: Version::HTTP_11,
            headers: Headers::new(),
            content_length: None,
            content_encoding: ContentEncoding::Identity,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn content_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.content_encoding = encoding;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let connection =
            ConnectionMode::negotiate(self.version, self.headers.get_ignore_case("Connection"));

        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version,
            headers: self.headers,
            connection,
            content_length: self.content_length,
            content_encoding: self.content_encoding,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by its exact name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The request-target up to (not including) the query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// Media type of the body, without parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get_ignore_case("Content-Type")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    pub fn keep_alive(&self) -> bool {
        self.connection == ConnectionMode::KeepAlive
    }

    pub fn has_body(&self) -> bool {
        self.content_length.is_some()
    }
}
