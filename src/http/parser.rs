use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::ParseError;
use crate::http::headers::Headers;
use crate::http::request::{ConnectionMode, ContentEncoding, Request, Version};

/// Size limits applied while reading a request head.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum bytes in the request line or a single header line
    pub max_line_length: usize,
    /// Maximum number of header lines, continuations included
    pub max_headers: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_length: 8192,
            max_headers: 100,
        }
    }
}

/// Reads one request head from `io`.
///
/// Consumes the request line and the header block up to and including the
/// terminating empty line, and nothing more: the body (if any) is left on
/// the stream for the caller to bind to a length-bounded reader.
pub async fn parse_request<R>(io: &mut R, limits: &Limits) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let line = read_line(io, limits.max_line_length).await?;
    let line = std::str::from_utf8(&line).map_err(|_| ParseError::InvalidRequestLine)?;

    let mut parts = line.split([' ', '\t']).filter(|t| !t.is_empty());
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) => (m, t, v),
        _ => return Err(ParseError::InvalidRequestLine),
    };

    let version = Version::parse(version).ok_or(ParseError::InvalidVersion)?;
    if version.major != 1 || version.minor > 1 {
        return Err(ParseError::UnsupportedVersion {
            major: version.major,
            minor: version.minor,
        });
    }

    let headers = read_headers(io, limits).await?;

    let connection = ConnectionMode::negotiate(version, headers.get_ignore_case("Connection"));
    let content_length = content_length(&headers)?;

    let encoding = headers
        .get_ignore_case("Content-Encoding")
        .or_else(|| headers.get_ignore_case("X-Content-Encoding"))
        .unwrap_or("identity");
    let content_encoding = ContentEncoding::from_header(encoding)
        .ok_or_else(|| ParseError::UnsupportedEncoding(encoding.to_string()))?;

    Ok(Request {
        method: method.to_string(),
        target: target.to_string(),
        version,
        headers,
        connection,
        content_length,
        content_encoding,
    })
}

async fn read_headers<R>(io: &mut R, limits: &Limits) -> Result<Headers, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut headers = Headers::new();
    let mut lines = 0usize;

    loop {
        let raw = read_line(io, limits.max_line_length).await?;
        if raw.is_empty() {
            return Ok(headers);
        }

        lines += 1;
        if lines > limits.max_headers {
            return Err(ParseError::TooManyHeaders(limits.max_headers));
        }

        let line = std::str::from_utf8(&raw).map_err(|_| ParseError::InvalidHeader)?;

        if lines == 1 {
            // No previous header to continue, so leading whitespace is noise.
            parse_header_line(line.trim_start(), &mut headers)?;
        } else if line.starts_with([' ', '\t']) {
            headers.append_to_last(line.trim());
        } else {
            parse_header_line(line, &mut headers)?;
        }
    }
}

fn parse_header_line(line: &str, headers: &mut Headers) -> Result<(), ParseError> {
    let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

    if name.is_empty() || name != name.trim() {
        return Err(ParseError::InvalidHeader);
    }

    headers.insert(name, value.trim());
    Ok(())
}

fn content_length(headers: &Headers) -> Result<Option<u64>, ParseError> {
    let mut values = headers.get_all_ignore_case("Content-Length");
    let Some(first) = values.next() else {
        return Ok(None);
    };

    if values.any(|v| v != first) {
        return Err(ParseError::InvalidContentLength);
    }

    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength);
    }

    first
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ParseError::InvalidContentLength)
}

/// Reads bytes up to an exact CRLF, returning the line without it.
///
/// A CR followed by anything but LF, or a bare LF, is a framing error.
async fn read_line<R>(io: &mut R, max: usize) -> Result<Vec<u8>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        match io.read_u8().await? {
            b'\r' => {
                return match io.read_u8().await? {
                    b'\n' => Ok(line),
                    _ => Err(ParseError::BadLineEnding),
                };
            }
            b'\n' => return Err(ParseError::BadLineEnding),
            b => {
                if line.len() >= max {
                    return Err(ParseError::LineTooLong(max));
                }
                line.push(b);
            }
        }
    }
}
