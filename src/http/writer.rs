use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::request::Version;
use crate::http::response::StatusCode;

/// Serializes a status line and header block, including the blank line
/// that ends it. CR and LF are stripped from the reason phrase and from
/// every header name and value.
pub fn serialize_head(version: Version, status: u16, reason: &str, headers: &Headers) -> BytesMut {
    let mut buf = BytesMut::with_capacity(128 + headers.len() * 32);

    let status_line = format!("{} {} {}\r\n", version, status, strip_crlf(reason));
    buf.put_slice(status_line.as_bytes());

    for (k, v) in headers.iter() {
        buf.put_slice(strip_crlf(k).as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(strip_crlf(v).as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf
}

fn strip_crlf(s: &str) -> String {
    s.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Pending bytes of a response head (and, for error responses, its body).
pub struct ResponseWriter {
    buffer: BytesMut,
    written: usize,
}

impl ResponseWriter {
    pub fn head(version: Version, status: u16, reason: &str, headers: &Headers) -> Self {
        Self {
            buffer: serialize_head(version, status, reason, headers),
            written: 0,
        }
    }

    /// A complete minimal response for a request that could not be
    /// served. Always carries `Connection: close`.
    pub fn error(status: StatusCode) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());

        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("Content-Length", body.len().to_string());
        headers.insert("Connection", "close");

        let mut buffer = serialize_head(
            Version::HTTP_11,
            status.as_u16(),
            status.reason_phrase(),
            &headers,
        );
        buffer.put_slice(body.as_bytes());

        Self { buffer, written: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        Ok(())
    }
}

/// Sends a minimal error response and flushes it.
pub async fn write_error_response<W>(stream: &mut W, status: StatusCode) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    ResponseWriter::error(status).write_to_stream(stream).await?;
    stream.flush().await
}
