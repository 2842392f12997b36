use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::headers::Headers;
use crate::http::request::{ConnectionMode, Version};
use crate::http::writer::ResponseWriter;

/// Status codes produced by the server itself.
///
/// Handlers may answer with any numeric status through
/// [`crate::http::exchange::Exchange::begin_response`]; these are the ones
/// the protocol layer and built-in handlers emit:
/// - `Ok` (200): Request successful
/// - `BadRequest` (400): Framing or syntax violation
/// - `NotFound` (404): No handler matched
/// - `MethodNotAllowed` (405): Handler does not accept the method
/// - `NotAcceptable` (406): Unsupported content encoding
/// - `RequestTimeout` (408): Request head not received in time
/// - `InternalServerError` (500): Handler produced no response
/// - `HttpVersionNotSupported` (505): Major version not 1 or minor above 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    RequestTimeout,
    InternalServerError,
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use gridserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::NotAcceptable => 406,
            StatusCode::RequestTimeout => 408,
            StatusCode::InternalServerError => 500,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use gridserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotAcceptable.reason_phrase(), "Not Acceptable");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

/// Mutable state of the one response a request may have.
#[derive(Debug)]
pub struct ResponseState {
    version: Version,
    status: u16,
    reason: String,
    headers: Headers,
    connection: ConnectionMode,
    headers_sent: bool,
    /// Body bytes still owed under Content-Length framing; `None` once the
    /// body is delimited by connection close
    remaining: Option<u64>,
    closed: bool,
}

impl ResponseState {
    pub fn new(
        version: Version,
        connection: ConnectionMode,
        status: u16,
        reason: impl Into<String>,
    ) -> Self {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/html");

        Self {
            version,
            status,
            reason: reason.into(),
            headers,
            connection,
            headers_sent: false,
            remaining: None,
            closed: false,
        }
    }

    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub(crate) fn force_close(&mut self) {
        self.connection = ConnectionMode::Close;
    }
}

/// Handle for writing a response onto the connection.
///
/// The header block goes out exactly once, either when an output stream is
/// acquired or when the response is closed without a body.
pub struct Response<'a> {
    io: &'a mut (dyn AsyncWrite + Unpin + Send + 'a),
    state: &'a mut ResponseState,
}

impl<'a> Response<'a> {
    pub fn new(io: &'a mut (dyn AsyncWrite + Unpin + Send + 'a), state: &'a mut ResponseState) -> Self {
        Self { io, state }
    }

    pub fn status(&self) -> u16 {
        self.state.status
    }

    pub fn reason(&self) -> &str {
        &self.state.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.state.headers
    }

    pub fn headers_sent(&self) -> bool {
        self.state.headers_sent
    }

    pub fn connection(&self) -> ConnectionMode {
        self.state.connection
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), HttpError> {
        if self.state.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }
        self.state.headers.insert(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Result<Option<String>, HttpError> {
        if self.state.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }
        Ok(self.state.headers.remove(name))
    }

    pub fn set_content_type(&mut self, value: impl Into<String>) -> Result<(), HttpError> {
        self.set_header("Content-Type", value)
    }

    /// Sends the header block with `Content-Length: content_length` and
    /// returns a writer that accepts exactly that many bytes.
    pub async fn output_stream(&mut self, content_length: u64) -> Result<BodyWriter<'_>, HttpError> {
        if self.state.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }

        self.state.headers.insert("Content-Length", content_length.to_string());
        self.send_headers().await?;
        self.state.remaining = Some(content_length);

        Ok(BodyWriter {
            io: &mut *self.io,
            remaining: &mut self.state.remaining,
        })
    }

    /// Commits to a body delimited by connection close: sends
    /// `Connection: close` and hands back an unbounded writer. The
    /// connection is always closed after this response.
    pub async fn unbounded_output_stream(&mut self) -> Result<BodyWriter<'_>, HttpError> {
        if self.state.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }

        self.state.connection = ConnectionMode::Close;
        self.state.headers.remove("Content-Length");
        self.state.headers.insert("Connection", "close");
        self.send_headers().await?;
        self.state.remaining = None;

        Ok(BodyWriter {
            io: &mut *self.io,
            remaining: &mut self.state.remaining,
        })
    }

    /// Sends `body` as the complete response body and closes the response.
    pub async fn send(&mut self, body: &[u8]) -> Result<ConnectionMode, HttpError> {
        let mut out = self.output_stream(body.len() as u64).await?;
        out.write_all(body).await?;
        self.close().await
    }

    /// Finalizes the response.
    ///
    /// Sends `Content-Length: 0` headers if nothing was sent yet, flushes,
    /// and reports whether the connection must close. A declared body that
    /// was not fully written also forces a close. Calling this again is a
    /// no-op.
    pub async fn close(&mut self) -> Result<ConnectionMode, HttpError> {
        if self.state.closed {
            return Ok(self.state.connection);
        }

        if !self.state.headers_sent {
            self.state.headers.insert("Content-Length", "0");
            self.send_headers().await?;
            self.state.remaining = Some(0);
        }

        if matches!(self.state.remaining, Some(n) if n > 0) {
            self.state.connection = ConnectionMode::Close;
        }

        self.io.flush().await?;
        self.state.closed = true;
        Ok(self.state.connection)
    }

    async fn send_headers(&mut self) -> Result<(), HttpError> {
        let state = &mut *self.state;
        if state.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }

        // Tell the peer when the outcome differs from its version default.
        match state.connection {
            ConnectionMode::Close if state.version.minor >= 1 => {
                state.headers.insert("Connection", "close");
            }
            ConnectionMode::KeepAlive if state.version.minor == 0 => {
                state.headers.insert("Connection", "keep-alive");
            }
            _ => {}
        }

        state.headers_sent = true;
        ResponseWriter::head(state.version, state.status, &state.reason, &state.headers)
            .write_to_stream(&mut *self.io)
            .await?;
        Ok(())
    }
}

/// Writer for a response body.
///
/// Bounded by the declared Content-Length, or unbounded when the response
/// is delimited by connection close.
pub struct BodyWriter<'a> {
    io: &'a mut (dyn AsyncWrite + Unpin + Send + 'a),
    remaining: &'a mut Option<u64>,
}

impl BodyWriter<'_> {
    /// Bytes still owed, or `None` for an unbounded body.
    pub fn remaining(&self) -> Option<u64> {
        *self.remaining
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), HttpError> {
        if let Some(remaining) = *self.remaining {
            if buf.len() as u64 > remaining {
                return Err(HttpError::BodyOverflow {
                    attempted: buf.len(),
                    remaining,
                });
            }
        }

        self.io.write_all(buf).await?;

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= buf.len() as u64;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), HttpError> {
        self.io.flush().await?;
        Ok(())
    }
}
