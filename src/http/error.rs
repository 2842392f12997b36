use std::io;

use crate::http::response::StatusCode;

/// Failures while reading a request head.
///
/// Every variant is fatal to the connection: once framing is violated the
/// byte alignment with the peer cannot be trusted, so the connection loop
/// answers with [`ParseError::status`] and closes.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequestLine,

    #[error("malformed HTTP version")]
    InvalidVersion,

    #[error("unsupported HTTP version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("malformed header line")]
    InvalidHeader,

    #[error("invalid Content-Length")]
    InvalidContentLength,

    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("line not terminated by CRLF")]
    BadLineEnding,

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("more than {0} header lines")]
    TooManyHeaders(usize),

    #[error("timed out reading request head")]
    Timeout,

    #[error("connection closed mid-request")]
    UnexpectedEof,

    #[error("i/o error while reading request: {0}")]
    Io(#[source] io::Error),
}

impl ParseError {
    /// Status sent to the peer before the connection is closed.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::UnsupportedVersion { .. } => StatusCode::HttpVersionNotSupported,
            ParseError::UnsupportedEncoding(_) => StatusCode::NotAcceptable,
            ParseError::Timeout => StatusCode::RequestTimeout,
            _ => StatusCode::BadRequest,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ParseError::UnexpectedEof
        } else {
            ParseError::Io(e)
        }
    }
}

/// Failures during a single request/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("response headers have already been sent")]
    HeadersAlreadySent,

    #[error("a response has already been started for this request")]
    ResponseAlreadyStarted,

    #[error("write of {attempted} bytes exceeds the {remaining} bytes left under Content-Length")]
    BodyOverflow { attempted: usize, remaining: u64 },

    #[error("timed out waiting for the peer")]
    Timeout,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Whether this failure leaves the connection unusable for another request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HttpError::Timeout | HttpError::Io(_))
    }
}
