use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::http::body::RequestBody;
use crate::http::connection::Transport;
use crate::http::error::HttpError;
use crate::http::request::{ConnectionMode, Request};
use crate::http::response::{Response, ResponseState, StatusCode};

/// What the connection loop does after an exchange completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Parse the next request on the same connection
    Continue,
    /// Close the connection
    Close,
}

/// One request bound to the connection it arrived on.
///
/// Owns the "has a response begun" state: the body can be read until
/// [`Exchange::begin_response`] is called, which drains whatever is left of
/// it so the stream is aligned before the response is written. Exactly one
/// response can be started.
pub struct Exchange<'c> {
    request: Request,
    io: &'c mut Transport,
    body: Option<RequestBody>,
    response: Option<ResponseState>,
    read_timeout: Duration,
    /// Set when the body could not be consumed; the stream is no longer
    /// aligned on a request boundary.
    poisoned: bool,
}

impl<'c> Exchange<'c> {
    pub fn new(request: Request, io: &'c mut Transport, read_timeout: Duration) -> Self {
        let body = request
            .content_length
            .map(|len| RequestBody::new(len, request.content_encoding));

        Self {
            request,
            io,
            body,
            response: None,
            read_timeout,
            poisoned: false,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Whether body bytes can still be read.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn response_started(&self) -> bool {
        self.response.is_some()
    }

    /// Reads decoded body bytes; 0 means end of body (or no body).
    pub async fn read_body(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        let Some(body) = self.body.as_mut() else {
            return Ok(0);
        };

        match timeout(self.read_timeout, body.read(&mut *self.io, buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => {
                self.poisoned = true;
                Err(e.into())
            }
            Err(_) => {
                self.poisoned = true;
                Err(HttpError::Timeout)
            }
        }
    }

    /// Reads the whole decoded body.
    pub async fn read_body_to_end(&mut self) -> Result<Vec<u8>, HttpError> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8192];

        loop {
            let n = self.read_body(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Starts the single response for this request.
    ///
    /// Any unread request body is drained first. The response inherits the
    /// request's version and connection mode.
    pub async fn begin_response(
        &mut self,
        status: u16,
        reason: impl Into<String>,
    ) -> Result<Response<'_>, HttpError> {
        if self.response.is_some() {
            return Err(HttpError::ResponseAlreadyStarted);
        }

        self.close_body().await?;

        let state = self.response.insert(ResponseState::new(
            self.request.version,
            self.request.connection,
            status,
            reason,
        ));
        Ok(Response::new(&mut *self.io, state))
    }

    /// [`Exchange::begin_response`] with a standard reason phrase.
    pub async fn begin(&mut self, status: StatusCode) -> Result<Response<'_>, HttpError> {
        self.begin_response(status.as_u16(), status.reason_phrase()).await
    }

    /// Re-acquires the response started earlier, if any.
    pub fn response(&mut self) -> Option<Response<'_>> {
        let state = self.response.as_mut()?;
        Some(Response::new(&mut *self.io, state))
    }

    /// Marks the connection as unusable after this exchange. The response,
    /// if its headers are not yet sent, will carry `Connection: close`.
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Completes the exchange and decides the fate of the connection.
    ///
    /// A request that never got a response is answered with 500. The
    /// response is closed (headers sent if they were not), and the result
    /// says whether another request may follow on this connection.
    pub async fn finish(mut self) -> Result<Step, HttpError> {
        let fallback = self.response.is_none();
        let mut state = match self.response.take() {
            Some(state) => state,
            None => self.fallback_state().await,
        };

        if self.poisoned {
            state.force_close();
        }

        let mut response = Response::new(&mut *self.io, &mut state);
        let mode = if fallback {
            warn!(
                "{} {} produced no response, answering 500",
                self.request.method, self.request.target
            );
            response.set_content_type("text/plain")?;
            response.send(b"500 Internal Server Error").await?
        } else {
            response.close().await?
        };

        match mode {
            ConnectionMode::KeepAlive => Ok(Step::Continue),
            ConnectionMode::Close => Ok(Step::Close),
        }
    }

    async fn fallback_state(&mut self) -> ResponseState {
        let connection = match self.close_body().await {
            Ok(()) => self.request.connection,
            Err(_) => ConnectionMode::Close,
        };

        let status = StatusCode::InternalServerError;
        ResponseState::new(
            self.request.version,
            connection,
            status.as_u16(),
            status.reason_phrase(),
        )
    }

    async fn close_body(&mut self) -> Result<(), HttpError> {
        let Some(mut body) = self.body.take() else {
            return Ok(());
        };

        match timeout(self.read_timeout, body.drain(&mut *self.io)).await {
            Ok(Ok(discarded)) => {
                if discarded > 0 {
                    debug!("Discarded {} unread body bytes", discarded);
                }
                Ok(())
            }
            Ok(Err(e)) => {
                self.poisoned = true;
                Err(e.into())
            }
            Err(_) => {
                self.poisoned = true;
                Err(HttpError::Timeout)
            }
        }
    }
}
