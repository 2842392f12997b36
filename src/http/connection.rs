use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::http::error::{HttpError, ParseError};
use crate::http::exchange::{Exchange, Step};
use crate::http::parser::{Limits, parse_request};
use crate::http::request::Request;
use crate::http::router::{NotFound, Router, SharedHandler};
use crate::http::writer::write_error_response;

/// Any byte stream a connection can run over.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// The buffered, type-erased connection stream.
pub type Transport = BufStream<Box<dyn Io>>;

pub fn transport<S: Io + 'static>(stream: S) -> Transport {
    BufStream::new(Box::new(stream))
}

/// Per-connection limits and deadlines.
#[derive(Debug, Clone)]
pub struct Settings {
    pub limits: Limits,
    /// Deadline for a complete request head
    pub header_timeout: Duration,
    /// Deadline for each body read, and for draining an unread body
    pub read_timeout: Duration,
    /// Idle wait for the next request on a kept-alive connection
    pub keep_alive_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            header_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(60),
        }
    }
}

pub struct Connection {
    io: Transport,
    router: Arc<Router>,
    settings: Settings,
    state: ConnectionState,
    served: u64,
}

pub enum ConnectionState {
    /// Waiting for the first byte of the next request
    Idle,
    /// Reading the request line and headers
    Parsing,
    /// Running the handler and writing its response
    Dispatching(Request),
    Closed,
}

impl Connection {
    pub fn new<S: Io + 'static>(stream: S, router: Arc<Router>, settings: Settings) -> Self {
        Self {
            io: transport(stream),
            router,
            settings,
            state: ConnectionState::Idle,
            served: 0,
        }
    }

    /// Number of requests served so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Idle => self.wait_for_request().await,

                ConnectionState::Parsing => self.read_request().await,

                ConnectionState::Dispatching(request) => match self.dispatch(request).await {
                    Step::Continue => ConnectionState::Idle,
                    Step::Close => ConnectionState::Closed,
                },

                ConnectionState::Closed => break,
            };
        }

        if let Err(e) = self.io.shutdown().await {
            debug!("Shutdown after {} requests failed: {}", self.served, e);
        }

        Ok(())
    }

    async fn wait_for_request(&mut self) -> ConnectionState {
        let idle = if self.served == 0 {
            self.settings.header_timeout
        } else {
            self.settings.keep_alive_timeout
        };

        match timeout(idle, self.io.fill_buf()).await {
            Ok(Ok(buf)) if buf.is_empty() => {
                debug!("Client closed connection after {} requests", self.served);
                ConnectionState::Closed
            }
            Ok(Ok(_)) => ConnectionState::Parsing,
            Ok(Err(e)) => {
                debug!("Read error on idle connection: {}", e);
                ConnectionState::Closed
            }
            Err(_) => {
                debug!("Idle connection timed out");
                ConnectionState::Closed
            }
        }
    }

    async fn read_request(&mut self) -> ConnectionState {
        let parsed = timeout(
            self.settings.header_timeout,
            parse_request(&mut self.io, &self.settings.limits),
        )
        .await
        .unwrap_or(Err(ParseError::Timeout));

        match parsed {
            Ok(request) => {
                debug!("{} {} {}", request.method, request.target, request.version);
                ConnectionState::Dispatching(request)
            }
            Err(e) => {
                let status = e.status();
                warn!("Rejecting request with {}: {}", status.as_u16(), e);

                if let Err(e) = write_error_response(&mut self.io, status).await {
                    debug!("Could not deliver error response: {}", e);
                }
                ConnectionState::Closed
            }
        }
    }

    async fn dispatch(&mut self, request: Request) -> Step {
        let handler: SharedHandler = match self.router.resolve(&request) {
            Some(h) => h,
            None => Arc::new(NotFound),
        };

        let method = request.method.clone();
        let target = request.target.clone();
        debug!("Dispatching {} {} to {}", method, target, handler.name());
        let mut exchange = Exchange::new(request, &mut self.io, self.settings.read_timeout);

        let mut fatal = false;
        match AssertUnwindSafe(handler.handle(&mut exchange)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Handler for {} {} failed: {:#}", method, target, e);
                fatal = e.downcast_ref::<HttpError>().is_some_and(HttpError::is_fatal);
            }
            Err(_) => error!("Handler for {} {} panicked", method, target),
        }

        self.served += 1;

        if fatal {
            exchange.poison();
        }

        match exchange.finish().await {
            Ok(step) => {
                debug!("{} {} done, {:?}", method, target, step);
                step
            }
            Err(e) => {
                warn!("Could not complete response to {} {}: {}", method, target, e);
                Step::Close
            }
        }
    }
}
