//! Built-in handlers mounted by the server binary.

use crate::http::exchange::Exchange;
use crate::http::response::StatusCode;
use crate::http::router::{Handler, HandlerFuture};

/// Answers `POST`/`PUT` with the decoded request body as `text/plain`.
pub struct Echo;

impl Handler for Echo {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let method = exchange.request().method.as_str();
            if method != "POST" && method != "PUT" {
                let mut response = exchange.begin(StatusCode::MethodNotAllowed).await?;
                response.set_header("Allow", "POST, PUT")?;
                response.close().await?;
                return Ok(());
            }

            let body = exchange.read_body_to_end().await?;

            let mut response = exchange.begin(StatusCode::Ok).await?;
            response.set_content_type("text/plain")?;
            response.send(&body).await?;
            Ok(())
        })
    }
}

/// Liveness probe.
pub struct Health;

impl Handler for Health {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut response = exchange.begin(StatusCode::Ok).await?;
            response.set_content_type("text/plain")?;
            response.send(b"OK").await?;
            Ok(())
        })
    }
}
