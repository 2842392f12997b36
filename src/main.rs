use std::sync::Arc;

use gridserve::config::Config;
use gridserve::handlers::{Echo, Health};
use gridserve::http::router::Router;
use gridserve::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let router = Arc::new(Router::new());
    router.add_handler("/echo", Echo);
    router.add_handler("/health", Health);

    tokio::select! {
        res = server::listener::run(&cfg, router.clone()) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    router.clear();
    Ok(())
}
