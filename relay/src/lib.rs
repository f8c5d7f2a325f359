pub mod config;
pub mod handler;

use axum::Router;
use axum::routing::get;
use handler::RelayState;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum RelayServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router() -> Router {
    Router::new()
        .route("/api/relay", get(handler::relay_handler))
        .with_state(RelayState::default())
}

pub async fn run(config: config::Config) -> Result<(), RelayServerError> {
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "relay listening");
    axum::serve(listener, router()).await?;
    Ok(())
}
