use tracing::info;
use tracing_subscriber::EnvFilter;

use gomoku_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gomoku_server=info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = format!("0.0.0.0:{}", config.port);
    let (app, _state) = gomoku_server::build_app(config);

    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
