use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;
use anyhow::Context;

use convertd::server::{self, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);
    let google_client_id =
        std::env::var("GOOGLE_CLIENT_ID").context("GOOGLE_CLIENT_ID must be set")?;
    let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    info!(
        target: "convertd",
        "convertd starting: RUST_LOG='{}', port={}, client_id='{}'",
        rust_log, port, google_client_id
    );

    server::run(Config { port, google_client_id, jwt_secret }).await
}
