use dotenv::dotenv;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env()) // Reads RUST_LOG
        .with(fmt::layer().compact())
        .init();

    dotenv().ok();

    qroute::api::server::serve().await
}
