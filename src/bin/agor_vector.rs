//! Vector/Document Search reference service binary. Listens on port 8502
//! by default.

use agor::services::vector;
use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the Vector/Document Search reference service.
#[derive(Debug, Parser)]
#[command(name = "agor-vector", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8502")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("agor=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let app = vector::router();
    let listener = TcpListener::bind(&args.listen).await?;
    info!(listen = %args.listen, "vector/document search listening");
    axum::serve(listener, app).await?;
    Ok(())
}
