//! Coordination Hub reference service binary. Listens on port 8503 by
//! default.

use agor::services::coordination;
use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the Coordination Hub reference service.
#[derive(Debug, Parser)]
#[command(name = "agor-coordination", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8503")]
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
    let app = coordination::router();
    let listener = TcpListener::bind(&args.listen).await?;
    info!(listen = %args.listen, "coordination hub listening");
    axum::serve(listener, app).await?;
    Ok(())
}
