//! Knowledge Store reference service binary. Listens on port 8501 by
//! default.

use agor::services::knowledge;
use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the Knowledge Store reference service.
#[derive(Debug, Parser)]
#[command(name = "agor-knowledge", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8501")]
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
    let app = knowledge::router();
    let listener = TcpListener::bind(&args.listen).await?;
    info!(listen = %args.listen, "knowledge store listening");
    axum::serve(listener, app).await?;
    Ok(())
}
