//! Orchestrator process binary: routes submitted tasks to the right role
//! and advances the specification -> build -> validate pipeline.
//!
//! Agents and the orchestrator share delivery through the append-only
//! fallback log rooted at `--shared-dir`; the in-memory broker only
//! short-circuits delivery between parties that happen to live in the
//! same process (see `Transport`'s dual-path design).

use std::collections::HashMap;
use std::sync::Arc;

use agor::domain_types::AgentId;
use agor::message::{Intent, Message, PayloadKind};
use agor::orchestrator::{Orchestrator, OrchestratorConfig};
use agor::registry::{RegistryConfig, TaskRegistry, TaskType};
use agor::transport::{Transport, TransportConfig};
use agor::Priority;
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

/// Runs the orchestrator process.
#[derive(Debug, Parser)]
#[command(name = "agor-orchestrator", version, about)]
struct Args {
    /// This orchestrator's agent id. A fresh one is generated if omitted.
    #[arg(long, env = "AGENT_ID")]
    id: Option<String>,

    /// Directory holding the fallback message log and cursor files.
    #[arg(long, env = "SHARED_DIR", default_value = "./shared")]
    shared_dir: String,

    /// Unused by the in-memory broker; accepted for interface parity with
    /// the agent binaries and future networked-broker deployments.
    #[arg(long, env = "BROKER_URL")]
    broker_url: Option<String>,

    /// Path to the task registry's `SQLite` database.
    #[arg(long, env = "STORAGE_DIR", default_value = "agor-registry.db")]
    storage_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("agor=info".parse()?),
        )
        .init();

    let args = Args::parse();
    if let Some(broker_url) = &args.broker_url {
        info!(broker_url, "broker URL accepted but not yet consulted by the in-memory transport");
    }

    let orchestrator_id = args
        .id
        .and_then(|id| id.parse::<uuid::Uuid>().ok())
        .map(AgentId::new)
        .unwrap_or_else(AgentId::generate);

    let registry_config = RegistryConfig::production(args.storage_dir);
    let tasks = Arc::new(TaskRegistry::open(registry_config).await?);

    let transport_config = TransportConfig::production(args.shared_dir);
    let transport = Arc::new(Transport::new(&transport_config));

    let orchestrator = Orchestrator::new(
        orchestrator_id,
        Arc::clone(&transport),
        tasks,
        OrchestratorConfig::production(),
    );

    info!(agent_id = %orchestrator_id, "orchestrator starting");

    let mut channel = transport.register(orchestrator_id);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    loop {
        if shutdown_rx.try_recv().is_ok() {
            info!("shutdown signal received");
            break;
        }

        match transport
            .receive(&mut channel, orchestrator_id, std::time::Duration::from_secs(1))
            .await
        {
            Ok(Some(message)) => handle_message(&orchestrator, &transport, message).await,
            Ok(None) => {
                if let Err(e) = orchestrator.dispatch_ready_tasks().await {
                    warn!(error = %e, "failed to dispatch ready tasks");
                }
            }
            Err(e) => {
                warn!(error = %e, "transport receive failed");
            }
        }
    }

    transport.deregister(orchestrator_id);
    Ok(())
}

async fn handle_message(orchestrator: &Orchestrator, transport: &Transport, message: Message) {
    match message.intent {
        Intent::Inform => {
            if let Err(e) = orchestrator.handle_inform(&message).await {
                warn!(error = %e, "failed to process INFORM");
            }
        }
        Intent::Request => handle_request(orchestrator, transport, message).await,
        other => {
            info!(intent = ?other, "orchestrator ignoring unsupported intent");
        }
    }
}

async fn handle_request(orchestrator: &Orchestrator, transport: &Transport, message: Message) {
    let reply = match message.payload {
        PayloadKind::SubmitTask { description, .. } => {
            let task_type = description
                .get("task_type")
                .and_then(|v| v.as_str())
                .map_or(TaskType::Specification, |s| match s {
                    "build" => TaskType::Build,
                    "validate" => TaskType::Validate,
                    _ => TaskType::Specification,
                });
            let priority = description
                .get("priority")
                .and_then(|v| v.as_str())
                .map_or(Priority::Medium, |s| match s {
                    "critical" => Priority::Critical,
                    "high" => Priority::High,
                    "low" => Priority::Low,
                    _ => Priority::Medium,
                });

            match orchestrator.submit_task(task_type, priority, description, vec![]).await {
                Ok(task_id) => PayloadKind::TaskSubmitted {
                    task_id,
                    extra: HashMap::new(),
                },
                Err(e) => PayloadKind::Error {
                    message: e.to_string(),
                    extra: HashMap::new(),
                },
            }
        }
        other => {
            warn!(?other, "orchestrator received an unsupported REQUEST");
            return;
        }
    };

    let response = Message::new(Intent::Inform, orchestrator.id(), message.sender, reply);
    if let Err(e) = transport.send(response).await {
        warn!(error = %e, "failed to send orchestrator reply");
    }
}
