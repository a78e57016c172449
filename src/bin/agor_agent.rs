//! Generic agent process binary.
//!
//! `--role` selects which of the canonical roles (`architect`, `builder`,
//! `validator`) this process advertises and handles REQUESTs for. The
//! handlers here are intentionally minimal placeholders: this crate
//! supplies the coordination core (messaging, task lifecycle, runtime
//! loop), not the domain intelligence that actually writes a
//! specification, builds it, or validates the result. A real deployment
//! swaps in a richer [`MessageHandler`] per role.

use std::collections::HashMap;
use std::sync::Arc;

use agor::domain_types::AgentId;
use agor::message::{Artifact, Intent, Message, PayloadKind};
use agor::runtime::{AgentLifecycleHooks, AgentRuntime, HandlerContext, HandlerTable, MessageHandler, RuntimeConfig};
use agor::transport::{Transport, TransportConfig};
use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use tracing::info;

/// The canonical agent roles this binary can run as.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Architect,
    Builder,
    Validator,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Builder => "builder",
            Self::Validator => "validator",
        }
    }
}

/// Runs one agent process.
#[derive(Debug, Parser)]
#[command(name = "agor-agent", version, about)]
struct Args {
    /// This agent's id. A fresh one is generated if omitted.
    #[arg(long, env = "AGENT_ID")]
    id: Option<String>,

    /// Directory holding the fallback message log and cursor files.
    #[arg(long, env = "SHARED_DIR", default_value = "./shared")]
    shared_dir: String,

    /// Unused by the in-memory broker; accepted for interface parity.
    #[arg(long, env = "BROKER_URL")]
    broker_url: Option<String>,

    /// The role this agent advertises and handles work for.
    #[arg(long, value_enum, env = "AGENT_ROLE")]
    role: Role,
}

struct SpecificationHandler;

#[async_trait]
impl MessageHandler for SpecificationHandler {
    async fn handle(&self, message: &Message, ctx: &HandlerContext) -> anyhow::Result<()> {
        let PayloadKind::CreateSpecification { task_id, .. } = &message.payload else {
            return Ok(());
        };
        let artifacts = vec![Artifact {
            label: "specification".to_string().try_into()?,
            uri: format!("memory://spec/{task_id}").try_into()?,
        }];
        let inform = Message::new(
            Intent::Inform,
            ctx.agent_id,
            message.sender,
            PayloadKind::SpecificationReady {
                task_id: *task_id,
                artifacts,
                extra: HashMap::new(),
            },
        );
        ctx.transport.send(inform).await?;
        Ok(())
    }
}

struct BuildHandler;

#[async_trait]
impl MessageHandler for BuildHandler {
    async fn handle(&self, message: &Message, ctx: &HandlerContext) -> anyhow::Result<()> {
        let PayloadKind::BuildFromSpec { task_id, .. } = &message.payload else {
            return Ok(());
        };
        let artifacts = vec![Artifact {
            label: "build".to_string().try_into()?,
            uri: format!("memory://build/{task_id}").try_into()?,
        }];
        let inform = Message::new(
            Intent::Inform,
            ctx.agent_id,
            message.sender,
            PayloadKind::BuildComplete {
                task_id: *task_id,
                artifacts,
                extra: HashMap::new(),
            },
        );
        ctx.transport.send(inform).await?;
        Ok(())
    }
}

struct ValidationHandler;

#[async_trait]
impl MessageHandler for ValidationHandler {
    async fn handle(&self, message: &Message, ctx: &HandlerContext) -> anyhow::Result<()> {
        let PayloadKind::ValidateBuild { task_id, .. } = &message.payload else {
            return Ok(());
        };
        let inform = Message::new(
            Intent::Inform,
            ctx.agent_id,
            message.sender,
            PayloadKind::ValidationComplete {
                task_id: *task_id,
                passed: true,
                artifacts: vec![],
                extra: HashMap::new(),
            },
        );
        ctx.transport.send(inform).await?;
        Ok(())
    }
}

struct AnnounceOnStartup {
    transport: Arc<Transport>,
    agent_id: AgentId,
    role: &'static str,
}

#[async_trait]
impl AgentLifecycleHooks for AnnounceOnStartup {
    async fn initialize(&self) -> anyhow::Result<()> {
        let online = Message::new(
            Intent::Inform,
            self.agent_id,
            AgentId::broadcast(),
            PayloadKind::AgentOnline {
                role: self.role.to_string(),
                extra: HashMap::new(),
            },
        );
        self.transport.send(online).await?;
        info!(agent_id = %self.agent_id, role = self.role, "announced availability");
        Ok(())
    }
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

    let agent_id = args
        .id
        .and_then(|id| id.parse::<uuid::Uuid>().ok())
        .map(AgentId::new)
        .unwrap_or_else(AgentId::generate);

    let transport_config = TransportConfig::production(args.shared_dir);
    let transport = Arc::new(Transport::new(&transport_config));

    let role = args.role.as_str();
    let handlers = build_handlers(args.role);

    let hooks: Box<dyn AgentLifecycleHooks> = Box::new(AnnounceOnStartup {
        transport: Arc::clone(&transport),
        agent_id,
        role,
    });

    let runtime = AgentRuntime::new(agent_id, Arc::clone(&transport), handlers, hooks, RuntimeConfig::production());

    info!(agent_id = %agent_id, role, "agent starting");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    runtime.run(shutdown_rx).await?;
    Ok(())
}

fn build_handlers(role: Role) -> HandlerTable {
    match role {
        Role::Architect => HandlerTable::new().with_handler(Intent::Request, Box::new(SpecificationHandler)),
        Role::Builder => HandlerTable::new().with_handler(Intent::Request, Box::new(BuildHandler)),
        Role::Validator => HandlerTable::new().with_handler(Intent::Request, Box::new(ValidationHandler)),
    }
}
