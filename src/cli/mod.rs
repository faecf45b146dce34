use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::config;
use crate::plugin::DiagramTracePlugin;
use crate::storage::{MemorySessionFactory, PgSessionFactory, SessionFactory};

#[derive(Parser)]
#[command(name = "diagram-trace", about = "Diagram trace plugin admin server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the admin API server")]
    Serve {
        #[arg(long, help = "Listen port (defaults to API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Use the in-memory store instead of DATABASE_URL")]
        memory: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, memory } => serve(port, memory).await,
    }
}

async fn serve(port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let session_factory: Arc<dyn SessionFactory> = if memory {
        tracing::warn!("running against the in-memory store, data will not survive a restart");
        Arc::new(MemorySessionFactory::new())
    } else {
        Arc::new(PgSessionFactory::from_env().await?)
    };

    let plugin = Arc::new(DiagramTracePlugin::start(session_factory).await?);
    let router = Arc::clone(&plugin).admin_router();

    let port = port.unwrap_or(config().api.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "admin API listening");

    axum::serve(listener, router).await?;
    plugin.stop().await;
    Ok(())
}
