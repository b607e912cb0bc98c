//! podd — the podgrid daemon.
//!
//! Single binary that assembles the podgrid subsystems:
//! - Record store (redb)
//! - Orchestrator client (Kubernetes, or in-memory in standalone mode)
//! - Reconciler
//! - REST API
//!
//! # Usage
//!
//! ```text
//! podd serve --listen 0.0.0.0:8081 --data-dir /var/lib/podgrid --kubeconfig ~/.kube/config
//! podd standalone --data-dir ./data
//! podd --config podd.toml serve
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use podgrid_k8s::{KubeOrchestrator, MemoryOrchestrator, Orchestrator};
use podgrid_reconciler::Reconciler;
use podgrid_state::StateStore;

use crate::config::DaemonConfig;

const DEFAULT_LOG_FILTER: &str = "info,podd=debug,podgrid=debug";

#[derive(Parser)]
#[command(name = "podd", about = "podgrid daemon")]
struct Cli {
    /// Configuration file; command-line flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the pod API against a Kubernetes cluster.
    Serve {
        #[command(flatten)]
        server: ServerArgs,

        /// Kubeconfig file (default: in-cluster, $KUBECONFIG or ~/.kube/config).
        #[arg(long)]
        kubeconfig: Option<PathBuf>,

        /// Kubeconfig context to use.
        #[arg(long)]
        context: Option<String>,
    },
    /// Serve the pod API with an in-memory orchestrator (no cluster needed).
    Standalone {
        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args)]
struct ServerArgs {
    /// Address to listen on [default: 0.0.0.0:8081].
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Data directory for the record store [default: /var/lib/podgrid].
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Record store file name inside the data directory [default: podgrid.redb].
    #[arg(long)]
    db_file: Option<String>,
}

impl Cli {
    /// Split into the selected mode and the flags to merge over the file.
    fn into_parts(self) -> (bool, DaemonConfig) {
        let log_json = self.log_json.then_some(true);
        match self.command {
            Command::Serve {
                server,
                kubeconfig,
                context,
            } => (
                false,
                DaemonConfig {
                    listen: server.listen,
                    data_dir: server.data_dir,
                    db_file: server.db_file,
                    kubeconfig,
                    context,
                    log_json,
                },
            ),
            Command::Standalone { server } => (
                true,
                DaemonConfig {
                    listen: server.listen,
                    data_dir: server.data_dir,
                    db_file: server.db_file,
                    log_json,
                    ..Default::default()
                },
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => DaemonConfig::from_file(path)?,
        None => DaemonConfig::default(),
    };
    let (standalone, flags) = cli.into_parts();
    let settings = file.merge(flags).settings();

    init_tracing(settings.log_json);

    // Ensure data directory exists.
    std::fs::create_dir_all(&settings.data_dir)?;
    let db_path = settings.db_path();
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "record store opened");

    let orchestrator: Arc<dyn Orchestrator> = if standalone {
        info!("podgrid daemon starting in standalone mode");
        let memory = MemoryOrchestrator::new();
        memory.restore(&store).await?;
        Arc::new(memory)
    } else {
        info!("podgrid daemon starting");
        let client = KubeOrchestrator::connect(
            settings.kubeconfig.as_deref(),
            settings.context.as_deref(),
        )
        .await?;
        Arc::new(client)
    };

    run(settings.listen, Reconciler::new(orchestrator, store)).await
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(listen: SocketAddr, reconciler: Reconciler) -> anyhow::Result<()> {
    let router = podgrid_api::build_router(reconciler);

    info!(addr = %listen, "API server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("podgrid daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
