//! netlab - drive a single emulated network node through its lifecycle.
//!
//! This is the entry point for the `netlab` binary. Each invocation loads one
//! node definition (see [`config::NodeDefinition`]) and runs the lifecycle
//! steps its subcommand needs against the docker CLI.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use netlab_nodes::{registry, NodeDriver, Peers, PreDeployParams};
use netlab_runtime::{DockerCli, DockerConfig, RuntimeGateway};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::NodeDefinition;

/// netlab - drive a single emulated network node through its lifecycle.
#[derive(Parser, Debug)]
#[command(name = "netlab")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Docker binary to invoke.
    #[arg(long, env = "NETLAB_DOCKER_BIN", global = true)]
    docker_bin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered node kinds.
    Kinds,
    /// Initialize the node and write its startup configuration.
    Render {
        /// Path to the node definition file.
        definition: PathBuf,
    },
    /// Render, create and start the node, then run post-deploy actions.
    Deploy {
        /// Path to the node definition file.
        definition: PathBuf,
    },
    /// Remove the node's container. Succeeds if it does not exist.
    Destroy {
        /// Path to the node definition file.
        definition: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,netlab=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut docker = DockerConfig::from_env();
    if let Some(binary) = args.docker_bin {
        docker.binary = binary;
    }
    let runtime: Arc<dyn RuntimeGateway> = Arc::new(DockerCli::new(docker));

    let ctx = CancellationToken::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let result = match args.command {
        Command::Kinds => {
            for kind in registry::global().kinds() {
                println!("{kind}");
            }
            Ok(())
        }
        Command::Render { definition } => render(&definition, runtime),
        Command::Deploy { definition } => deploy(&definition, runtime, &ctx).await,
        Command::Destroy { definition } => destroy(&definition, runtime, &ctx).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }
    result
}

/// Load a definition and return an initialized driver.
fn init_node(
    definition: &Path,
    runtime: Arc<dyn RuntimeGateway>,
) -> anyhow::Result<(Box<dyn NodeDriver>, PreDeployParams)> {
    let def = NodeDefinition::load(definition)?;
    tracing::info!(
        node = %def.node.short_name,
        kind = %def.node.kind,
        lab = %def.lab_name,
        "Loaded node definition"
    );

    let mut node = registry::global().new_driver(&def.node.kind, runtime)?;
    node.init(def.node, Vec::new())?;
    Ok((node, PreDeployParams::new(def.lab_name)))
}

fn render(definition: &Path, runtime: Arc<dyn RuntimeGateway>) -> anyhow::Result<()> {
    let (mut node, params) = init_node(definition, runtime)?;
    node.pre_deploy(&params)?;

    if let Some(path) = &node.config().resolved_startup_config {
        println!("{}", path.display());
    }
    Ok(())
}

async fn deploy(
    definition: &Path,
    runtime: Arc<dyn RuntimeGateway>,
    ctx: &CancellationToken,
) -> anyhow::Result<()> {
    let (mut node, params) = init_node(definition, runtime)?;
    node.pre_deploy(&params)?;
    node.deploy(ctx)
        .await
        .with_context(|| format!("failed to deploy {}", node.config().long_name))?;
    node.post_deploy(ctx, &Peers::new()).await?;

    println!("{}", node.config().long_name);
    Ok(())
}

async fn destroy(
    definition: &Path,
    runtime: Arc<dyn RuntimeGateway>,
    ctx: &CancellationToken,
) -> anyhow::Result<()> {
    let (mut node, _) = init_node(definition, runtime)?;
    node.delete(ctx).await?;
    Ok(())
}
