//! vmstate - Report the state of locally managed virtual machine instances

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vmstate::core::Store;
use vmstate::report::{self, Format};
use vmstate::{APP_NAME, APP_VERSION};

#[derive(Parser, Debug)]
#[command(name = "vmstate", version, about = "Inspect local VM instances")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List instances
    List {
        /// Output format: table, json, yaml, or a template such as '{{.Name}}'
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Only list these instances
        names: Vec<String>,
    },
    /// Print the full state of one instance as JSON
    Inspect {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    info!("{} v{} starting", APP_NAME, APP_VERSION);

    let cli = Cli::parse();
    let store = Store::from_env().context("Failed to locate the instance store")?;

    match cli.command {
        Command::List { format, names } => list(&store, &Format::parse(&format), &names).await,
        Command::Inspect { name } => inspect(&store, &name).await,
    }
}

async fn list(store: &Store, format: &Format, names: &[String]) -> Result<()> {
    let instances = if names.is_empty() {
        store.inspect_all().await?
    } else {
        let mut instances = Vec::with_capacity(names.len());
        for name in names {
            match store.inspect(name).await {
                Ok(inst) => instances.push(inst),
                Err(e) => error!("Unable to load instance '{}': {}", name, e),
            }
        }
        instances
    };

    let mut stdout = io::stdout().lock();
    report::print_instances(&mut stdout, &instances, format)?;
    stdout.flush()?;
    Ok(())
}

async fn inspect(store: &Store, name: &str) -> Result<()> {
    let inst = store
        .inspect(name)
        .await
        .with_context(|| format!("Failed to inspect instance '{}'", name))?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &inst)?;
    writeln!(stdout)?;
    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vmstate=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
