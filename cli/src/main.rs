mod reporter;

use std::collections::BTreeMap;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use modeldock_core::DockErr;
use modeldock_core::ModelSource;
use modeldock_core::ProviderKind;
use modeldock_core::StaticSource;
use modeldock_core::UnifiedModel;
use modeldock_core::config::Config;
use modeldock_core::config::ConfigOverrides;
use modeldock_core::reconcile;
use modeldock_core::replace_provider;
use modeldock_core::state::ConnectionError;
use modeldock_core::state::ConnectionState;
use modeldock_core::state::DaemonConnection;
use modeldock_core::store::JsonFileStore;
use modeldock_core::store::Store;
use modeldock_core::user_facing_message;
use modeldock_ollama::OllamaClient;

use crate::reporter::ConsoleReporter;

/// Manage models on a local daemon and the unified model registry.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Cli {
    /// Daemon base URL (overrides config.toml).
    #[arg(long = "daemon-url", value_name = "URL", global = true)]
    daemon_url: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Check whether the daemon is reachable.
    Status,
    /// List models installed on the daemon.
    List,
    /// Sync daemon models into the persisted unified registry.
    Sync,
    /// Show the persisted unified registry across all providers.
    Models,
    /// Pull a model onto the daemon (`:latest` when untagged).
    Pull { name: String },
    /// Create a model on the daemon from a local weights file.
    Create { name: String, source_path: String },
    /// Delete a model from the daemon.
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_default(),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = Config::load_with_overrides(ConfigOverrides {
        daemon_base_url: cli.daemon_url,
    })?;
    let client = OllamaClient::from_base_url(&config.daemon_base_url);

    if let Err(e) = run(cli.command, &config, &client).await {
        eprintln!("error: {}", user_facing_message(&e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, config: &Config, client: &OllamaClient) -> Result<(), DockErr> {
    match command {
        Command::Status => status(client).await,
        Command::List => list(client).await,
        Command::Sync => sync(config, client).await,
        Command::Models => models(config),
        Command::Pull { name } => {
            let mut reporter = ConsoleReporter::new();
            client.pull_with_reporter(&name, &mut reporter).await?;
            tracing::debug!("pull settled in phase {:?}", reporter.phase());
            println!("pulled {name}");
            Ok(())
        }
        Command::Create { name, source_path } => {
            let mut reporter = ConsoleReporter::new();
            client.create_model(&name, &source_path, &mut reporter).await?;
            tracing::debug!("create settled in phase {:?}", reporter.phase());
            println!("created {name}");
            Ok(())
        }
        Command::Delete { name } => {
            client.delete_model(&name).await?;
            println!("deleted {name}");
            Ok(())
        }
    }
}

/// Run one connection check and report where the machine settled.
async fn status(client: &OllamaClient) -> Result<(), DockErr> {
    let mut conn = DaemonConnection::new();
    conn.begin_check()?;
    match client.list_models().await {
        Ok(models) => {
            conn.check_succeeded()?;
            println!(
                "connected to {} ({} models installed)",
                client.host_root(),
                models.len()
            );
            Ok(())
        }
        Err(e) => {
            conn.check_failed(ConnectionError::classify(&e))?;
            if let Some(line) = failure_summary(conn.state()) {
                println!("{line}");
            }
            Err(e)
        }
    }
}

/// One-line verdict for a failed connection check. The two error states need
/// different fixes, so they get different lines.
fn failure_summary(state: &ConnectionState) -> Option<String> {
    match state {
        ConnectionState::Error(ConnectionError::CorsBlocked) => Some(
            "daemon appears to be up but is blocking this origin; allow it via OLLAMA_ORIGINS"
                .to_string(),
        ),
        ConnectionState::Error(ConnectionError::Unreachable(reason)) => {
            Some(format!("daemon unreachable: {reason}"))
        }
        _ => None,
    }
}

async fn list(client: &OllamaClient) -> Result<(), DockErr> {
    let models = client.list_models().await?;
    if models.is_empty() {
        println!("no models installed");
        return Ok(());
    }
    for model in models {
        println!(
            "{:<40} {:>9} {:>6} {}",
            model.name,
            human_size(model.size),
            model.details.parameter_size,
            model.modified_at.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

fn registry_store(config: &Config) -> Result<JsonFileStore<Vec<UnifiedModel>>, DockErr> {
    Ok(JsonFileStore::new(config.registry_path()?))
}

async fn sync(config: &Config, client: &OllamaClient) -> Result<(), DockErr> {
    let store = registry_store(config)?;
    let mut registry = store.load()?.unwrap_or_default();

    let fresh = client.list_models().await?;
    registry = reconcile(&registry, ProviderKind::Ollama, &fresh, client.host_root());

    // Catalogue-backed providers contribute their configured model sets.
    // Entries of the same kind are merged before the replace so one endpoint
    // does not clobber another.
    let mut catalogs: BTreeMap<&'static str, (ProviderKind, Vec<UnifiedModel>)> = BTreeMap::new();
    for info in config.providers.values() {
        if info.kind == ProviderKind::Ollama || info.catalog.is_empty() {
            continue;
        }
        // A provider whose key is not configured cannot serve its catalogue,
        // so its models stay out of the registry until the key is set.
        if let Err(e) = info.api_key() {
            tracing::warn!("skipping provider {}: {e}", info.name);
            continue;
        }
        let source = StaticSource::from_provider(info);
        let models = source.list_models().await?;
        catalogs
            .entry(info.kind.tag())
            .or_insert_with(|| (info.kind, Vec::new()))
            .1
            .extend(models);
    }
    for (_, (kind, models)) in catalogs {
        registry = replace_provider(&registry, kind, models);
    }

    store.save(&registry)?;
    println!(
        "synced {} daemon models; registry now holds {} entries",
        fresh.len(),
        registry.len()
    );
    Ok(())
}

fn models(config: &Config) -> Result<(), DockErr> {
    let store = registry_store(config)?;
    let registry = store.load()?.unwrap_or_default();
    if registry.is_empty() {
        println!("registry is empty; run `modeldock sync` first");
        return Ok(());
    }
    for model in registry {
        println!(
            "{:<48} {:<8} {}",
            model.id,
            model.provider.tag(),
            model.api_url
        );
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
