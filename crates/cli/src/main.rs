mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use futures_util::{Stream, StreamExt};
use openctx_client::config::{ConfigFile, default_config_path, load_config_from_path};
use openctx_client::{
    Client, ClientEnv, ConfigurationSource, HeaderTemplateCredentials, ObserveOptions, StaticConfiguration,
    WatchConfiguration,
};
use openctx_types::{AnnotationsParams, ItemsParams};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "openctx", version, about = "Query OpenCtx providers for items and annotations")]
struct Cli {
    /// Configuration file (defaults to $OPENCTX_CONFIG_PATH or <config dir>/openctx/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    /// Log provider diagnostics to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search items across all providers
    Items {
        #[arg(long)]
        query: Option<String>,
        /// Keep running and print updated results when the configuration changes
        #[arg(long)]
        watch: bool,
    },
    /// Annotations for a file
    Annotations {
        file: PathBuf,
        /// Resource URI to report instead of the file's own URI
        #[arg(long)]
        uri: Option<String>,
        #[arg(long)]
        watch: bool,
    },
    /// Capabilities of a single provider
    Capabilities { provider_uri: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_path = cli
        .config
        .as_deref()
        .map(openctx_util::expand_tilde)
        .unwrap_or_else(default_config_path);
    let file = load_config_from_path(&config_path)?;
    let credentials = Arc::new(HeaderTemplateCredentials::new(file.credentials.clone()));

    match cli.command {
        Command::Items { query, watch } => {
            let params = ItemsParams { query };
            if watch {
                let (client, _watcher) = watching_client(&config_path, file, cli.debug, credentials)?;
                print_until_interrupted(client.items_changes(params, ObserveOptions::default())).await?;
                client.dispose();
            } else {
                let client = static_client(file, cli.debug, credentials)?;
                print_json(&client.items(params).await)?;
            }
        }
        Command::Annotations { file: path, uri, watch } => {
            let params = annotations_params(&path, uri).await?;
            if watch {
                let (client, _watcher) = watching_client(&config_path, file, cli.debug, credentials)?;
                print_until_interrupted(client.annotations_changes(params, ObserveOptions::default())).await?;
                client.dispose();
            } else {
                let client = static_client(file, cli.debug, credentials)?;
                print_json(&client.annotations(params).await)?;
            }
        }
        Command::Capabilities { provider_uri } => {
            let client = static_client(file, cli.debug, credentials)?;
            let capabilities = client.capabilities(&provider_uri).await?;
            print_json(&capabilities)?;
        }
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "info,openctx=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn static_client(file: ConfigFile, debug: bool, credentials: Arc<HeaderTemplateCredentials>) -> Result<Client> {
    let source = StaticConfiguration::new(watch::effective_configuration(file, debug));
    build_client(Arc::new(source), credentials)
}

/// Client whose configuration follows edits to the configuration file.
/// The returned watcher must be kept alive for as long as updates are wanted.
fn watching_client(
    config_path: &Path,
    file: ConfigFile,
    debug: bool,
    credentials: Arc<HeaderTemplateCredentials>,
) -> Result<(Client, notify::RecommendedWatcher)> {
    let source = Arc::new(WatchConfiguration::new(watch::effective_configuration(file, debug)));
    let watcher = watch::watch_config_file(config_path.to_path_buf(), Arc::clone(&source), Arc::clone(&credentials), debug)?;
    Ok((build_client(source, credentials)?, watcher))
}

fn build_client(source: Arc<dyn ConfigurationSource>, credentials: Arc<HeaderTemplateCredentials>) -> Result<Client> {
    let env = ClientEnv::new(source).with_credentials(credentials);
    Client::new(env).context("failed to start the OpenCtx client")
}

async fn annotations_params(path: &Path, uri: Option<String>) -> Result<AnnotationsParams> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let uri = match uri {
        Some(uri) => uri,
        None => {
            let absolute = std::fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))?;
            url::Url::from_file_path(&absolute)
                .map_err(|_| anyhow!("cannot express {} as a file URI", absolute.display()))?
                .to_string()
        }
    };
    Ok(AnnotationsParams::new(uri, content))
}

async fn print_until_interrupted<S, T>(mut stream: S) -> Result<()>
where
    S: Stream<Item = T> + Unpin,
    T: serde::Serialize,
{
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            next = stream.next() => match next {
                Some(snapshot) => print_json(&snapshot)?,
                None => break,
            },
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
