//! Reloads the configuration file into a [`WatchConfiguration`] on change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use openctx_client::config::{ConfigFile, load_config_from_path};
use openctx_client::{HeaderTemplateCredentials, RawConfiguration, WatchConfiguration};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Host-facing configuration of a loaded file, with `--debug` forcing
/// diagnostics on.
pub fn effective_configuration(file: ConfigFile, debug: bool) -> RawConfiguration {
    let mut raw = file.configuration;
    if debug {
        raw.debug = Some(true);
    }
    raw
}

/// Load `path` again and publish its credentials and configuration.
/// Credentials go first so providers added by the edit are called with them.
pub fn reload(path: &Path, source: &WatchConfiguration, credentials: &HeaderTemplateCredentials, debug: bool) -> Result<()> {
    let file = load_config_from_path(path)?;
    credentials.replace(file.credentials.clone());
    source.set(effective_configuration(file, debug));
    Ok(())
}

/// Watch `path` and reload it on every change. A file that fails to load or
/// validate keeps the previous configuration and credentials.
///
/// The parent directory is watched so editors that replace the file on save
/// are still picked up.
pub fn watch_config_file(
    path: PathBuf,
    source: Arc<WatchConfiguration>,
    credentials: Arc<HeaderTemplateCredentials>,
    debug: bool,
) -> Result<RecommendedWatcher> {
    let directory = path
        .parent()
        .map(|parent| if parent.as_os_str().is_empty() { PathBuf::from(".") } else { parent.to_path_buf() })
        .filter(|parent| parent.exists())
        .with_context(|| format!("cannot watch {}: its directory does not exist", path.display()))?;
    let file_name = path.file_name().map(|name| name.to_os_string());

    let (tx, mut rx) = mpsc::channel(1);
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| {
            let Ok(event) = result else { return };
            let relevant = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
            let ours = event
                .paths
                .iter()
                .any(|changed| changed.file_name().map(|name| name.to_os_string()) == file_name);
            if relevant && ours {
                // A pending reload already covers this event.
                let _ = tx.try_send(());
            }
        },
        notify::Config::default(),
    )
    .context("failed to create configuration watcher")?;
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", directory.display()))?;
    info!("Watching configuration file {}", path.display());

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            match reload(&path, &source, &credentials, debug) {
                Ok(()) => info!("Configuration changed, reloaded {}", path.display()),
                Err(error) => warn!("Ignoring invalid configuration: {error:#}"),
            }
        }
    });

    Ok(watcher)
}
