//! Wiring shared by every command
//!
//! Loads the configuration, opens the state directory, resolves the install
//! id and assembles a [`SyncOrchestrator`] over the HTTP client and the
//! library export file.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use playlog_cache::JsonFileStore;
use playlog_core::config::Config;
use playlog_core::ports::{CompositeAchievementProvider, IAchievementProvider, IStateStore};
use playlog_remote::HttpRemoteClient;
use playlog_sync::{
    BreakerSettings, CircuitBreaker, Collaborators, OrchestratorSettings, SyncOrchestrator,
};

use crate::library_file::LibraryFile;

/// Loads the configuration file.
///
/// An explicit `--config` path must exist and parse; the default path falls
/// back to built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok(config)
}

/// Assembled engine plus the configuration it was built from
pub struct AppContext {
    pub config: Config,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl AppContext {
    pub async fn build(config: Config, library: Option<PathBuf>) -> Result<Self> {
        let store: Arc<dyn IStateStore> = Arc::new(JsonFileStore::new(&config.storage.data_dir));
        debug!(data_dir = %config.storage.data_dir.display(), "Opened state directory");

        // The remote client needs the install id before the orchestrator loads
        let mut install = store
            .load_install_state()
            .await
            .context("Failed to load install state")?;
        if install.ensure_install_id() {
            store
                .save_install_state(&install)
                .await
                .context("Failed to save install state")?;
            info!(install_id = %install.install_id, "Generated new install id");
        }

        let remote = HttpRemoteClient::from_config(&config.remote)
            .context("Failed to create remote client")?
            .with_install_id(install.install_id.clone());

        let library = Arc::new(match library {
            Some(path) => LibraryFile::new(path),
            None => LibraryFile::empty(),
        });
        let provider: Arc<dyn IAchievementProvider> = library.clone();
        let achievements = CompositeAchievementProvider::new(vec![provider]);

        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::from(&config.breaker)));
        let deps = Collaborators {
            remote: Arc::new(remote),
            store,
            library,
            achievements: Arc::new(achievements),
            breaker,
        };

        let orchestrator = SyncOrchestrator::load(deps, OrchestratorSettings::from(&config))
            .await
            .context("Failed to load sync state")?;

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }
}
