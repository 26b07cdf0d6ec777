//! CLI configuration: a thin wrapper around `fwdash_config`.
//!
//! Applies `GlobalOpts` flag overrides (--config, --store, --insecure,
//! --timeout) and wires the record store, vault and registries together.

use std::path::PathBuf;
use std::sync::Arc;

use fwdash_config::{Config, StoreBackend};
use fwdash_core::{
    DeviceRegistry, MemoryStore, RecordStore, SiteRegistry, SqliteStore, Vault, VendorConnector,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use fwdash_config::{config_path, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` or the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config and apply flag overrides. Flags beat file and env.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = fwdash_config::load_config_from(&active_config_path(global))?;

    if let Some(ref path) = global.store {
        cfg.store.backend = StoreBackend::Sqlite;
        cfg.store.path.clone_from(path);
    }
    if global.insecure {
        cfg.registry.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.registry.timeout = timeout;
    }

    cfg.validate()?;
    Ok(cfg)
}

// ── Runtime context ─────────────────────────────────────────────────

/// Store and site registry. The vault and device registry are built on
/// demand so site commands work without a master passphrase.
pub struct Context {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub sites: Arc<SiteRegistry>,
}

impl Context {
    pub async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load(global)?;
        let store: Arc<dyn RecordStore> = match config.store.backend {
            StoreBackend::Sqlite => {
                tracing::debug!(path = %config.store.path.display(), "opening SQLite store");
                Arc::new(SqliteStore::open(&config.store.path).await.map_err(|e| {
                    CliError::Store {
                        message: format!("{}: {e}", config.store.path.display()),
                    }
                })?)
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let sites = Arc::new(SiteRegistry::new(Arc::clone(&store)));
        Ok(Self {
            config,
            store,
            sites,
        })
    }

    /// Resolve the master passphrase and build the device registry.
    pub fn devices(&self) -> Result<Devices, CliError> {
        let passphrase = fwdash_config::resolve_master_passphrase(&self.config.vault)?;
        let vault = Arc::new(Vault::with_iterations(
            passphrase,
            self.config.vault.iterations,
        ));
        let connector = Arc::new(VendorConnector::new(self.config.adapter_options()));
        let registry = DeviceRegistry::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sites),
            Arc::clone(&vault),
            connector,
            self.config.registry_config()?,
        );
        Ok(Devices { registry, vault })
    }
}

pub struct Devices {
    pub registry: DeviceRegistry,
    pub vault: Arc<Vault>,
}
