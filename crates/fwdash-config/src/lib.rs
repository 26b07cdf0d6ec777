//! Configuration for the fwdash binary.
//!
//! TOML file + `FWDASH_` environment overrides, master passphrase
//! resolution (env var, then system keyring), and translation into the
//! runtime types `fwdash-core` and `fwdash-api` take. Core never reads
//! config files; everything it needs is passed in from here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use fwdash_api::{AdapterOptions, TlsMode, TransportConfig, Vendor};
use fwdash_core::RegistryConfig;
use fwdash_core::vault::DEFAULT_ITERATIONS;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyring service under which the master passphrase is stored.
pub const KEYRING_SERVICE: &str = "fwdash";
/// Keyring user of the master passphrase entry.
pub const KEYRING_USER: &str = "master-passphrase";

const LOCATIONS: [&str; 4] = ["vsys", "device", "shared", "panorama"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no master passphrase: set ${env} or store one in the system keyring")]
    NoMasterPassphrase { env: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub vault: VaultSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Nothing persisted; useful for dry runs.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Location of the SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrySettings {
    /// Vendor managed by the registry: `paloalto` or `junos`.
    #[serde(default = "default_vendor")]
    pub vendor: String,

    /// Devices queried at once during a reload.
    #[serde(default = "default_concurrency")]
    pub fetch_concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed device certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Path to a CA certificate used when `insecure` is off.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_rest_version")]
    pub rest_version: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_vsys")]
    pub vsys: String,

    #[serde(default = "default_junos_port")]
    pub junos_port: u16,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            fetch_concurrency: default_concurrency(),
            timeout: default_timeout(),
            insecure: default_insecure(),
            ca_cert: None,
            rest_version: default_rest_version(),
            location: default_location(),
            vsys: default_vsys(),
            junos_port: default_junos_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VaultSettings {
    /// Environment variable holding the master passphrase.
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,

    /// PBKDF2 rounds.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            passphrase_env: default_passphrase_env(),
            iterations: default_iterations(),
        }
    }
}

fn default_store_path() -> PathBuf {
    data_dir().join("fwdash.db")
}
fn default_vendor() -> String {
    Vendor::PaloAlto.to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_timeout() -> u64 {
    30
}
fn default_insecure() -> bool {
    true
}
fn default_rest_version() -> String {
    "v11.0".into()
}
fn default_location() -> String {
    "vsys".into()
}
fn default_vsys() -> String {
    "vsys1".into()
}
fn default_junos_port() -> u16 {
    3443
}
fn default_passphrase_env() -> String {
    "FWDASH_MASTER_PASSPHRASE".into()
}
fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fwdash", "fwdash")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "fwdash", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "fwdash"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FWDASH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    /// Check every section; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("store.path", "must not be empty"));
        }

        let registry = &self.registry;
        self.vendor()?;
        if registry.fetch_concurrency == 0 {
            return Err(ConfigError::invalid(
                "registry.fetch_concurrency",
                "must be at least 1",
            ));
        }
        if registry.timeout == 0 {
            return Err(ConfigError::invalid("registry.timeout", "must be at least 1 second"));
        }
        if !is_rest_version(&registry.rest_version) {
            return Err(ConfigError::invalid(
                "registry.rest_version",
                format!("expected vX.Y, got '{}'", registry.rest_version),
            ));
        }
        if !LOCATIONS.contains(&registry.location.as_str()) {
            return Err(ConfigError::invalid(
                "registry.location",
                format!(
                    "expected one of {}, got '{}'",
                    LOCATIONS.join(", "),
                    registry.location
                ),
            ));
        }
        if registry.location == "vsys" && registry.vsys.trim().is_empty() {
            return Err(ConfigError::invalid(
                "registry.vsys",
                "required when location is 'vsys'",
            ));
        }
        if self.vault.passphrase_env.trim().is_empty() {
            return Err(ConfigError::invalid("vault.passphrase_env", "must not be empty"));
        }
        if self.vault.iterations == 0 {
            return Err(ConfigError::invalid("vault.iterations", "must be at least 1"));
        }
        Ok(())
    }

    pub fn vendor(&self) -> Result<Vendor, ConfigError> {
        self.registry.vendor.parse().map_err(|_| {
            ConfigError::invalid(
                "registry.vendor",
                format!(
                    "expected 'paloalto' or 'junos', got '{}'",
                    self.registry.vendor
                ),
            )
        })
    }

    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig {
            vendor: self.vendor()?,
            fetch_concurrency: self.registry.fetch_concurrency,
        })
    }

    pub fn adapter_options(&self) -> AdapterOptions {
        let registry = &self.registry;
        let tls = if registry.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = registry.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        AdapterOptions {
            transport: TransportConfig {
                tls,
                timeout: Duration::from_secs(registry.timeout),
                cookie_jar: None,
            },
            rest_version: registry.rest_version.clone(),
            location: registry.location.clone(),
            vsys: registry.vsys.clone(),
            junos_port: registry.junos_port,
        }
    }
}

fn is_rest_version(version: &str) -> bool {
    let Some(rest) = version.strip_prefix('v') else {
        return false;
    };
    let mut parts = rest.split('.');
    let numeric = |p: Option<&str>| p.is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    numeric(parts.next()) && numeric(parts.next()) && parts.next().is_none()
}

// ── Master passphrase ───────────────────────────────────────────────

/// Resolve the master passphrase: the configured env var first, then the
/// system keyring.
pub fn resolve_master_passphrase(vault: &VaultSettings) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(val) = std::env::var(&vault.passphrase_env) {
        if !val.is_empty() {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    Err(ConfigError::NoMasterPassphrase {
        env: vault.passphrase_env.clone(),
    })
}

/// Store the master passphrase in the system keyring.
pub fn save_master_passphrase(passphrase: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(passphrase.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.vendor().unwrap(), Vendor::PaloAlto);
        assert_eq!(cfg.vault.iterations, DEFAULT_ITERATIONS);
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert!(cfg.store.path.ends_with("fwdash.db"));
    }

    #[test]
    fn file_then_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    [store]
                    backend = "memory"
                    path = "inventory.db"

                    [registry]
                    vendor = "junos"
                    fetch_concurrency = 2
                "#,
            )?;
            jail.set_env("FWDASH_REGISTRY__FETCH_CONCURRENCY", "8");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.store.backend, StoreBackend::Memory);
            assert_eq!(cfg.store.path, PathBuf::from("inventory.db"));
            assert_eq!(cfg.registry.fetch_concurrency, 8);
            assert_eq!(cfg.vendor().unwrap(), Vendor::Junos);
            assert_eq!(cfg.registry.rest_version, "v11.0");
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn validation_reports_the_offending_field() {
        let field_of = |cfg: &Config| match cfg.validate() {
            Err(ConfigError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        };

        let mut cfg = Config::default();
        cfg.registry.vendor = "cisco".into();
        assert_eq!(field_of(&cfg), "registry.vendor");

        let mut cfg = Config::default();
        cfg.registry.fetch_concurrency = 0;
        assert_eq!(field_of(&cfg), "registry.fetch_concurrency");

        let mut cfg = Config::default();
        cfg.registry.rest_version = "11.0".into();
        assert_eq!(field_of(&cfg), "registry.rest_version");

        let mut cfg = Config::default();
        cfg.registry.location = "global".into();
        assert_eq!(field_of(&cfg), "registry.location");

        let mut cfg = Config::default();
        cfg.store.path = PathBuf::new();
        assert_eq!(field_of(&cfg), "store.path");

        cfg.store.backend = StoreBackend::Memory;
        cfg.validate().unwrap();
    }

    #[test]
    fn rest_versions() {
        assert!(is_rest_version("v10.2"));
        assert!(is_rest_version("v11.0"));
        assert!(!is_rest_version("v11"));
        assert!(!is_rest_version("v11.0.1"));
        assert!(!is_rest_version("vX.Y"));
    }

    #[test]
    fn adapter_options_follow_tls_settings() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.adapter_options().transport.tls,
            TlsMode::DangerAcceptInvalid
        );

        cfg.registry.insecure = false;
        assert_eq!(cfg.adapter_options().transport.tls, TlsMode::System);

        cfg.registry.ca_cert = Some(PathBuf::from("/etc/fw-ca.pem"));
        cfg.registry.timeout = 5;
        let options = cfg.adapter_options();
        assert_eq!(
            options.transport.tls,
            TlsMode::CustomCa(PathBuf::from("/etc/fw-ca.pem"))
        );
        assert_eq!(options.transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn passphrase_from_configured_env_var() {
        Jail::expect_with(|jail| {
            jail.set_env("FWDASH_TEST_PASSPHRASE", "hunter2");
            let vault = VaultSettings {
                passphrase_env: "FWDASH_TEST_PASSPHRASE".into(),
                ..VaultSettings::default()
            };
            let secret = resolve_master_passphrase(&vault).unwrap();
            assert_eq!(secret.expose_secret(), "hunter2");
            Ok(())
        });
    }

    #[test]
    fn config_round_trips_through_toml() {
        Jail::expect_with(|jail| {
            let mut cfg = Config::default();
            cfg.registry.vendor = "junos".into();
            cfg.store.path = PathBuf::from("store.db");
            let path = jail.directory().join("nested").join("config.toml");
            save_config(&cfg, &path).unwrap();
            assert_eq!(load_config_from(&path).unwrap(), cfg);
            Ok(())
        });
    }
}
