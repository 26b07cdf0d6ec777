//! Registries and credential handling between `fwdash-api` and the CLI.
//!
//! This crate owns the business logic of the firewall inventory:
//!
//! - **[`SiteRegistry`]**: named sites, unique by name, mirrored from the
//!   `sites` table and refreshed on every mutation.
//!
//! - **[`DeviceRegistry`]**: managed firewalls. A reload reads the
//!   `devices` table, queries every device through a [`Connector`], writes
//!   learned serials back, assigns devices to sites and derives HA pairs.
//!   Credential rotation ([`DeviceRegistry::reset_master_password`]) lives
//!   here as well.
//!
//! - **[`Vault`]**: password encryption under a master passphrase
//!   (PBKDF2-HMAC-SHA256 into AES-256-GCM, one salt per secret).
//!
//! - **[`RecordStore`]**: the table-of-rows persistence seam, with an
//!   in-memory implementation for tests and a SQLite implementation.
//!
//! - **[`objects`]**: normalized views of the policy and object data a
//!   device returns, plus running-config download.

pub mod config;
pub mod error;
pub mod model;
pub mod objects;
pub mod registry;
pub mod store;
pub mod vault;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::RegistryConfig;
pub use error::{CoreError, Failure};
pub use registry::{
    Connector, DeviceRegistry, DeviceUpdate, MIN_KEY_LEN, NewDevice, SiteRegistry, VendorConnector,
};
pub use store::{Filter, MemoryStore, RecordStore, Row, SqliteStore, StoreError, Table};
pub use vault::{SealedSecret, Vault, VaultError};

pub use model::{Device, DeviceId, HaPair, Site, SiteId, pair_devices};
