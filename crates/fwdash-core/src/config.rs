// ── Runtime registry configuration ──
//
// Built by the CLI from the config file; core never reads config files
// itself. Adapter transport options travel separately, inside the
// `Connector` handed to the registry.

use fwdash_api::Vendor;

/// Tuning for a [`DeviceRegistry`](crate::DeviceRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// The vendor this registry manages. Reloads only read rows with this
    /// `vendor` value and new devices are written with it.
    pub vendor: Vendor,
    /// How many devices are queried at once during a reload. `1` queries
    /// them one after another.
    pub fetch_concurrency: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            vendor: Vendor::PaloAlto,
            fetch_concurrency: 1,
        }
    }
}
