// The vendor-neutral device capability surface.
//
// Registries and object views only ever see `dyn DeviceApi`. The vendor tag
// is consulted exactly once, in `connect()`, to pick the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::{ConnectTarget, Vendor};
use crate::error::Error;
use crate::junos::JunosApi;
use crate::paloalto::PaloAltoApi;
use crate::transport::TransportConfig;

/// A raw vendor list entry (PAN-OS REST `entry` element), keys as the device
/// sends them (`@name`, `ip-netmask`, `tag`, ...).
pub type VendorRecord = serde_json::Map<String, serde_json::Value>;

// ── Facts ───────────────────────────────────────────────────────────

/// Identity facts reported by the device itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFacts {
    pub model: String,
    pub serial: String,
    pub software_version: String,
}

/// High-availability state as reported by one member of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HaStatus {
    Disabled,
    Enabled {
        local_state: String,
        peer_state: String,
        peer_serial: String,
    },
}

impl HaStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Serial of the partner device, when HA is enabled.
    pub fn peer_serial(&self) -> Option<&str> {
        match self {
            Self::Enabled { peer_serial, .. } => Some(peer_serial),
            Self::Disabled => None,
        }
    }
}

// ── Object records ──────────────────────────────────────────────────

/// One tag object (`Objects/Tags`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@location", default)]
    pub location: Option<String>,
    #[serde(rename = "@vsys", default)]
    pub vsys: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// One active GlobalProtect user session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpSession {
    pub username: Option<String>,
    pub primary_username: Option<String>,
    pub region: Option<String>,
    pub computer: Option<String>,
    pub client: Option<String>,
    pub vpn_type: Option<String>,
    pub host_id: Option<String>,
    pub app_version: Option<String>,
    pub virtual_ip: Option<String>,
    pub public_ip: Option<String>,
    pub tunnel_type: Option<String>,
    pub login_time: Option<String>,
}

/// One IPsec tunnel as seen by the data plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnTunnel {
    pub name: String,
    pub gateway: Option<String>,
    pub peer_ip: Option<String>,
    pub local_ip: Option<String>,
    pub inner_if: Option<String>,
    pub outer_if: Option<String>,
    pub state: Option<String>,
}

// ── Capability trait ────────────────────────────────────────────────

/// Everything the registries and object views can ask of a device.
///
/// Each vendor implements the subset its management protocol supports; the
/// default bodies answer [`Error::Unsupported`].
#[async_trait]
pub trait DeviceApi: Send + Sync {
    fn hostname(&self) -> &str;

    fn vendor(&self) -> Vendor;

    /// Model, serial number and software version.
    async fn get_device(&self) -> Result<DeviceFacts, Error>;

    /// HA state, including the partner serial when HA is enabled.
    async fn get_ha(&self) -> Result<HaStatus, Error>;

    /// Running configuration as the raw document the device returns.
    async fn get_config(&self) -> Result<String, Error> {
        Err(Error::Unsupported("config"))
    }

    async fn get_tags(&self) -> Result<Vec<TagEntry>, Error> {
        Err(Error::Unsupported("tags"))
    }

    async fn get_addresses(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("addresses"))
    }

    async fn get_address_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("address groups"))
    }

    async fn get_application_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("application groups"))
    }

    async fn get_services(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("services"))
    }

    async fn get_service_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("service groups"))
    }

    async fn get_nat_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("NAT policies"))
    }

    async fn get_security_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("security policies"))
    }

    async fn get_qos_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        Err(Error::Unsupported("QoS policies"))
    }

    async fn get_gp_sessions(&self) -> Result<Vec<GpSession>, Error> {
        Err(Error::Unsupported("GlobalProtect sessions"))
    }

    async fn get_vpn_tunnels(&self) -> Result<Vec<VpnTunnel>, Error> {
        Err(Error::Unsupported("VPN tunnels"))
    }
}

// ── Construction ────────────────────────────────────────────────────

/// Tunables shared by every adapter `connect()` builds.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub transport: TransportConfig,
    /// PAN-OS REST API version segment, `vX.Y`.
    pub rest_version: String,
    /// PAN-OS REST `location` parameter (`vsys`, `device`, `shared`, `panorama`).
    pub location: String,
    pub vsys: String,
    /// Port of the Junos REST RPC service.
    pub junos_port: u16,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            rest_version: "v11.0".into(),
            location: "vsys".into(),
            vsys: "vsys1".into(),
            junos_port: 3443,
        }
    }
}

/// Build the adapter for one device.
///
/// PAN-OS adapters are stateless and never touch the network here. Junos
/// adapters open their session immediately; an open failure is recorded in
/// the adapter rather than returned, so this only fails on local problems
/// (bad hostname, TLS setup).
pub async fn connect(
    target: &ConnectTarget,
    options: &AdapterOptions,
) -> Result<Box<dyn DeviceApi>, Error> {
    debug!(vendor = %target.vendor, hostname = %target.hostname, "building device adapter");
    match target.vendor {
        Vendor::PaloAlto => {
            let base = Url::parse(&format!("https://{}/", target.hostname))?;
            let api = PaloAltoApi::new(base, &target.hostname, &target.credentials, options)?;
            Ok(Box::new(api))
        }
        Vendor::Junos => {
            let base = Url::parse(&format!(
                "https://{}:{}/",
                target.hostname, options.junos_port
            ))?;
            let api = JunosApi::open(
                base,
                &target.hostname,
                &target.credentials,
                &options.transport,
            )
            .await?;
            Ok(Box::new(api))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ha_status_serializes_with_mode_tag() {
        let enabled = HaStatus::Enabled {
            local_state: "active".into(),
            peer_state: "passive".into(),
            peer_serial: "0002".into(),
        };
        let json = serde_json::to_value(&enabled).unwrap();
        assert_eq!(json["mode"], "enabled");
        assert_eq!(enabled.peer_serial(), Some("0002"));
        assert!(!HaStatus::Disabled.is_enabled());
    }

    #[test]
    fn tag_entry_reads_rest_attribute_keys() {
        let tag: TagEntry = serde_json::from_value(serde_json::json!({
            "@name": "prod",
            "@location": "vsys",
            "@vsys": "vsys1",
            "color": "color3"
        }))
        .unwrap();
        assert_eq!(tag.name, "prod");
        assert_eq!(tag.color.as_deref(), Some("color3"));
        assert!(tag.comments.is_none());
    }

    #[test]
    fn default_options_match_panos_defaults() {
        let options = AdapterOptions::default();
        assert_eq!(options.rest_version, "v11.0");
        assert_eq!(options.location, "vsys");
        assert_eq!(options.vsys, "vsys1");
        assert_eq!(options.junos_port, 3443);
    }
}
