use fwdash_api::{DeviceFacts, HaStatus, Vendor};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{DeviceId, SiteId};
use crate::store::Row;
use crate::vault::SealedSecret;

/// Value of the `type` column for every managed device.
pub const DEVICE_TYPE: &str = "firewall";
/// Value of the `auth_type` column for every managed device.
pub const AUTH_TYPE: &str = "token";

/// A managed firewall: persisted identity plus facts learned from the
/// device itself on the last reload.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: DeviceId,
    /// Friendly display name.
    pub name: String,
    /// Management address; unique across the registry.
    pub hostname: String,
    pub site: SiteId,
    /// Name of the owning site, or empty when the site no longer exists.
    pub site_name: String,
    pub vendor: Vendor,
    pub username: String,
    #[serde(skip)]
    pub(crate) sealed: SealedSecret,
    #[serde(skip)]
    pub(crate) key: Option<SecretString>,
    /// Serial number: live when the device answered, otherwise the last
    /// value persisted.
    pub serial: Option<String>,
    /// Partner serial as last persisted.
    pub ha_partner_serial: Option<String>,
    /// Live facts from the last reload; `None` when the device could not be
    /// queried.
    pub facts: Option<DeviceFacts>,
    /// Live HA state from the last reload.
    pub ha: Option<HaStatus>,
}

impl Device {
    pub fn model(&self) -> Option<&str> {
        self.facts.as_ref().map(|f| f.model.as_str())
    }

    pub fn software_version(&self) -> Option<&str> {
        self.facts.as_ref().map(|f| f.software_version.as_str())
    }

    /// `None` when HA state is unknown.
    pub fn ha_enabled(&self) -> Option<bool> {
        self.ha.as_ref().map(HaStatus::is_enabled)
    }

    pub fn ha_local_state(&self) -> Option<&str> {
        match &self.ha {
            Some(HaStatus::Enabled { local_state, .. }) => Some(local_state),
            _ => None,
        }
    }

    pub fn ha_peer_state(&self) -> Option<&str> {
        match &self.ha {
            Some(HaStatus::Enabled { peer_state, .. }) => Some(peer_state),
            _ => None,
        }
    }

    /// Partner serial: live when known, otherwise the persisted value.
    pub fn ha_peer_serial(&self) -> Option<&str> {
        self.ha
            .as_ref()
            .and_then(HaStatus::peer_serial)
            .or(self.ha_partner_serial.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// The stored (encrypted) password.
    pub fn sealed(&self) -> &SealedSecret {
        &self.sealed
    }

    /// Whether a REST API key is stored for this device.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub(crate) fn from_record(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            name: record.friendly_name,
            hostname: record.hostname,
            site: record.site,
            site_name: String::new(),
            vendor: record.vendor,
            username: record.username,
            sealed: SealedSecret {
                ciphertext: record.secret,
                salt: record.salt,
            },
            key: non_empty(record.token).map(SecretString::from),
            serial: non_empty(record.serial),
            ha_partner_serial: non_empty(record.ha_partner_serial),
            facts: None,
            ha: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// The persisted columns of a `devices` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DeviceRecord {
    pub id: DeviceId,
    pub hostname: String,
    pub site: SiteId,
    pub vendor: Vendor,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub auth_type: String,
    #[serde(default)]
    pub username: String,
    pub secret: String,
    pub salt: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub ha_partner_serial: Option<String>,
}

impl DeviceRecord {
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }

    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::String(self.id.to_string()));
        row.insert("hostname".into(), Value::String(self.hostname));
        row.insert("site".into(), Value::String(self.site.to_string()));
        row.insert("vendor".into(), Value::String(self.vendor.to_string()));
        row.insert("type".into(), Value::String(self.device_type));
        row.insert("auth_type".into(), Value::String(self.auth_type));
        row.insert("username".into(), Value::String(self.username));
        row.insert("secret".into(), Value::String(self.secret));
        row.insert("salt".into(), Value::String(self.salt));
        row.insert("token".into(), optional(self.token));
        row.insert("friendly_name".into(), Value::String(self.friendly_name));
        row.insert("serial".into(), optional(self.serial));
        row.insert("ha_partner_serial".into(), optional(self.ha_partner_serial));
        row
    }
}

fn optional(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record() -> DeviceRecord {
        DeviceRecord {
            id: DeviceId(Uuid::from_u128(7)),
            hostname: "fw1.example.com".into(),
            site: SiteId(Uuid::from_u128(1)),
            vendor: Vendor::PaloAlto,
            device_type: DEVICE_TYPE.into(),
            auth_type: AUTH_TYPE.into(),
            username: "admin".into(),
            secret: "c2VjcmV0".into(),
            salt: "c2FsdA==".into(),
            token: Some(String::new()),
            friendly_name: "Edge".into(),
            serial: None,
            ha_partner_serial: Some("0002".into()),
        }
    }

    #[test]
    fn row_round_trip_keeps_named_columns() {
        let row = record().into_row();
        assert_eq!(row["type"], "firewall");
        assert_eq!(row["vendor"], "paloalto");
        assert_eq!(row["serial"], Value::Null);
        assert_eq!(DeviceRecord::from_row(row).unwrap(), record());
    }

    #[test]
    fn decodes_rows_with_extra_and_missing_columns() {
        let row = json!({
            "id": Uuid::from_u128(9).to_string(),
            "hostname": "fw2",
            "site": Uuid::from_u128(1).to_string(),
            "vendor": "paloalto",
            "secret": "x",
            "salt": "y",
            "legacy_column": 42
        });
        let decoded = DeviceRecord::from_row(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(decoded.hostname, "fw2");
        assert!(decoded.serial.is_none());
    }

    #[test]
    fn empty_token_means_no_key() {
        let device = Device::from_record(record());
        assert!(!device.has_key());
        assert_eq!(device.name, "Edge");
        assert_eq!(device.ha_peer_serial(), Some("0002"));
        assert_eq!(device.ha_enabled(), None);
    }
}
