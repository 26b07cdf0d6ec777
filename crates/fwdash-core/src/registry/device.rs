use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::StreamExt;
use futures_util::stream;
use fwdash_api::{ConnectTarget, Credentials, DeviceApi};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::connector::Connector;
use super::reconcile::{assign_sites, persist_back_body};
use super::site::SiteRegistry;
use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::model::device::DeviceRecord;
use crate::model::ids::allocate_id;
use crate::model::{AUTH_TYPE, DEVICE_TYPE, Device, DeviceId, HaPair, SiteId, pair_devices};
use crate::store::{Filter, RecordStore, Row, StoreError, Table};
use crate::vault::{SealedSecret, Vault};

/// Minimum accepted length of a REST API key.
pub const MIN_KEY_LEN: usize = 32;

/// Input for [`DeviceRegistry::add_device`].
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub hostname: String,
    pub site: SiteId,
    /// REST API key; at least [`MIN_KEY_LEN`] characters.
    pub key: SecretString,
    pub username: String,
    /// Password already sealed by the vault.
    pub password: SealedSecret,
}

/// Input for [`DeviceRegistry::update_device`]. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub site: Option<SiteId>,
    pub key: Option<SecretString>,
    pub username: Option<String>,
    /// A sealed password equal to the stored one is passed through as is.
    pub password: Option<SealedSecret>,
}

/// The managed devices, their live facts and the HA pairs among them.
///
/// A reload re-reads every row, queries every device, writes learned serials
/// back, assigns devices to sites and recomputes HA pairs. Snapshots are
/// replaced wholesale at the end of each reload.
pub struct DeviceRegistry {
    store: Arc<dyn RecordStore>,
    sites: Arc<SiteRegistry>,
    vault: Arc<Vault>,
    connector: Arc<dyn Connector>,
    config: RegistryConfig,
    devices: ArcSwap<Vec<Arc<Device>>>,
    pairs: ArcSwap<Vec<HaPair>>,
    lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sites: Arc<SiteRegistry>,
        vault: Arc<Vault>,
        connector: Arc<dyn Connector>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            sites,
            vault,
            connector,
            config,
            devices: ArcSwap::from_pointee(Vec::new()),
            pairs: ArcSwap::from_pointee(Vec::new()),
            lock: Mutex::new(()),
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn devices(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.load_full()
    }

    pub fn ha_pairs(&self) -> Arc<Vec<HaPair>> {
        self.pairs.load_full()
    }

    pub fn get(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.devices.load().iter().find(|d| d.id == id).cloned()
    }

    pub fn find_by_hostname(&self, hostname: &str) -> Option<Arc<Device>> {
        self.devices
            .load()
            .iter()
            .find(|d| d.hostname == hostname)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.load().is_empty()
    }

    pub fn sites(&self) -> &Arc<SiteRegistry> {
        &self.sites
    }

    // ── Reload ───────────────────────────────────────────────────────

    /// Full reload: read, enrich, persist back, assign sites, pair.
    pub async fn reload(&self) -> Result<(), CoreError> {
        let _guard = self.lock.lock().await;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> Result<(), CoreError> {
        let filter = Filter::eq("vendor", self.config.vendor.to_string());
        let rows = self
            .store
            .read(Table::Devices, Some(&filter))
            .await
            .map_err(|e| {
                error!(error = %e, "could not read devices");
                CoreError::from(e)
            })?;

        let records: Vec<DeviceRecord> = rows
            .into_iter()
            .filter_map(|row| match DeviceRecord::from_row(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed device row");
                    None
                }
            })
            .collect();

        let concurrency = self.config.fetch_concurrency.max(1);
        let mut devices: Vec<Device> = stream::iter(records)
            .map(|record| self.enrich(record))
            .buffered(concurrency)
            .collect()
            .await;

        if let Err(e) = self.sites.reload().await {
            warn!(error = %e, "site reload failed, assigning against the previous snapshot");
        }
        let membership = assign_sites(&mut devices, &self.sites.snapshot());
        self.sites.set_membership(membership);

        let devices: Vec<Arc<Device>> = devices.into_iter().map(Arc::new).collect();
        let pairs = pair_devices(&devices);
        debug!(devices = devices.len(), pairs = pairs.len(), "devices reloaded");

        self.devices.store(Arc::new(devices));
        self.pairs.store(Arc::new(pairs));
        Ok(())
    }

    /// Decrypt, query and persist back one device. Never fails: every
    /// problem is logged and leaves the live fields unset.
    async fn enrich(&self, record: DeviceRecord) -> Device {
        let mut device = Device::from_record(record);

        let api = match self.open(&device).await {
            Ok(api) => api,
            Err(e) => {
                warn!(device = %device.id, hostname = %device.hostname, error = %e, "device not queried");
                return device;
            }
        };

        match api.get_device().await {
            Ok(facts) => {
                device.serial = Some(facts.serial.clone());
                device.facts = Some(facts);
            }
            Err(e) => {
                warn!(device = %device.id, hostname = %device.hostname, error = %e, "could not read device facts");
            }
        }
        match api.get_ha().await {
            Ok(ha) => device.ha = Some(ha),
            Err(e) => {
                warn!(device = %device.id, hostname = %device.hostname, error = %e, "could not read HA state");
            }
        }

        if device.facts.is_some() || device.ha.is_some() {
            let body = persist_back_body(&device);
            device.ha_partner_serial = body
                .get("ha_partner_serial")
                .and_then(Value::as_str)
                .map(str::to_owned);
            if let Err(e) = self
                .store
                .update(Table::Devices, &Filter::id(device.id), body)
                .await
            {
                error!(device = %device.id, error = %e, "could not persist device facts");
            }
        }
        device
    }

    /// Decrypt the stored credentials and build the adapter.
    async fn open(&self, device: &Device) -> Result<Box<dyn DeviceApi>, CoreError> {
        let password = self.vault.decrypt(&device.sealed)?;
        let mut credentials = Credentials::new(device.username.clone(), password);
        if let Some(key) = &device.key {
            credentials = credentials.with_api_key(key.clone());
        }
        let target = ConnectTarget {
            vendor: device.vendor,
            hostname: device.hostname.clone(),
            credentials,
        };
        Ok(self.connector.connect(&target).await?)
    }

    /// Adapter for one device, with credentials decrypted on demand.
    pub async fn connect(&self, id: DeviceId) -> Result<Box<dyn DeviceApi>, CoreError> {
        let device = match self.get(id) {
            Some(device) => device,
            None => {
                self.reload().await?;
                self.get(id).ok_or_else(|| CoreError::not_found("Device", id))?
            }
        };
        self.open(&device).await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Register a device. Validation happens before any store write.
    pub async fn add_device(&self, new: NewDevice) -> Result<Arc<Device>, CoreError> {
        validate_key(&new.key)?;
        validate_hostname(&new.hostname)?;

        self.sites.reload().await?;
        if self.sites.get(new.site).is_none() {
            return Err(CoreError::validation(format!(
                "Site {} does not exist",
                new.site
            )));
        }

        let _guard = self.lock.lock().await;
        self.reload_locked().await?;
        if self.find_by_hostname(&new.hostname).is_some() {
            return Err(CoreError::validation(format!(
                "A device with hostname '{}' already exists",
                new.hostname
            )));
        }

        let snapshot = self.devices();
        let id = DeviceId(allocate_id(
            |candidate| snapshot.iter().any(|d| d.id.as_uuid() == candidate),
            Uuid::new_v4,
        ));

        let record = DeviceRecord {
            id,
            hostname: new.hostname,
            site: new.site,
            vendor: self.config.vendor,
            device_type: DEVICE_TYPE.into(),
            auth_type: AUTH_TYPE.into(),
            username: new.username,
            secret: new.password.ciphertext,
            salt: new.password.salt,
            token: Some(new.key.expose_secret().to_owned()),
            friendly_name: new.name,
            serial: None,
            ha_partner_serial: None,
        };
        let hostname = record.hostname.clone();
        self.store
            .add(Table::Devices, record.into_row())
            .await
            .map_err(|e| {
                error!(device = %id, error = %e, "could not add device");
                CoreError::from(e)
            })?;
        info!(device = %id, hostname = %hostname, "device added");

        self.reload_locked().await?;
        self.get(id).ok_or_else(|| CoreError::not_found("Device", id))
    }

    /// Change a device's identity, site or credentials.
    pub async fn update_device(&self, id: DeviceId, update: DeviceUpdate) -> Result<(), CoreError> {
        if let Some(key) = &update.key {
            validate_key(key)?;
        }
        if let Some(hostname) = &update.hostname {
            validate_hostname(hostname)?;
        }

        let _guard = self.lock.lock().await;
        self.reload_locked().await?;
        let current = self.get(id).ok_or_else(|| CoreError::not_found("Device", id))?;

        if let Some(site) = update.site {
            if self.sites.get(site).is_none() {
                return Err(CoreError::validation(format!("Site {site} does not exist")));
            }
        }
        if let Some(hostname) = &update.hostname {
            if self.find_by_hostname(hostname).is_some_and(|d| d.id != id) {
                return Err(CoreError::validation(format!(
                    "A device with hostname '{hostname}' already exists"
                )));
            }
        }

        let sealed = match update.password {
            Some(sealed) if sealed == current.sealed => {
                debug!(device = %id, "password unchanged, keeping stored ciphertext");
                current.sealed.clone()
            }
            Some(sealed) => sealed,
            None => current.sealed.clone(),
        };

        let mut body = Row::new();
        body.insert(
            "friendly_name".into(),
            Value::String(update.name.unwrap_or_else(|| current.name.clone())),
        );
        body.insert(
            "hostname".into(),
            Value::String(update.hostname.unwrap_or_else(|| current.hostname.clone())),
        );
        body.insert(
            "site".into(),
            Value::String(update.site.unwrap_or(current.site).to_string()),
        );
        body.insert(
            "username".into(),
            Value::String(update.username.unwrap_or_else(|| current.username.clone())),
        );
        body.insert("secret".into(), Value::String(sealed.ciphertext));
        body.insert("salt".into(), Value::String(sealed.salt));
        if let Some(key) = update.key {
            body.insert(
                "token".into(),
                Value::String(key.expose_secret().to_owned()),
            );
        }

        self.store
            .update(Table::Devices, &Filter::id(id), body)
            .await
            .map_err(|e| store_failure(id, "update", e))?;
        info!(device = %id, "device updated");

        self.reload_locked().await
    }

    pub async fn delete_device(&self, id: DeviceId) -> Result<(), CoreError> {
        let _guard = self.lock.lock().await;
        self.store
            .delete(Table::Devices, &Filter::id(id))
            .await
            .map_err(|e| store_failure(id, "delete", e))?;
        info!(device = %id, "device deleted");

        self.reload_locked().await
    }

    // ── Credentials ──────────────────────────────────────────────────

    /// Seal a password for `update_device`.
    ///
    /// When `plaintext` is what the device already stores, the stored
    /// sealed value is returned so the update becomes a no-op for the
    /// secret. Otherwise it is freshly encrypted.
    pub async fn seal_password(&self, id: DeviceId, plaintext: &str) -> Result<SealedSecret, CoreError> {
        let device = match self.get(id) {
            Some(device) => device,
            None => {
                self.reload().await?;
                self.get(id).ok_or_else(|| CoreError::not_found("Device", id))?
            }
        };

        if let Ok(current) = self.vault.decrypt(&device.sealed) {
            if current.expose_secret() == plaintext {
                return Ok(device.sealed.clone());
            }
        }
        Ok(self.vault.encrypt(plaintext)?)
    }

    /// Re-encrypt every stored device password under `new_passphrase`.
    ///
    /// All secrets are decrypted and re-sealed in memory first; any failure
    /// there aborts before a single write. If a write fails, rows already
    /// rewritten are restored. The vault switches passphrase only after
    /// every row has been written.
    pub async fn reset_master_password(&self, new_passphrase: SecretString) -> Result<(), CoreError> {
        let _guard = self.lock.lock().await;

        let rows = self.store.read(Table::Devices, None).await?;
        let mut plan: Vec<(DeviceId, SealedSecret, SealedSecret)> = Vec::with_capacity(rows.len());
        for row in rows {
            let record = DeviceRecord::from_row(row).map_err(|e| CoreError::Rotation {
                message: format!("unreadable device row: {e}"),
            })?;
            let old = SealedSecret {
                ciphertext: record.secret,
                salt: record.salt,
            };
            let plaintext = self.vault.decrypt(&old).map_err(|e| {
                error!(device = %record.id, hostname = %record.hostname, error = %e, "rotation aborted");
                CoreError::Rotation {
                    message: format!("could not decrypt the password of {}", record.hostname),
                }
            })?;
            let new = self
                .vault
                .encrypt_with(plaintext.expose_secret(), &new_passphrase)
                .map_err(|e| CoreError::Rotation {
                    message: format!("could not re-encrypt the password of {}: {e}", record.hostname),
                })?;
            plan.push((record.id, old, new));
        }

        for (done, (id, _, new)) in plan.iter().enumerate() {
            if let Err(e) = self.store.update(Table::Devices, &Filter::id(id), secret_body(new)).await {
                error!(device = %id, error = %e, "rotation write failed, restoring previous secrets");
                self.roll_back(&plan[..done]).await;
                return Err(CoreError::Rotation {
                    message: format!("could not store the new secret of device {id}"),
                });
            }
        }

        self.vault.set_passphrase(new_passphrase);
        info!(devices = plan.len(), "master password rotated");

        if let Err(e) = self.reload_locked().await {
            warn!(error = %e, "reload after rotation failed");
        }
        Ok(())
    }

    async fn roll_back(&self, written: &[(DeviceId, SealedSecret, SealedSecret)]) {
        for (id, old, _) in written {
            if let Err(e) = self.store.update(Table::Devices, &Filter::id(id), secret_body(old)).await {
                error!(device = %id, error = %e, "could not restore previous secret");
            }
        }
    }
}

fn secret_body(sealed: &SealedSecret) -> Row {
    let mut body = Row::new();
    body.insert("secret".into(), Value::String(sealed.ciphertext.clone()));
    body.insert("salt".into(), Value::String(sealed.salt.clone()));
    body
}

fn store_failure(id: DeviceId, action: &str, err: StoreError) -> CoreError {
    if let StoreError::NoMatch { .. } = err {
        return CoreError::not_found("Device", id);
    }
    error!(device = %id, error = %err, "could not {action} device");
    CoreError::from(err)
}

fn validate_key(key: &SecretString) -> Result<(), CoreError> {
    if key.expose_secret().chars().count() < MIN_KEY_LEN {
        return Err(CoreError::validation(format!(
            "API key must be at least {MIN_KEY_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_hostname(hostname: &str) -> Result<(), CoreError> {
    if hostname.trim().is_empty() {
        return Err(CoreError::validation("Hostname must not be empty"));
    }
    Ok(())
}
