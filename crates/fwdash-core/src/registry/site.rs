use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::ids::allocate_id;
use crate::model::site::SiteRow;
use crate::model::{DeviceId, Site, SiteId};
use crate::store::{Filter, RecordStore, Row, Table};

type Membership = BTreeMap<SiteId, BTreeSet<DeviceId>>;

/// The set of sites, mirrored from the `sites` table.
///
/// Every mutation re-reads the table first so uniqueness checks see rows
/// written by other processes, then re-reads it again after writing. The
/// snapshot is replaced wholesale; hold on to it only briefly.
pub struct SiteRegistry {
    store: Arc<dyn RecordStore>,
    sites: ArcSwap<Vec<Arc<Site>>>,
    membership: ArcSwap<Membership>,
    lock: Mutex<()>,
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            sites: ArcSwap::from_pointee(Vec::new()),
            membership: ArcSwap::from_pointee(Membership::new()),
            lock: Mutex::new(()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Re-read the table, replacing the snapshot.
    pub async fn reload(&self) -> Result<(), CoreError> {
        let rows = self.store.read(Table::Sites, None).await.map_err(|e| {
            error!(error = %e, "could not read sites");
            CoreError::from(e)
        })?;

        let membership = self.membership.load_full();
        let sites: Vec<Arc<Site>> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<SiteRow>(Value::Object(row)) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(error = %e, "skipping malformed site row");
                    None
                }
            })
            .map(|row| {
                let mut site = Site::from(row);
                if let Some(devices) = membership.get(&site.id) {
                    site.devices.clone_from(devices);
                }
                Arc::new(site)
            })
            .collect();

        debug!(count = sites.len(), "sites reloaded");
        self.sites.store(Arc::new(sites));
        Ok(())
    }

    /// Reload, then return the fresh snapshot.
    pub async fn list(&self) -> Result<Arc<Vec<Arc<Site>>>, CoreError> {
        self.reload().await?;
        Ok(self.snapshot())
    }

    /// The current snapshot without touching the store.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Site>>> {
        self.sites.load_full()
    }

    pub fn get(&self, id: SiteId) -> Option<Arc<Site>> {
        self.sites.load().iter().find(|s| s.id == id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Site>> {
        self.sites.load().iter().find(|s| s.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.sites.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.load().is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a site. Names are unique and compared case-sensitively.
    pub async fn add_site(&self, name: &str) -> Result<Arc<Site>, CoreError> {
        validate_name(name)?;
        let _guard = self.lock.lock().await;

        self.reload().await?;
        if self.find_by_name(name).is_some() {
            return Err(CoreError::validation(format!(
                "A site named '{name}' already exists"
            )));
        }

        let snapshot = self.snapshot();
        let id = SiteId(allocate_id(
            |candidate| snapshot.iter().any(|s| s.id.as_uuid() == candidate),
            Uuid::new_v4,
        ));

        let mut row = Row::new();
        row.insert("id".into(), Value::String(id.to_string()));
        row.insert("name".into(), Value::String(name.to_owned()));
        self.store.add(Table::Sites, row).await.map_err(|e| {
            error!(site = %id, error = %e, "could not add site");
            CoreError::from(e)
        })?;
        info!(site = %id, name, "site added");

        self.reload().await?;
        self.get(id).ok_or_else(|| CoreError::not_found("Site", id))
    }

    /// Rename a site. The new name must not belong to another site.
    pub async fn update_site(&self, id: SiteId, name: &str) -> Result<(), CoreError> {
        validate_name(name)?;
        let _guard = self.lock.lock().await;

        self.reload().await?;
        if self.get(id).is_none() {
            return Err(CoreError::not_found("Site", id));
        }
        if self.find_by_name(name).is_some_and(|s| s.id != id) {
            return Err(CoreError::validation(format!(
                "A site named '{name}' already exists"
            )));
        }

        let mut body = Row::new();
        body.insert("name".into(), Value::String(name.to_owned()));
        self.store
            .update(Table::Sites, &Filter::id(id), body)
            .await
            .map_err(|e| {
                error!(site = %id, error = %e, "could not rename site");
                CoreError::from(e)
            })?;
        info!(site = %id, name, "site renamed");

        self.reload().await
    }

    /// Delete a site. Refused while any device row still references it.
    pub async fn delete_site(&self, id: SiteId) -> Result<(), CoreError> {
        let _guard = self.lock.lock().await;

        self.reload().await?;
        if self.get(id).is_none() {
            return Err(CoreError::not_found("Site", id));
        }

        let referencing = self
            .store
            .read(Table::Devices, Some(&Filter::eq("site", id.to_string())))
            .await?;
        if !referencing.is_empty() {
            return Err(CoreError::validation(format!(
                "Site still has {} device(s); move or delete them first",
                referencing.len()
            )));
        }

        self.store
            .delete(Table::Sites, &Filter::id(id))
            .await
            .map_err(|e| {
                error!(site = %id, error = %e, "could not delete site");
                CoreError::from(e)
            })?;
        info!(site = %id, "site deleted");

        self.reload().await
    }

    // ── Device membership ────────────────────────────────────────────

    /// Replace the derived device membership and re-apply it to the
    /// current snapshot. Called by the device registry after each reload.
    pub(crate) fn set_membership(&self, membership: Membership) {
        let sites: Vec<Arc<Site>> = self
            .sites
            .load()
            .iter()
            .map(|site| {
                let mut site = Site::clone(site);
                site.devices = membership.get(&site.id).cloned().unwrap_or_default();
                Arc::new(site)
            })
            .collect();
        self.membership.store(Arc::new(membership));
        self.sites.store(Arc::new(sites));
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("Site name must not be empty"));
    }
    Ok(())
}
