use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{DeviceId, SiteId};

/// A physical or logical location grouping devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    /// Devices whose `site` column points here. Rebuilt on every device
    /// reload; never persisted.
    #[serde(default)]
    pub devices: BTreeSet<DeviceId>,
}

/// The persisted columns of a `sites` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SiteRow {
    pub id: SiteId,
    pub name: String,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            devices: BTreeSet::new(),
        }
    }
}
