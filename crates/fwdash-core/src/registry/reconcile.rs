// ── Reconciliation steps ──
//
// The pure, cross-device parts of a device reload. They run once every
// device has been enriched, on the complete set.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::model::{Device, DeviceId, Site, SiteId};
use crate::store::Row;

/// Set each device's `site_name` and build the site -> devices membership.
///
/// Devices pointing at a missing site get an empty `site_name` and belong
/// to no site.
pub(crate) fn assign_sites(
    devices: &mut [Device],
    sites: &[Arc<Site>],
) -> BTreeMap<SiteId, BTreeSet<DeviceId>> {
    let names: HashMap<SiteId, &str> = sites.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut membership: BTreeMap<SiteId, BTreeSet<DeviceId>> =
        sites.iter().map(|s| (s.id, BTreeSet::new())).collect();

    for device in devices.iter_mut() {
        match names.get(&device.site) {
            Some(name) => {
                (*name).clone_into(&mut device.site_name);
                membership.entry(device.site).or_default().insert(device.id);
            }
            None => device.site_name.clear(),
        }
    }
    membership
}

/// Columns written back after a device answered at least one query.
///
/// The partner serial is the live one when HA was read, otherwise the
/// previously stored value, so a failed HA query never erases it.
pub(crate) fn persist_back_body(device: &Device) -> Row {
    let partner = device
        .ha
        .as_ref()
        .map_or(device.ha_partner_serial.clone(), |ha| {
            ha.peer_serial().map(str::to_owned)
        });

    let mut body = Row::new();
    body.insert("serial".into(), opt(device.serial.clone()));
    body.insert("ha_partner_serial".into(), opt(partner));
    body.insert("site".into(), Value::String(device.site.to_string()));
    body
}

fn opt(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::device::DeviceRecord;
    use fwdash_api::{HaStatus, Vendor};
    use uuid::Uuid;

    fn device(n: u128, site: u128) -> Device {
        Device::from_record(DeviceRecord {
            id: DeviceId(Uuid::from_u128(n)),
            hostname: format!("fw{n}"),
            site: SiteId(Uuid::from_u128(site)),
            vendor: Vendor::PaloAlto,
            device_type: "firewall".into(),
            auth_type: "token".into(),
            username: "admin".into(),
            secret: String::new(),
            salt: String::new(),
            token: None,
            friendly_name: String::new(),
            serial: None,
            ha_partner_serial: Some("OLD".into()),
        })
    }

    fn site(n: u128, name: &str) -> Arc<Site> {
        Arc::new(Site {
            id: SiteId(Uuid::from_u128(n)),
            name: name.into(),
            devices: BTreeSet::new(),
        })
    }

    #[test]
    fn assigns_known_sites_and_orphans_the_rest() {
        let mut devices = vec![device(1, 100), device(2, 999), device(3, 100)];
        devices[1].site_name = "stale".into();
        let sites = vec![site(100, "HQ"), site(200, "Branch")];

        let membership = assign_sites(&mut devices, &sites);

        assert_eq!(devices[0].site_name, "HQ");
        assert_eq!(devices[1].site_name, "");
        assert_eq!(membership[&SiteId(Uuid::from_u128(100))].len(), 2);
        assert!(membership[&SiteId(Uuid::from_u128(200))].is_empty());
        assert!(!membership.contains_key(&SiteId(Uuid::from_u128(999))));
    }

    #[test]
    fn persist_back_keeps_stored_partner_without_ha() {
        let mut d = device(1, 100);
        d.serial = Some("S1".into());
        let body = persist_back_body(&d);
        assert_eq!(body["serial"], "S1");
        assert_eq!(body["ha_partner_serial"], "OLD");

        d.ha = Some(HaStatus::Enabled {
            local_state: "active".into(),
            peer_state: "passive".into(),
            peer_serial: "S2".into(),
        });
        assert_eq!(persist_back_body(&d)["ha_partner_serial"], "S2");

        d.ha = Some(HaStatus::Disabled);
        assert_eq!(persist_back_body(&d)["ha_partner_serial"], Value::Null);
    }
}
