use std::sync::Arc;

use serde::Serialize;

use super::device::Device;

/// Two devices inferred to form an HA pair. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct HaPair {
    pub active: Arc<Device>,
    pub passive: Arc<Device>,
}

/// Pair every active device with the first device whose serial equals its
/// partner serial. Active devices without a match stay unpaired.
pub fn pair_devices(devices: &[Arc<Device>]) -> Vec<HaPair> {
    devices
        .iter()
        .filter(|d| d.ha_local_state() == Some("active"))
        .filter_map(|active| {
            let peer_serial = active.ha_peer_serial()?;
            devices
                .iter()
                .find(|peer| peer.serial.as_deref() == Some(peer_serial))
                .map(|passive| HaPair {
                    active: Arc::clone(active),
                    passive: Arc::clone(passive),
                })
        })
        .collect()
}
