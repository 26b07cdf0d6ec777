// ── Domain model ──
//
// Sites, devices and the derived HA pairs. Persisted rows are decoded by
// column name into the crate-private `*Row`/`*Record` types and lifted into
// the public types here.

pub mod device;
pub mod ha;
pub mod ids;
pub mod site;

pub use device::{AUTH_TYPE, DEVICE_TYPE, Device};
pub use ha::{HaPair, pair_devices};
pub use ids::{DeviceId, SiteId};
pub use site::Site;
