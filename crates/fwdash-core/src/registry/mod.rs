// ── Registries ──
//
// `SiteRegistry` and `DeviceRegistry` are built explicitly at startup and
// shared by reference. The device registry depends on the site registry for
// site validation and writes the derived site membership back into it.

mod connector;
mod device;
mod reconcile;
mod site;

pub use connector::{Connector, VendorConnector};
pub use device::{DeviceRegistry, DeviceUpdate, MIN_KEY_LEN, NewDevice};
pub use site::SiteRegistry;
