// fwdash-api: async clients for firewall management APIs
//
// PAN-OS is reached through two surfaces: the XML command API (device facts,
// HA, config, live session tables) and the REST API (objects and policies).
// Junos is reached through its REST RPC service with a managed session.
// Both sit behind the `DeviceApi` trait; `connect()` picks one by vendor.

pub mod adapter;
pub mod auth;
pub mod error;
pub mod junos;
pub mod paloalto;
pub mod transport;
mod xml;

pub use adapter::{
    AdapterOptions, DeviceApi, DeviceFacts, GpSession, HaStatus, TagEntry, VendorRecord,
    VpnTunnel, connect,
};
pub use auth::{ConnectTarget, Credentials, Vendor};
pub use error::{Error, FailureKind, SessionFailure};
pub use junos::JunosApi;
pub use paloalto::{PaloAltoApi, Resource, RestClient, XmlClient};
pub use transport::{TlsMode, TransportConfig};
