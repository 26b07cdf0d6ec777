use async_trait::async_trait;
use fwdash_api::{AdapterOptions, ConnectTarget, DeviceApi};

/// Builds the adapter for one device.
///
/// The registry never constructs adapters itself, so tests can hand it
/// scripted devices instead of real firewalls.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn DeviceApi>, fwdash_api::Error>;
}

/// The production connector: dispatches on the vendor tag via
/// [`fwdash_api::connect`].
#[derive(Debug, Clone, Default)]
pub struct VendorConnector {
    options: AdapterOptions,
}

impl VendorConnector {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for VendorConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn DeviceApi>, fwdash_api::Error> {
        fwdash_api::connect(target, &self.options).await
    }
}
