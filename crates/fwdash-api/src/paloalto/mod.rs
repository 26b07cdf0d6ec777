// PAN-OS adapter: the XML command API for device state and the REST API
// for objects and policies, behind one `DeviceApi`.

mod command;
mod rest;

pub use command::XmlClient;
pub use rest::{Resource, RestClient};

use async_trait::async_trait;
use roxmltree::Node;
use tracing::debug;
use url::Url;

use crate::adapter::{
    AdapterOptions, DeviceApi, DeviceFacts, GpSession, HaStatus, TagEntry, VendorRecord, VpnTunnel,
};
use crate::auth::{Credentials, Vendor};
use crate::error::Error;
use crate::xml;

const SYSTEM_INFO: &str = "<show><system><info></info></system></show>";
const HA_STATE: &str = "<show><high-availability><state></state></high-availability></show>";
const GP_CURRENT_USERS: &str =
    "<show><global-protect-gateway><current-user/></global-protect-gateway></show>";
const VPN_FLOWS: &str = "<show><vpn><flow></flow></vpn></show>";

/// A PAN-OS firewall.
///
/// Stateless: each call is an independent HTTPS request. REST operations
/// need an API key; without one they answer [`Error::Unsupported`].
pub struct PaloAltoApi {
    hostname: String,
    xml: XmlClient,
    rest: Option<RestClient>,
}

impl PaloAltoApi {
    pub fn new(
        base_url: Url,
        hostname: &str,
        credentials: &Credentials,
        options: &AdapterOptions,
    ) -> Result<Self, Error> {
        let xml = XmlClient::new(&base_url, credentials, &options.transport)?;
        let rest = credentials
            .api_key
            .as_ref()
            .map(|key| {
                RestClient::from_api_key(&base_url, key, &options.rest_version, &options.transport)
                    .map(|c| c.scoped(options.location.clone(), options.vsys.clone()))
            })
            .transpose()?;
        Ok(Self::from_parts(hostname, xml, rest))
    }

    /// Assemble from pre-built clients.
    pub fn from_parts(hostname: &str, xml: XmlClient, rest: Option<RestClient>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            xml,
            rest,
        }
    }

    fn rest(&self, what: &'static str) -> Result<&RestClient, Error> {
        self.rest.as_ref().ok_or(Error::Unsupported(what))
    }
}

#[async_trait]
impl DeviceApi for PaloAltoApi {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn vendor(&self) -> Vendor {
        Vendor::PaloAlto
    }

    async fn get_device(&self) -> Result<DeviceFacts, Error> {
        let body = self.xml.op(SYSTEM_INFO).await?;
        parse_system_info(&body)
    }

    async fn get_ha(&self) -> Result<HaStatus, Error> {
        let body = self.xml.op(HA_STATE).await?;
        parse_ha_state(&body)
    }

    async fn get_config(&self) -> Result<String, Error> {
        self.xml.show_config().await
    }

    async fn get_tags(&self) -> Result<Vec<TagEntry>, Error> {
        self.rest("tags")?.list(Resource::Tags).await
    }

    async fn get_addresses(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("addresses")?.list(Resource::Addresses).await
    }

    async fn get_address_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("address groups")?
            .list(Resource::AddressGroups)
            .await
    }

    async fn get_application_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("application groups")?
            .list(Resource::ApplicationGroups)
            .await
    }

    async fn get_services(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("services")?.list(Resource::Services).await
    }

    async fn get_service_groups(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("service groups")?
            .list(Resource::ServiceGroups)
            .await
    }

    async fn get_nat_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("NAT policies")?.list(Resource::NatRules).await
    }

    async fn get_security_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("security policies")?
            .list(Resource::SecurityRules)
            .await
    }

    async fn get_qos_policies(&self) -> Result<Vec<VendorRecord>, Error> {
        self.rest("QoS policies")?.list(Resource::QosRules).await
    }

    async fn get_gp_sessions(&self) -> Result<Vec<GpSession>, Error> {
        let body = self.xml.op(GP_CURRENT_USERS).await?;
        let sessions = parse_gp_sessions(&body)?;
        debug!(hostname = %self.hostname, count = sessions.len(), "GlobalProtect sessions");
        Ok(sessions)
    }

    async fn get_vpn_tunnels(&self) -> Result<Vec<VpnTunnel>, Error> {
        let body = self.xml.op(VPN_FLOWS).await?;
        parse_vpn_flows(&body)
    }
}

// ── Response parsing ────────────────────────────────────────────────

fn parse_system_info(body: &str) -> Result<DeviceFacts, Error> {
    let doc = xml::parse(body)?;
    let root = doc.root_element();
    Ok(DeviceFacts {
        model: xml::require_text(root, "model", body)?,
        serial: xml::require_text(root, "serial", body)?,
        software_version: xml::require_text(root, "sw-version", body)?,
    })
}

fn parse_ha_state(body: &str) -> Result<HaStatus, Error> {
    let doc = xml::parse(body)?;
    let root = doc.root_element();
    let enabled = xml::require_text(root, "enabled", body)?;
    if enabled != "yes" {
        return Ok(HaStatus::Disabled);
    }

    let local_state = xml::text_at(root, "local-info/state")
        .map_or_else(|| xml::require_text(root, "state", body), Ok)?;
    Ok(HaStatus::Enabled {
        local_state,
        peer_state: xml::require_text(root, "peer-info/state", body)?,
        peer_serial: xml::require_text(root, "peer-info/serial-num", body)?,
    })
}

/// `<entry>` elements under `<result>`, in document order.
fn result_entries<'a, 'input>(root: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    xml::find(root, "result")
        .into_iter()
        .flat_map(|result| result.descendants())
        .filter(|n| n.is_element() && n.has_tag_name("entry"))
}

fn parse_gp_sessions(body: &str) -> Result<Vec<GpSession>, Error> {
    let doc = xml::parse(body)?;
    let sessions = result_entries(doc.root_element())
        .map(|entry| GpSession {
            username: xml::text_at(entry, "username"),
            primary_username: xml::text_at(entry, "primary-username"),
            region: xml::text_at(entry, "source-region"),
            computer: xml::text_at(entry, "computer"),
            client: xml::text_at(entry, "client"),
            vpn_type: xml::text_at(entry, "vpn-type"),
            host_id: xml::text_at(entry, "host-id"),
            app_version: xml::text_at(entry, "app-version"),
            virtual_ip: xml::text_at(entry, "virtual-ip"),
            public_ip: xml::text_at(entry, "public-ip"),
            tunnel_type: xml::text_at(entry, "tunnel-type"),
            login_time: xml::text_at(entry, "login-time"),
        })
        .collect();
    Ok(sessions)
}

fn parse_vpn_flows(body: &str) -> Result<Vec<VpnTunnel>, Error> {
    let doc = xml::parse(body)?;
    let tunnels = result_entries(doc.root_element())
        .filter_map(|entry| {
            let name = xml::text_at(entry, "name")?;
            Some(VpnTunnel {
                name,
                gateway: xml::text_at(entry, "gateway").or_else(|| xml::text_at(entry, "gwid")),
                peer_ip: xml::text_at(entry, "peerip"),
                local_ip: xml::text_at(entry, "localip"),
                inner_if: xml::text_at(entry, "inner-if"),
                outer_if: xml::text_at(entry, "outer-if"),
                state: xml::text_at(entry, "state"),
            })
        })
        .collect();
    Ok(tunnels)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn system_info_extracts_facts() {
        let body = r#"<response status="success"><result><system>
            <hostname>fw1</hostname><model>PA-440</model>
            <serial>0123456789</serial><sw-version>11.0.2</sw-version>
        </system></result></response>"#;
        let facts = parse_system_info(body).unwrap();
        assert_eq!(facts.model, "PA-440");
        assert_eq!(facts.serial, "0123456789");
        assert_eq!(facts.software_version, "11.0.2");
    }

    #[test]
    fn system_info_without_serial_is_parse_error() {
        let body = r#"<response status="success"><result><system><model>PA-440</model></system></result></response>"#;
        assert!(matches!(parse_system_info(body), Err(Error::Parse { .. })));
    }

    #[test]
    fn ha_disabled() {
        let body = r#"<response status="success"><result><enabled>no</enabled></result></response>"#;
        assert_eq!(parse_ha_state(body).unwrap(), HaStatus::Disabled);
    }

    #[test]
    fn ha_enabled_reads_local_and_peer() {
        let body = r#"<response status="success"><result>
            <enabled>yes</enabled>
            <group>
              <local-info><state>active</state></local-info>
              <peer-info><state>passive</state><serial-num>0002</serial-num></peer-info>
            </group>
        </result></response>"#;
        assert_eq!(
            parse_ha_state(body).unwrap(),
            HaStatus::Enabled {
                local_state: "active".into(),
                peer_state: "passive".into(),
                peer_serial: "0002".into(),
            }
        );
    }

    #[test]
    fn gp_sessions_map_field_names() {
        let body = r#"<response status="success"><result>
            <entry><username>jdoe</username><primary-username>corp\jdoe</primary-username>
              <source-region>AU</source-region><client>Microsoft Windows</client>
              <virtual-ip>10.8.0.4</virtual-ip><public-ip>203.0.113.9</public-ip></entry>
            <entry><username>asmith</username></entry>
        </result></response>"#;
        let sessions = parse_gp_sessions(body).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].primary_username.as_deref(), Some("corp\\jdoe"));
        assert_eq!(sessions[0].region.as_deref(), Some("AU"));
        assert!(sessions[1].virtual_ip.is_none());
    }

    #[test]
    fn vpn_flows_skip_unnamed_entries() {
        let body = r#"<response status="success"><result><IPSec>
            <entry><name>to-branch</name><gwid>3</gwid><peerip>198.51.100.1</peerip>
              <localip>203.0.113.1</localip><inner-if>tunnel.1</inner-if>
              <outer-if>ethernet1/1</outer-if><state>active</state></entry>
            <entry><id>9</id></entry>
        </IPSec></result></response>"#;
        let tunnels = parse_vpn_flows(body).unwrap();
        assert_eq!(tunnels.len(), 1);
        assert_eq!(tunnels[0].gateway.as_deref(), Some("3"));
        assert_eq!(tunnels[0].state.as_deref(), Some("active"));
    }
}
