// ── Object views ──
//
// Normalized summaries of the vendor records a device returns. Object lists
// are sorted by name; policy lists keep rule order because rule order is
// what the firewall evaluates.

use chrono::NaiveDateTime;
use fwdash_api::{DeviceApi, GpSession, TagEntry, VendorRecord, VpnTunnel};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;

// ── Record helpers ──────────────────────────────────────────────────

fn name_of(record: &VendorRecord) -> String {
    record
        .get("@name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Flatten PAN-OS `{ "member": [...] }`, arrays and scalars into a list.
fn members(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => members(map.get("member")),
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(other) => scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(record: &VendorRecord, key: &str) -> Option<String> {
    record.get(key).and_then(scalar)
}

fn list(record: &VendorRecord, key: &str) -> Vec<String> {
    members(record.get(key))
}

/// First key of a nested object, e.g. `dynamic-ip-and-port` for a
/// source-translation block.
fn variant(record: &VendorRecord, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::Object(map)) => map.keys().next().cloned(),
        Some(other) => scalar(other),
        None => None,
    }
}

fn sorted_by_name<T>(mut items: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

// ── Tags ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub description: String,
    pub colour: String,
}

pub fn summarize_tags(tags: Vec<TagEntry>) -> Vec<TagSummary> {
    let summaries = tags
        .into_iter()
        .map(|t| TagSummary {
            name: t.name,
            description: t
                .comments
                .unwrap_or_else(|| "No description available".into()),
            colour: t.color.unwrap_or_else(|| "no colour".into()),
        })
        .collect();
    sorted_by_name(summaries, |t: &TagSummary| &t.name)
}

// ── Addresses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressSummary {
    pub name: String,
    /// `ip-netmask`, else `ip-range`, else `fqdn`, else "No IP".
    pub address: String,
    pub description: String,
    pub tags: Vec<String>,
}

pub fn summarize_addresses(records: &[VendorRecord]) -> Vec<AddressSummary> {
    let summaries = records
        .iter()
        .map(|r| {
            let name = name_of(r);
            let address = text(r, "ip-netmask")
                .or_else(|| text(r, "ip-range"))
                .or_else(|| text(r, "fqdn"))
                .unwrap_or_else(|| {
                    warn!(object = %name, "address object has no address");
                    "No IP".into()
                });
            AddressSummary {
                description: text(r, "description").unwrap_or_else(|| "No description".into()),
                tags: list(r, "tag"),
                name,
                address,
            }
        })
        .collect();
    sorted_by_name(summaries, |a: &AddressSummary| &a.name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressGroupSummary {
    pub name: String,
    /// Static members; empty for dynamic groups.
    pub members: Vec<String>,
    /// Match expression of a dynamic group.
    pub filter: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

pub fn summarize_address_groups(records: &[VendorRecord]) -> Vec<AddressGroupSummary> {
    let summaries = records
        .iter()
        .map(|r| AddressGroupSummary {
            name: name_of(r),
            members: list(r, "static"),
            filter: r
                .get("dynamic")
                .and_then(|d| d.get("filter"))
                .and_then(scalar),
            description: text(r, "description"),
            tags: list(r, "tag"),
        })
        .collect();
    sorted_by_name(summaries, |g: &AddressGroupSummary| &g.name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationGroupSummary {
    pub name: String,
    pub members: Vec<String>,
}

pub fn summarize_application_groups(records: &[VendorRecord]) -> Vec<ApplicationGroupSummary> {
    let summaries = records
        .iter()
        .map(|r| ApplicationGroupSummary {
            name: name_of(r),
            members: list(r, "members"),
        })
        .collect();
    sorted_by_name(summaries, |g: &ApplicationGroupSummary| &g.name)
}

// ── Services ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    /// `tcp/443`, `udp/53,123`, ...
    pub protocol: String,
    pub description: String,
    pub tags: Vec<String>,
}

fn protocol_of(record: &VendorRecord) -> String {
    match record.get("protocol") {
        Some(Value::Object(protocols)) => protocols
            .iter()
            .map(|(proto, detail)| match detail.get("port").and_then(scalar) {
                Some(port) => format!("{proto}/{port}"),
                None => proto.clone(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => scalar(other).unwrap_or_default(),
        None => String::new(),
    }
}

pub fn summarize_services(records: &[VendorRecord]) -> Vec<ServiceSummary> {
    let summaries = records
        .iter()
        .map(|r| ServiceSummary {
            name: name_of(r),
            protocol: protocol_of(r),
            description: text(r, "description").unwrap_or_else(|| "No description".into()),
            tags: list(r, "tag"),
        })
        .collect();
    sorted_by_name(summaries, |s: &ServiceSummary| &s.name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceGroupSummary {
    pub name: String,
    pub members: Vec<String>,
    pub tags: Vec<String>,
}

pub fn summarize_service_groups(records: &[VendorRecord]) -> Vec<ServiceGroupSummary> {
    let summaries = records
        .iter()
        .map(|r| ServiceGroupSummary {
            name: name_of(r),
            members: list(r, "members"),
            tags: list(r, "tag"),
        })
        .collect();
    sorted_by_name(summaries, |g: &ServiceGroupSummary| &g.name)
}

// ── Policies ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatRuleSummary {
    pub name: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub service: Option<String>,
    pub source_translation: Option<String>,
    pub tags: Vec<String>,
    pub group_tag: Option<String>,
    pub description: Option<String>,
}

pub fn summarize_nat_rules(records: &[VendorRecord]) -> Vec<NatRuleSummary> {
    records
        .iter()
        .map(|r| NatRuleSummary {
            name: name_of(r),
            from: list(r, "from"),
            to: list(r, "to"),
            source: list(r, "source"),
            destination: list(r, "destination"),
            service: text(r, "service"),
            source_translation: variant(r, "source-translation"),
            tags: list(r, "tag"),
            group_tag: text(r, "group-tag"),
            description: text(r, "description"),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRuleSummary {
    pub name: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub source_user: Vec<String>,
    pub category: Vec<String>,
    pub application: Vec<String>,
    pub service: Vec<String>,
    pub action: Option<String>,
    pub rule_type: Option<String>,
    pub log_setting: Option<String>,
    pub log_start: Option<String>,
    pub log_end: Option<String>,
    pub disabled: bool,
    pub tags: Vec<String>,
    pub group_tag: Option<String>,
    pub description: Option<String>,
}

pub fn summarize_security_rules(records: &[VendorRecord]) -> Vec<SecurityRuleSummary> {
    records
        .iter()
        .map(|r| SecurityRuleSummary {
            name: name_of(r),
            from: list(r, "from"),
            to: list(r, "to"),
            source: list(r, "source"),
            destination: list(r, "destination"),
            source_user: list(r, "source-user"),
            category: list(r, "category"),
            application: list(r, "application"),
            service: list(r, "service"),
            action: text(r, "action"),
            rule_type: text(r, "rule-type"),
            log_setting: text(r, "log-setting"),
            log_start: text(r, "log-start"),
            log_end: text(r, "log-end"),
            disabled: text(r, "disabled").is_some_and(|d| d == "yes"),
            tags: list(r, "tag"),
            group_tag: text(r, "group-tag"),
            description: text(r, "description"),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QosRuleSummary {
    pub name: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub source_user: Vec<String>,
    pub category: Vec<String>,
    pub application: Vec<String>,
    pub service: Vec<String>,
    /// QoS class from the rule action.
    pub class: Option<String>,
    pub dscp: Option<String>,
    pub tags: Vec<String>,
    pub group_tag: Option<String>,
    pub description: Option<String>,
}

pub fn summarize_qos_rules(records: &[VendorRecord]) -> Vec<QosRuleSummary> {
    records
        .iter()
        .map(|r| QosRuleSummary {
            name: name_of(r),
            from: list(r, "from"),
            to: list(r, "to"),
            source: list(r, "source"),
            destination: list(r, "destination"),
            source_user: list(r, "source-user"),
            category: list(r, "category"),
            application: list(r, "application"),
            service: list(r, "service"),
            class: r
                .get("action")
                .and_then(|a| a.get("class"))
                .and_then(scalar),
            dscp: variant(r, "dscp-tos"),
            tags: list(r, "tag"),
            group_tag: text(r, "group-tag"),
            description: text(r, "description"),
        })
        .collect()
}

// ── Sessions and tunnels ────────────────────────────────────────────

pub fn sort_gp_sessions(mut sessions: Vec<GpSession>) -> Vec<GpSession> {
    sessions.sort_by(|a, b| a.username.cmp(&b.username));
    sessions
}

pub fn sort_vpn_tunnels(tunnels: Vec<VpnTunnel>) -> Vec<VpnTunnel> {
    sorted_by_name(tunnels, |t: &VpnTunnel| &t.name)
}

// ── Fetch helpers ───────────────────────────────────────────────────

pub async fn tags(api: &dyn DeviceApi) -> Result<Vec<TagSummary>, CoreError> {
    Ok(summarize_tags(api.get_tags().await?))
}

pub async fn addresses(api: &dyn DeviceApi) -> Result<Vec<AddressSummary>, CoreError> {
    Ok(summarize_addresses(&api.get_addresses().await?))
}

pub async fn address_groups(api: &dyn DeviceApi) -> Result<Vec<AddressGroupSummary>, CoreError> {
    Ok(summarize_address_groups(&api.get_address_groups().await?))
}

pub async fn application_groups(
    api: &dyn DeviceApi,
) -> Result<Vec<ApplicationGroupSummary>, CoreError> {
    Ok(summarize_application_groups(
        &api.get_application_groups().await?,
    ))
}

pub async fn services(api: &dyn DeviceApi) -> Result<Vec<ServiceSummary>, CoreError> {
    Ok(summarize_services(&api.get_services().await?))
}

pub async fn service_groups(api: &dyn DeviceApi) -> Result<Vec<ServiceGroupSummary>, CoreError> {
    Ok(summarize_service_groups(&api.get_service_groups().await?))
}

pub async fn nat_rules(api: &dyn DeviceApi) -> Result<Vec<NatRuleSummary>, CoreError> {
    Ok(summarize_nat_rules(&api.get_nat_policies().await?))
}

pub async fn security_rules(api: &dyn DeviceApi) -> Result<Vec<SecurityRuleSummary>, CoreError> {
    Ok(summarize_security_rules(&api.get_security_policies().await?))
}

pub async fn qos_rules(api: &dyn DeviceApi) -> Result<Vec<QosRuleSummary>, CoreError> {
    Ok(summarize_qos_rules(&api.get_qos_policies().await?))
}

pub async fn gp_sessions(api: &dyn DeviceApi) -> Result<Vec<GpSession>, CoreError> {
    Ok(sort_gp_sessions(api.get_gp_sessions().await?))
}

pub async fn vpn_tunnels(api: &dyn DeviceApi) -> Result<Vec<VpnTunnel>, CoreError> {
    Ok(sort_vpn_tunnels(api.get_vpn_tunnels().await?))
}

// ── Configuration download ──────────────────────────────────────────

/// The running configuration with the API wrapper removed.
pub struct ConfigDownload {
    pub filename: String,
    pub xml: String,
}

/// Fetch the running config and name it `{hostname}_{YYYYmmddHHMMSS}.xml`.
pub async fn download_config(
    api: &dyn DeviceApi,
    now: NaiveDateTime,
) -> Result<ConfigDownload, CoreError> {
    let raw = api.get_config().await?;
    Ok(ConfigDownload {
        filename: config_filename(api.hostname(), now),
        xml: extract_config(&raw)?,
    })
}

/// Cut the `<config>` element out of a `<response><result>` document.
///
/// Returns an empty string when the document has no `<config>` element.
pub fn extract_config(raw: &str) -> Result<String, CoreError> {
    let doc = roxmltree::Document::parse(raw).map_err(|e| CoreError::Output {
        message: format!("configuration is not valid XML: {e}"),
    })?;
    Ok(doc
        .descendants()
        .find(|n| n.is_element() && n.has_tag_name("config"))
        .and_then(|n| raw.get(n.range()))
        .map(str::to_owned)
        .unwrap_or_default())
}

pub fn config_filename(hostname: &str, now: NaiveDateTime) -> String {
    format!("{hostname}_{}.xml", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(value: Value) -> Vec<VendorRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn tags_default_description_and_sort() {
        let tags = vec![
            TagEntry {
                name: "zeta".into(),
                location: None,
                vsys: None,
                comments: None,
                color: Some("color5".into()),
            },
            TagEntry {
                name: "alpha".into(),
                location: None,
                vsys: None,
                comments: Some("core".into()),
                color: None,
            },
        ];
        let summary = summarize_tags(tags);
        assert_eq!(summary[0].name, "alpha");
        assert_eq!(summary[0].colour, "no colour");
        assert_eq!(summary[1].description, "No description available");
    }

    #[test]
    fn addresses_pick_first_available_form() {
        let summary = summarize_addresses(&records(json!([
            { "@name": "web", "fqdn": "www.example.com", "tag": { "member": ["dmz"] } },
            { "@name": "lan", "ip-netmask": "10.0.0.0/8", "ip-range": "ignored" },
            { "@name": "pool", "ip-range": "10.1.0.10-10.1.0.20" },
            { "@name": "broken" }
        ])));
        let pairs: Vec<(&str, &str)> = summary
            .iter()
            .map(|a| (a.name.as_str(), a.address.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("broken", "No IP"),
                ("lan", "10.0.0.0/8"),
                ("pool", "10.1.0.10-10.1.0.20"),
                ("web", "www.example.com"),
            ]
        );
        assert_eq!(summary[3].tags, vec!["dmz".to_owned()]);
    }

    #[test]
    fn services_render_protocol_and_port() {
        let summary = summarize_services(&records(json!([
            { "@name": "https", "protocol": { "tcp": { "port": "443" } } }
        ])));
        assert_eq!(summary[0].protocol, "tcp/443");
    }

    #[test]
    fn security_rules_keep_rule_order() {
        let summary = summarize_security_rules(&records(json!([
            { "@name": "z-first", "action": "allow", "from": { "member": ["trust"] } },
            { "@name": "a-second", "action": "deny", "disabled": "yes" }
        ])));
        assert_eq!(summary[0].name, "z-first");
        assert_eq!(summary[0].from, vec!["trust".to_owned()]);
        assert!(summary[1].disabled);
    }

    #[test]
    fn nat_source_translation_variant() {
        let summary = summarize_nat_rules(&records(json!([
            { "@name": "outbound", "source-translation": { "dynamic-ip-and-port": { "interface-address": {} } } }
        ])));
        assert_eq!(
            summary[0].source_translation.as_deref(),
            Some("dynamic-ip-and-port")
        );
    }

    #[test]
    fn config_is_cut_out_of_response() {
        let raw = r#"<response status="success"><result total="1" count="1"><config version="11.0.0"><devices/></config></result></response>"#;
        assert_eq!(
            extract_config(raw).unwrap(),
            r#"<config version="11.0.0"><devices/></config>"#
        );
        assert_eq!(extract_config("<response/>").unwrap(), "");
        assert!(extract_config("<response>").is_err());
    }

    #[test]
    fn config_filename_uses_timestamp() {
        let now = NaiveDateTime::parse_from_str("2026-10-19 08:05:09", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(config_filename("fw1", now), "fw1_20261019080509.xml");
    }
}
