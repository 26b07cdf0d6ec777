#![allow(clippy::unwrap_used)]
// Integration tests for the PAN-OS adapter using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fwdash_api::{
    AdapterOptions, Credentials, DeviceApi, Error, FailureKind, HaStatus, PaloAltoApi,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn credentials(with_key: bool) -> Credentials {
    let creds = Credentials::new("admin", SecretString::from("s3cret".to_owned()));
    if with_key {
        creds.with_api_key(SecretString::from("rest-key".to_owned()))
    } else {
        creds
    }
}

async fn setup(with_key: bool) -> (MockServer, PaloAltoApi) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let api = PaloAltoApi::new(
        base_url,
        "fw1",
        &credentials(with_key),
        &AdapterOptions::default(),
    )
    .unwrap();
    (server, api)
}

/// A local URL nothing listens on: bind an ephemeral port, then release it.
fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_owned(), "application/xml")
}

// ── XML API ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_device_sends_basic_auth() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("type", "op"))
        .and(query_param("cmd", "<show><system><info></info></system></show>"))
        .and(header("Authorization", "Basic YWRtaW46czNjcmV0"))
        .respond_with(xml(
            r#"<response status="success"><result><system>
                <model>PA-3220</model><serial>013201000001</serial><sw-version>10.2.4</sw-version>
            </system></result></response>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let facts = api.get_device().await.unwrap();

    assert_eq!(facts.model, "PA-3220");
    assert_eq!(facts.serial, "013201000001");
    assert_eq!(facts.software_version, "10.2.4");
}

#[tokio::test]
async fn test_get_ha_enabled() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param(
            "cmd",
            "<show><high-availability><state></state></high-availability></show>",
        ))
        .respond_with(xml(
            r#"<response status="success"><result>
                <enabled>yes</enabled>
                <group>
                  <local-info><state>active</state></local-info>
                  <peer-info><state>passive</state><serial-num>013201000002</serial-num></peer-info>
                </group>
            </result></response>"#,
        ))
        .mount(&server)
        .await;

    let ha = api.get_ha().await.unwrap();

    assert_eq!(ha.peer_serial(), Some("013201000002"));
    assert!(matches!(ha, HaStatus::Enabled { ref local_state, .. } if local_state == "active"));
}

#[tokio::test]
async fn test_get_config_uses_config_show() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("type", "config"))
        .and(query_param("action", "show"))
        .and(query_param("xpath", "/"))
        .respond_with(xml(
            r#"<response status="success"><result><config version="10.2.0"/></result></response>"#,
        ))
        .mount(&server)
        .await;

    let config = api.get_config().await.unwrap();

    assert!(config.contains("<config version=\"10.2.0\"/>"));
}

#[tokio::test]
async fn test_non_2xx_uses_device_msg() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_raw(
            r#"<response status="error" code="403"><result><msg>Invalid Credential</msg></result></response>"#,
            "application/xml",
        ))
        .mount(&server)
        .await;

    let result = api.get_device().await;

    match result {
        Err(Error::Remote { status, ref message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid Credential");
        }
        other => panic!("expected Remote error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_with_200_is_remote() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .respond_with(xml(
            r#"<response status="error"><msg><line>show -> system is unexpected</line></msg></response>"#,
        ))
        .mount(&server)
        .await;

    let err = api.get_device().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Remote);
    assert!(err.to_string().contains("unexpected"));
}

#[tokio::test]
async fn test_garbage_body_is_parse_error() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>login"))
        .mount(&server)
        .await;

    let err = api.get_ha().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Parse);
}

#[tokio::test]
async fn test_unreachable_device_is_transport_error() {
    let api = PaloAltoApi::new(
        closed_port_url(),
        "fw1",
        &credentials(false),
        &AdapterOptions::default(),
    )
    .unwrap();
    let err = api.get_device().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Transport);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_gp_sessions() {
    let (server, api) = setup(false).await;

    Mock::given(method("GET"))
        .and(query_param(
            "cmd",
            "<show><global-protect-gateway><current-user/></global-protect-gateway></show>",
        ))
        .respond_with(xml(
            r#"<response status="success"><result>
                <entry><username>jdoe</username><computer>LAPTOP-1</computer>
                  <login-time>Oct.19 08:00:01</login-time></entry>
            </result></response>"#,
        ))
        .mount(&server)
        .await;

    let sessions = api.get_gp_sessions().await.unwrap();

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].computer.as_deref(), Some("LAPTOP-1"));
}

// ── REST API ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_tags_sends_key_and_scope() {
    let (server, api) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/restapi/v11.0/Objects/Tags"))
        .and(header("X-PAN-KEY", "rest-key"))
        .and(query_param("location", "vsys"))
        .and(query_param("vsys", "vsys1"))
        .and(query_param("output-format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@status": "success",
            "result": {
                "@total-count": "2",
                "entry": [
                    { "@name": "prod", "@location": "vsys", "@vsys": "vsys1", "color": "color1" },
                    { "@name": "dmz", "@location": "vsys", "@vsys": "vsys1", "comments": "edge" }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tags = api.get_tags().await.unwrap();

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "prod");
    assert_eq!(tags[1].comments.as_deref(), Some("edge"));
}

#[tokio::test]
async fn test_empty_collection_has_no_entry_key() {
    let (server, api) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/restapi/v11.0/Objects/Addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@status": "success",
            "result": { "@total-count": "0", "@count": "0" }
        })))
        .mount(&server)
        .await;

    assert!(api.get_addresses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rest_error_status() {
    let (server, api) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/restapi/v11.0/Policies/SecurityRules"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 3,
            "message": "Invalid Query Parameter: location"
        })))
        .mount(&server)
        .await;

    let err = api.get_security_policies().await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("Invalid Query Parameter"));
}

#[tokio::test]
async fn test_rest_rejected_key_keeps_status() {
    let (server, api) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/restapi/v11.0/Objects/Tags"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = api.get_tags().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.kind(), FailureKind::Remote);
    assert!(matches!(err, Error::Remote { status: 401, .. }));
}

#[tokio::test]
async fn test_rest_without_key_is_unsupported() {
    let (_server, api) = setup(false).await;

    let err = api.get_nat_policies().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Unsupported);
}
