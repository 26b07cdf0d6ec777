// PAN-OS command/XML API client
//
// Base path: /api/
// Auth: `Authorization: Basic base64(user:pass)` on every request.
// Responses are `<response status="success|error">` documents; errors carry
// their text in one or more `<msg>` elements.

use reqwest::header::{AUTHORIZATION, HeaderMap};
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::xml;

/// Raw client for the PAN-OS XML API.
///
/// Every method returns the response body once the status checks have
/// passed; interpreting the document is up to the caller.
pub struct XmlClient {
    http: reqwest::Client,
    base_url: Url,
}

impl XmlClient {
    /// Build a client for `{base}/api/` that authenticates with basic auth.
    pub fn new(
        base_url: &Url,
        credentials: &Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credentials.basic_header()?);
        let http = transport.build_client_with_headers(headers)?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &Url) -> Result<Self, Error> {
        let base_url = base_url.join("api/")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Run an operational command, e.g. `<show><system><info></info></system></show>`.
    pub async fn op(&self, cmd: &str) -> Result<String, Error> {
        self.get(&[("type", "op"), ("cmd", cmd)]).await
    }

    /// Fetch the full running configuration.
    pub async fn show_config(&self) -> Result<String, Error> {
        self.get(&[("type", "config"), ("action", "show"), ("xpath", "/")])
            .await
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<String, Error> {
        let url = self.base_url.clone();
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&url, &e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&url, &e))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        Self::check_envelope(status, body)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Turn a non-2xx answer into `Remote`, preferring the device's own `<msg>`.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> Error {
        let message = xml::parse(body)
            .ok()
            .and_then(|doc| device_message(doc.root_element()))
            .unwrap_or_else(|| status.to_string());
        Error::Remote {
            status: status.as_u16(),
            message,
        }
    }

    /// A 2xx body can still be `<response status="error">`.
    fn check_envelope(status: reqwest::StatusCode, body: String) -> Result<String, Error> {
        let failure = {
            let doc = xml::parse(&body)?;
            let root = doc.root_element();
            (root.attribute("status") == Some("error")).then(|| {
                device_message(root).unwrap_or_else(|| "device reported an error".into())
            })
        };
        match failure {
            Some(message) => Err(Error::Remote {
                status: status.as_u16(),
                message,
            }),
            None => Ok(body),
        }
    }
}

/// `<msg>text</msg>` or `<msg><line>text</line></msg>`.
fn device_message(root: roxmltree::Node<'_, '_>) -> Option<String> {
    xml::text_at(root, "msg").or_else(|| xml::text_at(root, "msg/line"))
}
