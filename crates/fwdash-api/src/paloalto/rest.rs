// PAN-OS REST API client
//
// Base path: /restapi/{version}/
// Auth: X-PAN-KEY header
// Every list call takes `location` (+ `vsys` for the vsys location) and
// `output-format=json`, and answers `{ "@status": ..., "result": { "entry": [...] } }`.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Response shapes ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListResponse<T> {
    result: ListResult<T>,
}

#[derive(Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    entry: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Resources ────────────────────────────────────────────────────────

/// Collections exposed through the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
pub enum Resource {
    #[strum(serialize = "Objects/Tags")]
    Tags,
    #[strum(serialize = "Objects/Addresses")]
    Addresses,
    #[strum(serialize = "Objects/AddressGroups")]
    AddressGroups,
    #[strum(serialize = "Objects/ApplicationGroups")]
    ApplicationGroups,
    #[strum(serialize = "Objects/Services")]
    Services,
    #[strum(serialize = "Objects/ServiceGroups")]
    ServiceGroups,
    #[strum(serialize = "Policies/NatRules")]
    NatRules,
    #[strum(serialize = "Policies/SecurityRules")]
    SecurityRules,
    #[strum(serialize = "Policies/QoSRules")]
    QosRules,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the PAN-OS REST API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    location: String,
    vsys: String,
}

impl RestClient {
    /// Build from an API key; `X-PAN-KEY` is injected on every request.
    pub fn from_api_key(
        base_url: &Url,
        api_key: &SecretString,
        version: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert("X-PAN-KEY", key_value);

        let http = transport.build_client_with_headers(headers)?;
        Self::with_client(http, base_url, version)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &Url, version: &str) -> Result<Self, Error> {
        let base_url = base_url.join(&format!("restapi/{version}/"))?;
        Ok(Self {
            http,
            base_url,
            location: "vsys".into(),
            vsys: "vsys1".into(),
        })
    }

    /// Scope subsequent calls to a location (and vsys, for `vsys`).
    pub fn scoped(mut self, location: impl Into<String>, vsys: impl Into<String>) -> Self {
        self.location = location.into();
        self.vsys = vsys.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("location", self.location.clone())];
        if self.location == "vsys" {
            params.push(("vsys", self.vsys.clone()));
        }
        params.push(("output-format", "json".into()));
        params
    }

    /// List every entry of a collection.
    pub async fn list<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, Error> {
        let url = self.base_url.join(resource.as_ref())?;
        let params = self.params();
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url.clone())
            .query(&params)
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

        let parsed: ListResponse<T> =
            serde_json::from_str(&body).map_err(|e| Error::parse(e, &body))?;
        Ok(parsed.result.entry)
    }

    fn parse_error(status: reqwest::StatusCode, raw: &str) -> Error {
        let message = serde_json::from_str::<ErrorResponse>(raw)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if status == reqwest::StatusCode::UNAUTHORIZED {
                    "API key rejected".into()
                } else if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.to_owned()
                }
            });
        Error::Remote {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn resources_render_as_rest_paths() {
        assert_eq!(Resource::Tags.as_ref(), "Objects/Tags");
        assert_eq!(Resource::QosRules.as_ref(), "Policies/QoSRules");
    }

    #[test]
    fn vsys_param_only_for_vsys_location() {
        let base = Url::parse("https://fw1/").unwrap();
        let client = RestClient::with_client(reqwest::Client::new(), &base, "v11.0").unwrap();
        assert!(client.params().iter().any(|(k, _)| *k == "vsys"));
        assert_eq!(client.base_url().as_str(), "https://fw1/restapi/v11.0/");

        let shared = client.scoped("shared", "vsys1");
        assert!(!shared.params().iter().any(|(k, _)| *k == "vsys"));
    }
}
