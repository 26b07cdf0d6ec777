// Junos adapter over the REST RPC service
//
// Base path: https://{host}:{port}/rpc/
// Auth: HTTP basic, session cookie kept in a per-adapter jar.
//
// The session is opened when the adapter is built. Failing to open it is
// not an error for the caller: the failure is logged and recorded, and every
// later call answers `Error::SessionUnavailable` until `reconnect()`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapter::{DeviceApi, DeviceFacts, HaStatus};
use crate::auth::{Credentials, Vendor};
use crate::error::{Error, SessionFailure};
use crate::transport::TransportConfig;
use crate::xml;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Session {
    Open(DeviceFacts),
    Failed(SessionFailure),
    Closed,
}

/// A Junos device reached through its REST RPC service.
pub struct JunosApi {
    hostname: String,
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Session>,
}

impl JunosApi {
    /// Build the client and open the session.
    ///
    /// Only local setup problems (TLS material, header encoding) are
    /// returned as errors.
    pub async fn open(
        base_url: Url,
        hostname: &str,
        credentials: &Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credentials.basic_header()?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client_with_headers(headers)?;
        let api = Self::with_client(http, &base_url, hostname)?;
        api.reconnect().await;
        Ok(api)
    }

    /// Wrap an existing `reqwest::Client`; the session starts closed.
    pub fn with_client(http: reqwest::Client, base_url: &Url, hostname: &str) -> Result<Self, Error> {
        Ok(Self {
            hostname: hostname.to_owned(),
            http,
            base_url: base_url.join("rpc/")?,
            session: RwLock::new(Session::Closed),
        })
    }

    /// (Re)open the session by gathering device facts.
    ///
    /// Returns whether the session is now open.
    pub async fn reconnect(&self) -> bool {
        let next = match self.gather_facts().await {
            Ok(facts) => {
                info!(hostname = %self.hostname, model = %facts.model, "Junos session opened");
                Session::Open(facts)
            }
            Err(e) => {
                let failure = session_failure(&e);
                warn!(hostname = %self.hostname, error = %e, "could not open Junos session");
                Session::Failed(failure)
            }
        };
        let open = matches!(next, Session::Open(_));
        *self.session.write().await = next;
        open
    }

    /// End the session. Later calls fail until `reconnect()`.
    pub async fn close(&self) {
        *self.session.write().await = Session::Closed;
        debug!(hostname = %self.hostname, "Junos session closed");
    }

    pub async fn is_open(&self) -> bool {
        matches!(*self.session.read().await, Session::Open(_))
    }

    /// Why the last open attempt failed, if it did.
    pub async fn failure(&self) -> Option<SessionFailure> {
        match &*self.session.read().await {
            Session::Failed(f) => Some(f.clone()),
            _ => None,
        }
    }

    async fn facts(&self) -> Result<DeviceFacts, Error> {
        match &*self.session.read().await {
            Session::Open(facts) => Ok(facts.clone()),
            Session::Failed(reason) => Err(Error::SessionUnavailable {
                host: self.hostname.clone(),
                reason: reason.clone(),
            }),
            Session::Closed => Err(Error::SessionUnavailable {
                host: self.hostname.clone(),
                reason: SessionFailure::Connection("session closed".into()),
            }),
        }
    }

    async fn gather_facts(&self) -> Result<DeviceFacts, Error> {
        let software = self.rpc("get-software-information").await?;
        let inventory = self.rpc("get-chassis-inventory").await?;

        let sw_doc = xml::parse(&software)?;
        let sw = sw_doc.root_element();
        let inv_doc = xml::parse(&inventory)?;

        Ok(DeviceFacts {
            model: xml::require_text(sw, "product-model", &software)?,
            serial: xml::require_text(inv_doc.root_element(), "chassis/serial-number", &inventory)?,
            software_version: xml::require_text(sw, "junos-version", &software)?,
        })
    }

    async fn rpc(&self, name: &str) -> Result<String, Error> {
        let url = self.base_url.join(name)?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&url, &e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&url, &e))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("{} rejected the credentials", self.hostname),
            });
        }
        if !status.is_success() {
            let message = xml::parse(&body)
                .ok()
                .and_then(|doc| xml::text_at(doc.root_element(), "message"))
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

fn session_failure(err: &Error) -> SessionFailure {
    match err {
        Error::Authentication { .. } => SessionFailure::Authentication,
        Error::Timeout { .. } => SessionFailure::Timeout,
        other => SessionFailure::Connection(other.to_string()),
    }
}

#[async_trait]
impl DeviceApi for JunosApi {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn vendor(&self) -> Vendor {
        Vendor::Junos
    }

    async fn get_device(&self) -> Result<DeviceFacts, Error> {
        self.facts().await
    }

    /// Junos chassis clustering is not mapped yet; an open session always
    /// reports HA as disabled.
    async fn get_ha(&self) -> Result<HaStatus, Error> {
        self.facts().await?;
        Ok(HaStatus::Disabled)
    }

    async fn get_config(&self) -> Result<String, Error> {
        self.facts().await?;
        self.rpc("get-configuration").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_classified() {
        let auth = Error::Authentication {
            message: "nope".into(),
        };
        assert_eq!(session_failure(&auth), SessionFailure::Authentication);

        let timeout = Error::Timeout {
            url: "https://srx1:3443/rpc/".into(),
        };
        assert_eq!(session_failure(&timeout), SessionFailure::Timeout);

        let refused = Error::Transport {
            url: "https://srx1:3443/rpc/".into(),
            message: "connection refused".into(),
        };
        assert!(matches!(
            session_failure(&refused),
            SessionFailure::Connection(_)
        ));
    }
}
