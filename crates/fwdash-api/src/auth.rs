use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Device family, as recorded in the `vendor` column of the device table.
///
/// This tag is the only thing that decides which adapter is built for a
/// device. Nothing downstream of [`connect`](crate::connect) branches on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Vendor {
    /// Palo Alto Networks PAN-OS (XML command API + REST API).
    #[serde(rename = "paloalto")]
    #[strum(serialize = "paloalto")]
    PaloAlto,
    /// Juniper Junos (REST RPC endpoint, session based).
    Junos,
}

/// Secret material for one device.
///
/// PAN-OS uses both: the username/password pair for the XML API (sent as
/// HTTP basic auth) and the API key for the REST API. Junos uses only the
/// username/password pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub api_key: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// `base64(username:password)`, the token the XML API expects after `Basic `.
    pub fn basic_token(&self) -> SecretString {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        SecretString::from(STANDARD.encode(raw))
    }

    /// The `Authorization: Basic …` header value, flagged sensitive.
    pub(crate) fn basic_header(&self) -> Result<HeaderValue, Error> {
        let token = self.basic_token();
        let mut value = HeaderValue::from_str(&format!("Basic {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid credential header value: {e}"),
            })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Everything needed to build an adapter for one device.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub vendor: Vendor,
    pub hostname: String,
    pub credentials: Credentials,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vendor_round_trips_through_strings() {
        assert_eq!("paloalto".parse::<Vendor>().unwrap(), Vendor::PaloAlto);
        assert_eq!("PaloAlto".parse::<Vendor>().unwrap(), Vendor::PaloAlto);
        assert_eq!("junos".parse::<Vendor>().unwrap(), Vendor::Junos);
        assert_eq!(Vendor::PaloAlto.to_string(), "paloalto");
        assert!("cisco".parse::<Vendor>().is_err());
    }

    #[test]
    fn vendor_serde_uses_column_values() {
        let json = serde_json::to_string(&Vendor::PaloAlto).unwrap();
        assert_eq!(json, "\"paloalto\"");
        let back: Vendor = serde_json::from_str("\"junos\"").unwrap();
        assert_eq!(back, Vendor::Junos);
    }

    #[test]
    fn basic_token_encodes_user_and_password() {
        let creds = Credentials::new("admin", SecretString::from("s3cret".to_owned()));
        // base64("admin:s3cret")
        assert_eq!(creds.basic_token().expose_secret(), "YWRtaW46czNjcmV0");
        assert!(creds.basic_header().unwrap().is_sensitive());
    }
}
