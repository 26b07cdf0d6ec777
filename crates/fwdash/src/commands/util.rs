//! Shared helpers for command handlers.

use std::sync::Arc;

use fwdash_core::{Device, DeviceId, DeviceRegistry, Site, SiteId, SiteRegistry};
use secrecy::SecretString;

use crate::error::CliError;

/// Resolve a site identifier (UUID or name) against a fresh site list.
pub async fn resolve_site(sites: &SiteRegistry, identifier: &str) -> Result<Arc<Site>, CliError> {
    let snap = sites.list().await?;
    if let Ok(id) = identifier.parse::<SiteId>() {
        if let Some(site) = snap.iter().find(|s| s.id == id) {
            return Ok(Arc::clone(site));
        }
    }
    snap.iter()
        .find(|s| s.name == identifier)
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "site".into(),
            identifier: identifier.into(),
            list_command: "sites list".into(),
        })
}

/// Resolve a device identifier (UUID or hostname) after a reload.
pub async fn resolve_device(
    registry: &DeviceRegistry,
    identifier: &str,
) -> Result<Arc<Device>, CliError> {
    registry.reload().await?;
    let found = match identifier.parse::<DeviceId>() {
        Ok(id) => registry.get(id),
        Err(_) => None,
    };
    found
        .or_else(|| registry.find_by_hostname(identifier))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "devices list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Read a secret from the terminal without echo.
pub fn prompt_secret(prompt: &str, field: &str) -> Result<SecretString, CliError> {
    let value = rpassword::prompt_password(prompt).map_err(prompt_err)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(SecretString::from(value))
}

/// A secret given on the command line or env, else prompted for.
pub fn secret_or_prompt(
    given: Option<String>,
    prompt: &str,
    field: &str,
) -> Result<SecretString, CliError> {
    match given {
        Some(value) if !value.is_empty() => Ok(SecretString::from(value)),
        _ => prompt_secret(prompt, field),
    }
}
