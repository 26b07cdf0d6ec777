//! Device command handlers.

use std::sync::Arc;

use fwdash_core::{CoreError, Device, DeviceUpdate, HaPair, NewDevice};
use secrecy::ExposeSecret;
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "HA")]
    ha: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            hostname: d.hostname.clone(),
            site: if d.site_name.is_empty() {
                "-".into()
            } else {
                d.site_name.clone()
            },
            model: output::or_dash(d.model()),
            serial: output::or_dash(d.serial.as_deref()),
            version: output::or_dash(d.software_version()),
            ha: ha_label(d),
        }
    }
}

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Active Serial")]
    active_serial: String,
    #[tabled(rename = "Passive")]
    passive: String,
    #[tabled(rename = "Passive Serial")]
    passive_serial: String,
    #[tabled(rename = "Site")]
    site: String,
}

impl From<&HaPair> for PairRow {
    fn from(p: &HaPair) -> Self {
        Self {
            active: p.active.hostname.clone(),
            active_serial: output::or_dash(p.active.serial.as_deref()),
            passive: p.passive.hostname.clone(),
            passive_serial: output::or_dash(p.passive.serial.as_deref()),
            site: p.active.site_name.clone(),
        }
    }
}

fn ha_label(d: &Device) -> String {
    match (d.ha_enabled(), d.ha_local_state()) {
        (None, _) => "-".into(),
        (Some(false), _) => "disabled".into(),
        (Some(true), Some(state)) => state.to_owned(),
        (Some(true), None) => "enabled".into(),
    }
}

fn detail(d: &Arc<Device>) -> String {
    [
        format!("ID:          {}", d.id),
        format!("Name:        {}", d.name),
        format!("Hostname:    {}", d.hostname),
        format!("Vendor:      {}", d.vendor),
        format!(
            "Site:        {}",
            if d.site_name.is_empty() {
                format!("(missing: {})", d.site)
            } else {
                d.site_name.clone()
            }
        ),
        format!("Username:    {}", d.username),
        format!("API key:     {}", if d.has_key() { "stored" } else { "-" }),
        format!("Model:       {}", d.model().unwrap_or("-")),
        format!("Serial:      {}", d.serial.as_deref().unwrap_or("-")),
        format!("Software:    {}", d.software_version().unwrap_or("-")),
        format!("HA:          {}", ha_label(d)),
        format!("Peer state:  {}", d.ha_peer_state().unwrap_or("-")),
        format!("Peer serial: {}", d.ha_peer_serial().unwrap_or("-")),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    ctx: &Context,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let devices = ctx.devices()?;
    let registry = &devices.registry;

    match args.command {
        DevicesCommand::List => {
            registry.reload().await?;
            let snap = registry.devices();
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |d| DeviceRow::from(d),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { device } => {
            let d = util::resolve_device(registry, &device).await?;
            let out = output::render_single(&global.output, &d, detail, |d| d.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Add {
            hostname,
            site,
            name,
            username,
            password,
            key,
        } => {
            let site = util::resolve_site(&ctx.sites, &site).await?;
            let key = util::secret_or_prompt(key, "REST API key: ", "key")?;
            let password = util::secret_or_prompt(password, "Device password: ", "password")?;
            let sealed = devices
                .vault
                .encrypt(password.expose_secret())
                .map_err(CoreError::from)?;

            let added = registry
                .add_device(NewDevice {
                    name: name.unwrap_or_else(|| hostname.clone()),
                    hostname,
                    site: site.id,
                    key,
                    username,
                    password: sealed,
                })
                .await?;
            let out = output::render_single(
                &global.output,
                &added,
                |d| format!("Device '{}' added ({})", d.hostname, d.id),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Update {
            device,
            name,
            hostname,
            site,
            username,
            password,
            key,
        } => {
            let current = util::resolve_device(registry, &device).await?;
            let site = match site {
                Some(site) => Some(util::resolve_site(&ctx.sites, &site).await?.id),
                None => None,
            };
            let key = if key {
                Some(util::prompt_secret("New REST API key: ", "key")?)
            } else {
                None
            };
            let password = if password {
                let plain = util::prompt_secret("New device password: ", "password")?;
                Some(
                    registry
                        .seal_password(current.id, plain.expose_secret())
                        .await?,
                )
            } else {
                None
            };

            registry
                .update_device(
                    current.id,
                    DeviceUpdate {
                        name,
                        hostname,
                        site,
                        key,
                        username,
                        password,
                    },
                )
                .await?;
            if !global.quiet {
                eprintln!("Device updated");
            }
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let current = util::resolve_device(registry, &device).await?;
            if !util::confirm(
                &format!("Remove '{}' from the registry?", current.hostname),
                global.yes,
            )? {
                return Ok(());
            }
            registry.delete_device(current.id).await?;
            if !global.quiet {
                eprintln!("Device deleted");
            }
            Ok(())
        }

        DevicesCommand::Refresh => {
            registry.reload().await?;
            let snap = registry.devices();
            let answered = snap.iter().filter(|d| d.facts.is_some()).count();
            if !global.quiet {
                eprintln!(
                    "{answered}/{} devices answered, {} HA pair(s)",
                    snap.len(),
                    registry.ha_pairs().len()
                );
            }
            Ok(())
        }

        DevicesCommand::HaPairs => {
            registry.reload().await?;
            let pairs = registry.ha_pairs();
            let out = output::render_list(
                &global.output,
                pairs.as_slice(),
                |p| PairRow::from(p),
                |p| format!("{} {}", p.active.hostname, p.passive.hostname),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
