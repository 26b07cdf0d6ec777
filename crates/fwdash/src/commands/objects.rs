//! Per-device object, policy and session views.

use fwdash_api::{GpSession, VpnTunnel};
use fwdash_core::objects::{
    self, AddressGroupSummary, AddressSummary, ApplicationGroupSummary, NatRuleSummary,
    QosRuleSummary, SecurityRuleSummary, ServiceGroupSummary, ServiceSummary, TagSummary,
};
use tabled::Tabled;

use crate::cli::{GlobalOpts, ObjectsArgs, ObjectsCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output::{self, join, or_dash};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Colour")]
    colour: String,
}

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Members")]
    members: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

#[derive(Tabled)]
struct NatRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Translation")]
    translation: String,
}

#[derive(Tabled)]
struct SecurityRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Application")]
    application: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Disabled")]
    disabled: String,
}

#[derive(Tabled)]
struct QosRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Application")]
    application: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "DSCP/ToS")]
    dscp: String,
}

#[derive(Tabled)]
struct GpRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Computer")]
    computer: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Virtual IP")]
    virtual_ip: String,
    #[tabled(rename = "Public IP")]
    public_ip: String,
    #[tabled(rename = "Login")]
    login: String,
}

#[derive(Tabled)]
struct TunnelRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Peer")]
    peer: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "State")]
    state: String,
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(ctx: &Context, args: ObjectsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = ctx.devices()?;
    let device = util::resolve_device(&devices.registry, &args.device).await?;
    let api = devices.registry.connect(device.id).await?;
    let api = api.as_ref();
    let fmt = &global.output;

    let out = match args.command {
        ObjectsCommand::Tags => output::render_list(
            fmt,
            &objects::tags(api).await?,
            |t: &TagSummary| TagRow {
                name: t.name.clone(),
                description: t.description.clone(),
                colour: t.colour.clone(),
            },
            |t| t.name.clone(),
        )?,

        ObjectsCommand::Addresses => output::render_list(
            fmt,
            &objects::addresses(api).await?,
            |a: &AddressSummary| AddressRow {
                name: a.name.clone(),
                address: a.address.clone(),
                description: a.description.clone(),
                tags: join(&a.tags),
            },
            |a| a.name.clone(),
        )?,

        ObjectsCommand::AddressGroups => output::render_list(
            fmt,
            &objects::address_groups(api).await?,
            |g: &AddressGroupSummary| GroupRow {
                name: g.name.clone(),
                members: g
                    .filter
                    .as_ref()
                    .map_or_else(|| join(&g.members), |f| format!("dynamic: {f}")),
                tags: join(&g.tags),
            },
            |g| g.name.clone(),
        )?,

        ObjectsCommand::ApplicationGroups => output::render_list(
            fmt,
            &objects::application_groups(api).await?,
            |g: &ApplicationGroupSummary| GroupRow {
                name: g.name.clone(),
                members: join(&g.members),
                tags: "-".into(),
            },
            |g| g.name.clone(),
        )?,

        ObjectsCommand::Services => output::render_list(
            fmt,
            &objects::services(api).await?,
            |s: &ServiceSummary| ServiceRow {
                name: s.name.clone(),
                protocol: s.protocol.clone(),
                description: s.description.clone(),
                tags: join(&s.tags),
            },
            |s| s.name.clone(),
        )?,

        ObjectsCommand::ServiceGroups => output::render_list(
            fmt,
            &objects::service_groups(api).await?,
            |g: &ServiceGroupSummary| GroupRow {
                name: g.name.clone(),
                members: join(&g.members),
                tags: join(&g.tags),
            },
            |g| g.name.clone(),
        )?,

        ObjectsCommand::Nat => output::render_list(
            fmt,
            &objects::nat_rules(api).await?,
            |r: &NatRuleSummary| NatRow {
                name: r.name.clone(),
                from: join(&r.from),
                to: join(&r.to),
                source: join(&r.source),
                destination: join(&r.destination),
                service: or_dash(r.service.as_deref()),
                translation: or_dash(r.source_translation.as_deref()),
            },
            |r| r.name.clone(),
        )?,

        ObjectsCommand::Security => output::render_list(
            fmt,
            &objects::security_rules(api).await?,
            |r: &SecurityRuleSummary| SecurityRow {
                name: r.name.clone(),
                from: join(&r.from),
                to: join(&r.to),
                source: join(&r.source),
                destination: join(&r.destination),
                application: join(&r.application),
                service: join(&r.service),
                action: or_dash(r.action.as_deref()),
                disabled: if r.disabled { "yes" } else { "no" }.into(),
            },
            |r| r.name.clone(),
        )?,

        ObjectsCommand::Qos => output::render_list(
            fmt,
            &objects::qos_rules(api).await?,
            |r: &QosRuleSummary| QosRow {
                name: r.name.clone(),
                from: join(&r.from),
                to: join(&r.to),
                application: join(&r.application),
                class: or_dash(r.class.as_deref()),
                dscp: or_dash(r.dscp.as_deref()),
            },
            |r| r.name.clone(),
        )?,

        ObjectsCommand::GpSessions => output::render_list(
            fmt,
            &objects::gp_sessions(api).await?,
            |s: &GpSession| GpRow {
                user: or_dash(s.username.as_deref()),
                computer: or_dash(s.computer.as_deref()),
                client: or_dash(s.client.as_deref()),
                virtual_ip: or_dash(s.virtual_ip.as_deref()),
                public_ip: or_dash(s.public_ip.as_deref()),
                login: or_dash(s.login_time.as_deref()),
            },
            |s| s.username.clone().unwrap_or_default(),
        )?,

        ObjectsCommand::VpnTunnels => output::render_list(
            fmt,
            &objects::vpn_tunnels(api).await?,
            |t: &VpnTunnel| TunnelRow {
                name: t.name.clone(),
                gateway: or_dash(t.gateway.as_deref()),
                peer: or_dash(t.peer_ip.as_deref()),
                local: or_dash(t.local_ip.as_deref()),
                state: or_dash(t.state.as_deref()),
            },
            |t| t.name.clone(),
        )?,

        ObjectsCommand::Config { out_dir } => {
            let now = chrono::Local::now().naive_local();
            let download = objects::download_config(api, now).await?;
            std::fs::create_dir_all(&out_dir)?;
            let path = out_dir.join(&download.filename);
            std::fs::write(&path, download.xml)?;
            path.display().to_string()
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
