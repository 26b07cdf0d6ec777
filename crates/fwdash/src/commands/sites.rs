//! Site command handlers.

use std::sync::Arc;

use fwdash_core::Site;
use tabled::Tabled;

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Devices")]
    devices: String,
}

impl SiteRow {
    fn new(s: &Arc<Site>, counted: bool) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            devices: if counted {
                s.devices.len().to_string()
            } else {
                "-".into()
            },
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SitesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List { with_devices } => {
            if with_devices {
                ctx.devices()?.registry.reload().await?;
            } else {
                ctx.sites.reload().await?;
            }
            let mut snap: Vec<Arc<Site>> = ctx.sites.snapshot().iter().cloned().collect();
            snap.sort_by(|a, b| a.name.cmp(&b.name));
            let out = output::render_list(
                &global.output,
                &snap,
                |s| SiteRow::new(s, with_devices),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Add { name } => {
            let site = ctx.sites.add_site(&name).await?;
            let out = output::render_single(
                &global.output,
                &site,
                |s| format!("Site '{}' created ({})", s.name, s.id),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Rename { site, name } => {
            let site = util::resolve_site(&ctx.sites, &site).await?;
            ctx.sites.update_site(site.id, &name).await?;
            if !global.quiet {
                eprintln!("Site renamed to '{name}'");
            }
            Ok(())
        }

        SitesCommand::Delete { site } => {
            let site = util::resolve_site(&ctx.sites, &site).await?;
            if !util::confirm(&format!("Delete site '{}'?", site.name), global.yes)? {
                return Ok(());
            }
            ctx.sites.delete_site(site.id).await?;
            if !global.quiet {
                eprintln!("Site deleted");
            }
            Ok(())
        }
    }
}
