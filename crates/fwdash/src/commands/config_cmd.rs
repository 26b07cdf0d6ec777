//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use fwdash_config::{Config, StoreBackend};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::{self, prompt_err};

const VENDORS: [&str; 2] = ["paloalto", "junos"];

/// Where the master passphrase currently comes from, without revealing it.
fn passphrase_source(cfg: &Config) -> String {
    if std::env::var(&cfg.vault.passphrase_env).is_ok_and(|v| !v.is_empty()) {
        format!("${}", cfg.vault.passphrase_env)
    } else {
        "system keyring (if set)".into()
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::active_config_path(global);

    match args.command {
        ConfigCommand::Init => init(&path, global),

        ConfigCommand::Show => {
            let cfg = fwdash_config::load_config_from(&path)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| {
                    let body = toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}\n"));
                    format!("# passphrase: {}\n{body}", passphrase_source(c))
                },
                |c| c.store.path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Validate => {
            let cfg = fwdash_config::load_config_from(&path)?;
            cfg.validate()?;
            if !global.quiet {
                eprintln!("Configuration OK ({})", path.display());
            }
            Ok(())
        }

        ConfigCommand::TestStore => {
            let ctx = config::Context::open(global).await?;
            ctx.store
                .test_connection()
                .await
                .map_err(|e| CliError::Store {
                    message: e.to_string(),
                })?;
            if !global.quiet {
                match ctx.config.store.backend {
                    StoreBackend::Sqlite => {
                        eprintln!("Store OK ({})", ctx.config.store.path.display());
                    }
                    StoreBackend::Memory => eprintln!("Store OK (memory)"),
                }
            }
            Ok(())
        }
    }
}

fn init(path: &std::path::Path, global: &GlobalOpts) -> Result<(), CliError> {
    eprintln!("fwdash configuration");
    eprintln!("   Config path: {}\n", path.display());

    if path.exists()
        && !util::confirm(
            &format!("{} exists. Overwrite?", path.display()),
            global.yes,
        )?
    {
        return Ok(());
    }

    let mut cfg = Config::default();

    // 1. Vendor
    let vendor = Select::new()
        .with_prompt("Firewall vendor")
        .items(&VENDORS)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    cfg.registry.vendor = VENDORS.get(vendor).copied().unwrap_or("paloalto").into();

    // 2. Store
    let store: String = Input::new()
        .with_prompt("Record store database")
        .default(cfg.store.path.display().to_string())
        .interact_text()
        .map_err(prompt_err)?;
    cfg.store.backend = StoreBackend::Sqlite;
    cfg.store.path = PathBuf::from(store);

    // 3. TLS
    cfg.registry.insecure = Confirm::new()
        .with_prompt("Accept self-signed device certificates?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    // 4. Concurrency
    cfg.registry.fetch_concurrency = Input::new()
        .with_prompt("Devices queried at once")
        .default(cfg.registry.fetch_concurrency)
        .interact_text()
        .map_err(prompt_err)?;

    cfg.validate()?;
    config::save_config(&cfg, path)?;
    eprintln!("\n   Config written to {}", path.display());

    // 5. Master passphrase
    let store_now = Confirm::new()
        .with_prompt("Store a master passphrase in the system keyring now?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if store_now {
        let passphrase = util::prompt_secret("Master passphrase: ", "passphrase")?;
        fwdash_config::save_master_passphrase(&passphrase)?;
        eprintln!("   Passphrase stored in system keyring");
    } else {
        eprintln!(
            "   Export ${} before running device commands",
            cfg.vault.passphrase_env
        );
    }
    Ok(())
}
