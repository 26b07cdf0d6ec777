//! Master passphrase rotation.

use secrecy::{ExposeSecret, SecretString};

use crate::cli::{GlobalOpts, VaultArgs, VaultCommand};
use crate::config::Context;
use crate::error::CliError;

use super::util;

/// Env var read instead of prompting for the new passphrase.
const NEW_PASSPHRASE_ENV: &str = "FWDASH_NEW_MASTER_PASSPHRASE";

fn new_passphrase() -> Result<SecretString, CliError> {
    if let Ok(value) = std::env::var(NEW_PASSPHRASE_ENV) {
        if !value.is_empty() {
            return Ok(SecretString::from(value));
        }
    }

    let first = util::prompt_secret("New master passphrase: ", "passphrase")?;
    let second = util::prompt_secret("Repeat new master passphrase: ", "passphrase")?;
    if first.expose_secret() != second.expose_secret() {
        return Err(CliError::Validation {
            field: "passphrase".into(),
            reason: "the two entries differ".into(),
        });
    }
    Ok(first)
}

pub async fn handle(ctx: &Context, args: VaultArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        VaultCommand::Rotate { save_keyring } => {
            let devices = ctx.devices()?;
            let next = new_passphrase()?;
            if devices.vault.is_active(&next) {
                return Err(CliError::Validation {
                    field: "passphrase".into(),
                    reason: "the new passphrase equals the current one".into(),
                });
            }
            if !util::confirm(
                "Re-encrypt every stored device password under the new passphrase?",
                global.yes,
            )? {
                return Ok(());
            }

            devices
                .registry
                .reset_master_password(next.clone())
                .await?;

            if save_keyring {
                fwdash_config::save_master_passphrase(&next)?;
                if !global.quiet {
                    eprintln!("New passphrase stored in the system keyring");
                }
            } else if !global.quiet {
                eprintln!(
                    "Master passphrase rotated. Update ${} before the next run.",
                    ctx.config.vault.passphrase_env
                );
            }
            Ok(())
        }
    }
}
