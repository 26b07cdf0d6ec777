//! Command dispatch: bridges CLI args -> registries -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod objects;
pub mod sites;
pub mod util;
pub mod vault;

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sites(args) => sites::handle(ctx, args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Objects(args) => objects::handle(ctx, args, global).await,
        Command::Vault(args) => vault::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
