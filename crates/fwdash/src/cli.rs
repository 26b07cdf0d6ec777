//! Clap derive structures for the `fwdash` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fwdash -- inventory of firewall sites, devices and HA pairs
#[derive(Debug, Parser)]
#[command(
    name = "fwdash",
    version,
    about = "Manage a firewall inventory from the command line",
    long_about = "Keeps a registry of sites and firewalls, queries each device for\n\
        its serial, software and HA state, and derives HA pairs.\n\n\
        PAN-OS devices are reached over the XML and REST APIs, Junos devices\n\
        over the REST RPC service.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FWDASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Record store database file (overrides store.path)
    #[arg(long, env = "FWDASH_STORE_PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FWDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed device certificates
    #[arg(long, short = 'k', env = "FWDASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Device request timeout in seconds (overrides registry.timeout)
    #[arg(long, env = "FWDASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage sites
    #[command(alias = "s")]
    Sites(SitesArgs),

    /// Manage firewalls
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show objects, policies and sessions of one device
    #[command(alias = "obj")]
    Objects(ObjectsArgs),

    /// Master passphrase operations
    Vault(VaultArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites
    #[command(alias = "ls")]
    List {
        /// Query every device first so member counts are current
        #[arg(long)]
        with_devices: bool,
    },

    /// Create a site
    Add {
        /// Site name (must be unique)
        name: String,
    },

    /// Rename a site
    Rename {
        /// Site ID (UUID) or name
        site: String,

        /// New name
        name: String,
    },

    /// Delete a site that no device references
    #[command(alias = "rm")]
    Delete {
        /// Site ID (UUID) or name
        site: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// Query every device and list them
    #[command(alias = "ls")]
    List,

    /// Show one device
    Show {
        /// Device ID (UUID) or hostname
        device: String,
    },

    /// Register a device
    Add {
        /// Management hostname or address (must be unique)
        #[arg(long)]
        hostname: String,

        /// Site ID (UUID) or name
        #[arg(long)]
        site: String,

        /// Display name (defaults to the hostname)
        #[arg(long)]
        name: Option<String>,

        /// Management user name
        #[arg(long, default_value = "admin")]
        username: String,

        /// Management password (prompted when omitted)
        #[arg(long, env = "FWDASH_DEVICE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// REST API key (prompted when omitted)
        #[arg(long, env = "FWDASH_DEVICE_KEY", hide_env_values = true)]
        key: Option<String>,
    },

    /// Change a device's name, address, site or credentials
    Update {
        /// Device ID (UUID) or hostname
        device: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        hostname: Option<String>,

        /// Site ID (UUID) or name
        #[arg(long)]
        site: Option<String>,

        #[arg(long)]
        username: Option<String>,

        /// Prompt for a new management password
        #[arg(long)]
        password: bool,

        /// Prompt for a new REST API key
        #[arg(long)]
        key: bool,
    },

    /// Remove a device from the registry
    #[command(alias = "rm")]
    Delete {
        /// Device ID (UUID) or hostname
        device: String,
    },

    /// Query every device and write learned serials back
    Refresh,

    /// List HA pairs
    HaPairs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OBJECTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ObjectsArgs {
    /// Device ID (UUID) or hostname
    pub device: String,

    #[command(subcommand)]
    pub command: ObjectsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ObjectsCommand {
    /// Tags
    Tags,
    /// Address objects
    Addresses,
    /// Address groups
    AddressGroups,
    /// Application groups
    ApplicationGroups,
    /// Service objects
    Services,
    /// Service groups
    ServiceGroups,
    /// NAT rules, in rule order
    Nat,
    /// Security rules, in rule order
    Security,
    /// QoS rules, in rule order
    Qos,
    /// Connected GlobalProtect users
    GpSessions,
    /// IPsec tunnels
    VpnTunnels,
    /// Download the running configuration
    Config {
        /// Directory to write `<hostname>_<timestamp>.xml` into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VAULT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct VaultArgs {
    #[command(subcommand)]
    pub command: VaultCommand,
}

#[derive(Debug, Subcommand)]
pub enum VaultCommand {
    /// Re-encrypt every stored password under a new master passphrase
    Rotate {
        /// Store the new passphrase in the system keyring
        #[arg(long)]
        save_keyring: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Check the resolved configuration
    Validate,

    /// Open the record store and run a test query
    TestStore,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
