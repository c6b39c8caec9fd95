use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "modsync",
    about = "Update Factorio mods from the mod portal and restart the server when they change",
    version,
    author
)]
pub struct Cli {
    /// Optional TOML file providing defaults for any of the options below
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that contains the mod archives [default: ./data/mods]
    #[arg(short = 'd', long = "mod-dir", value_name = "DIR")]
    pub mod_dir: Option<PathBuf>,

    /// docker-compose executable [default: docker-compose]
    #[arg(short = 'c', long = "compose", value_name = "PATH")]
    pub compose: Option<PathBuf>,

    /// docker-compose.yml path [default: docker-compose.yml]
    #[arg(short = 'f', long = "compose-file", value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// Service name of the game server container [default: factorio]
    #[arg(short = 's', long = "service")]
    pub service: Option<String>,

    /// Username on factorio.com
    #[arg(short = 'u', long, env = "MODSYNC_USERNAME")]
    pub username: Option<String>,

    /// Token of the factorio.com user
    #[arg(short = 't', long, env = "MODSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Pull and recreate the server container after updating mods
    #[arg(long = "server")]
    pub update_server: bool,

    /// Webhook URL that receives a message for every update
    #[arg(short = 'w', long = "webhook", value_name = "URL")]
    pub webhook: Option<String>,

    /// Mod portal API endpoint
    #[arg(long = "registry-url", value_name = "URL")]
    pub registry_url: Option<String>,

    /// Base URL that release download paths are resolved against
    #[arg(long = "download-url", value_name = "URL")]
    pub download_url: Option<String>,

    /// Owner applied to installed archives, as UID:GID [default: 845:845]
    #[arg(long, value_name = "UID:GID", conflicts_with = "no_chown")]
    pub owner: Option<String>,

    /// Keep the owner of the running user on installed archives
    #[arg(long = "no-chown")]
    pub no_chown: bool,

    /// Seconds to wait after restarting the service [default: 5]
    #[arg(long = "restart-delay", value_name = "SECS")]
    pub restart_delay: Option<u64>,

    /// HTTP timeout in seconds, 0 disables it [default: 300]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show which mods would be updated without changing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Skip releases that are older than the installed version
    #[arg(long = "no-downgrade")]
    pub no_downgrade: bool,

    /// Continue with the remaining mods when one of them fails
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
