use crate::cli::Cli;
use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REGISTRY_URL: &str = "https://mods.factorio.com/api/mods";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://mods.factorio.com";
const DEFAULT_MOD_DIR: &str = "./data/mods";
const DEFAULT_COMPOSE: &str = "docker-compose";
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
const DEFAULT_SERVICE: &str = "factorio";
const DEFAULT_OWNER: Owner = Owner { uid: 845, gid: 845 };
const DEFAULT_RESTART_DELAY_SECS: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Numeric owner applied to installed archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl FromStr for Owner {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SyncError::Config(format!("Owner must be UID:GID, got '{s}'"));
        let (uid, gid) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Owner {
            uid: uid.trim().parse().map_err(|_| invalid())?,
            gid: gid.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

/// Static credentials for the mod portal download endpoint.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}

/// Keys accepted in the `--config` TOML file. Every key is optional and
/// mirrors the command-line flag of the same name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub mod_dir: Option<PathBuf>,
    pub compose: Option<PathBuf>,
    pub compose_file: Option<PathBuf>,
    pub service: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub server: Option<bool>,
    pub webhook: Option<String>,
    pub registry_url: Option<String>,
    pub download_url: Option<String>,
    pub owner: Option<String>,
    pub chown: Option<bool>,
    pub restart_delay: Option<u64>,
    pub timeout: Option<u64>,
    pub no_downgrade: Option<bool>,
    pub keep_going: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read '{}': {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

/// Resolved settings for a single run.
#[derive(Debug, Clone)]
pub struct Config {
    pub mod_dir: PathBuf,
    pub compose: PathBuf,
    pub compose_file: PathBuf,
    pub service: String,
    pub credentials: Credentials,
    pub update_server: bool,
    pub webhook: Option<Url>,
    pub registry_url: Url,
    pub download_url: Url,
    pub owner: Option<Owner>,
    pub restart_delay: Duration,
    pub timeout: Option<Duration>,
    pub dry_run: bool,
    pub no_downgrade: bool,
    pub keep_going: bool,
}

impl Config {
    /// Build the configuration from the command line, reading `--config`
    /// when given. Flags take precedence over the file.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self> {
        let owner = if cli.no_chown || (file.chown == Some(false) && cli.owner.is_none()) {
            None
        } else {
            match cli.owner.as_deref().or(file.owner.as_deref()) {
                Some(raw) => Some(raw.parse()?),
                None => Some(DEFAULT_OWNER),
            }
        };

        let webhook = cli
            .webhook
            .clone()
            .or(file.webhook)
            .filter(|w| !w.trim().is_empty())
            .map(|w| parse_http_url(&w, "webhook"))
            .transpose()?;

        let registry_url = parse_http_url(
            cli.registry_url
                .as_deref()
                .or(file.registry_url.as_deref())
                .unwrap_or(DEFAULT_REGISTRY_URL),
            "registry",
        )?;
        let download_url = parse_http_url(
            cli.download_url
                .as_deref()
                .or(file.download_url.as_deref())
                .unwrap_or(DEFAULT_DOWNLOAD_URL),
            "download",
        )?;

        let timeout_secs = cli.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Config {
            mod_dir: cli
                .mod_dir
                .clone()
                .or(file.mod_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOD_DIR)),
            compose: cli
                .compose
                .clone()
                .or(file.compose)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSE)),
            compose_file: cli
                .compose_file
                .clone()
                .or(file.compose_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSE_FILE)),
            service: cli
                .service
                .clone()
                .or(file.service)
                .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            credentials: Credentials {
                username: cli.username.clone().or(file.username).unwrap_or_default(),
                token: cli.token.clone().or(file.token).unwrap_or_default(),
            },
            update_server: cli.update_server || file.server.unwrap_or(false),
            webhook,
            registry_url,
            download_url,
            owner,
            restart_delay: Duration::from_secs(
                cli.restart_delay
                    .or(file.restart_delay)
                    .unwrap_or(DEFAULT_RESTART_DELAY_SECS),
            ),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            dry_run: cli.dry_run,
            no_downgrade: cli.no_downgrade || file.no_downgrade.unwrap_or(false),
            keep_going: cli.keep_going || file.keep_going.unwrap_or(false),
        })
    }
}

fn parse_http_url(raw: &str, label: &str) -> Result<Url> {
    let parsed = Url::parse(raw)
        .map_err(|e| SyncError::Config(format!("Invalid {label} URL '{raw}': {e}")))?;

    match parsed.scheme() {
        "https" | "http" => Ok(parsed),
        scheme => Err(SyncError::Config(format!(
            "Unsupported {label} URL scheme: {scheme}"
        ))),
    }
}
