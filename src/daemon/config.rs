//! Service configuration loaded from a TOML file (default `countdown.toml`).

use crate::occasion::Occasion;
use crate::quotes::QuoteCatalog;
use chrono::NaiveDate;
use chrono_tz::Tz;
use color_eyre::eyre::{Result, bail, eyre};
use croner::Cron;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Address the HTTP trigger listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Base URL the scheduler uses to call the HTTP trigger. Derived from
    /// `listen` when unset.
    #[serde(default)]
    pub loopback_base_url: Option<String>,

    /// IANA time zone for the countdown date and the schedules.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Calendar date the countdown runs to.
    #[serde(default = "default_target_date")]
    pub target_date: NaiveDate,

    /// Group invite link shared by both occasions unless overridden.
    #[serde(default)]
    pub group_invite_link: Option<String>,

    /// Messaging bridge connection.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Connection watchdog.
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Per-occasion route, schedule and overrides.
    #[serde(default)]
    pub occasions: OccasionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Bearer token sent with every bridge request.
    #[serde(default)]
    pub token: Option<String>,

    /// How often to poll the bridge while waiting for QR pairing (seconds).
    #[serde(default = "default_pairing_poll")]
    pub pairing_poll_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            token: None,
            pairing_poll_secs: default_pairing_poll(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchdogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between liveness checks.
    #[serde(default = "default_watchdog_interval")]
    pub interval_secs: u64,

    /// Command (argv) run when the session is found disconnected.
    #[serde(default = "default_restart_command")]
    pub restart_command: Vec<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_watchdog_interval(),
            restart_command: default_restart_command(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OccasionConfig {
    /// HTTP path of the trigger route.
    pub path: String,

    /// Cron expression, evaluated in `timezone`.
    pub schedule: String,

    /// Overrides `group_invite_link` for this occasion.
    #[serde(default)]
    pub invite_link: Option<String>,

    /// Replaces the built-in quote list for this occasion.
    #[serde(default)]
    pub quotes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OccasionsConfig {
    #[serde(default = "default_morning")]
    pub morning: OccasionConfig,

    #[serde(default = "default_evening")]
    pub evening: OccasionConfig,
}

impl Default for OccasionsConfig {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            evening: default_evening(),
        }
    }
}

impl OccasionsConfig {
    pub fn get(&self, occasion: Occasion) -> &OccasionConfig {
        match occasion {
            Occasion::Morning => &self.morning,
            Occasion::Evening => &self.evening,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 1323))
}

fn default_timezone() -> String {
    "Asia/Jakarta".into()
}

fn default_target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 16).unwrap_or_default()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_pairing_poll() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_watchdog_interval() -> u64 {
    10
}

fn default_restart_command() -> Vec<String> {
    ["sudo", "service", "wa-auto", "restart"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_morning() -> OccasionConfig {
    OccasionConfig {
        path: "/kalbe/morning".into(),
        schedule: "0 7 * * 1-5".into(),
        invite_link: None,
        quotes: None,
    }
}

fn default_evening() -> OccasionConfig {
    OccasionConfig {
        path: "/kalbe/night".into(),
        schedule: "0 20 * * *".into(),
        invite_link: None,
        quotes: None,
    }
}

/// Parse a cron expression the way the scheduler will.
pub fn parse_schedule(expr: &str) -> Result<Cron> {
    Cron::new(expr)
        .parse()
        .map_err(|e| eyre!("invalid cron expression {expr:?}: {e}"))
}

impl ServiceConfig {
    /// Load and validate config from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                eyre!(
                    "No config found at {}\n\n\
                     Create it with at least the group to post into:\n\n\
                     group_invite_link = \"https://chat.whatsapp.com/...\"\n\n\
                     [gateway]\n\
                     base_url = \"http://127.0.0.1:3000\"\n",
                    path.display()
                )
            } else {
                eyre!("failed to read {}: {e}", path.display())
            }
        })?;
        let config = Self::parse(&content)
            .map_err(|e| eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate config from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(content).map_err(|e| eyre!("{e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.zone()?;

        for occasion in Occasion::ALL {
            let oc = self.occasions.get(occasion);
            if !oc.path.starts_with('/') {
                bail!("occasions.{occasion}.path must start with '/', got {:?}", oc.path);
            }
            parse_schedule(&oc.schedule)
                .map_err(|e| eyre!("occasions.{occasion}.schedule: {e}"))?;
            if self.invite_link(occasion).is_none() {
                bail!("no invite link for {occasion}: set group_invite_link or occasions.{occasion}.invite_link");
            }
            if let Some(quotes) = &oc.quotes {
                if quotes.is_empty() {
                    bail!("occasions.{occasion}.quotes must not be empty");
                }
            }
        }

        if self.occasions.morning.path == self.occasions.evening.path {
            bail!("morning and evening must use different paths");
        }

        if self.watchdog.enabled {
            if self.watchdog.restart_command.is_empty() {
                bail!("watchdog.restart_command must not be empty");
            }
            if self.watchdog.interval_secs == 0 {
                bail!("watchdog.interval_secs must be greater than zero");
            }
        }

        Ok(())
    }

    /// The configured time zone.
    pub fn zone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| eyre!("invalid timezone {:?}: {e}", self.timezone))
    }

    /// Invite link for an occasion, falling back to the shared one.
    pub fn invite_link(&self, occasion: Occasion) -> Option<&str> {
        self.occasions
            .get(occasion)
            .invite_link
            .as_deref()
            .or(self.group_invite_link.as_deref())
            .filter(|link| !link.trim().is_empty())
    }

    /// Built-in catalog with any configured overrides applied.
    pub fn quote_catalog(&self) -> QuoteCatalog {
        Occasion::ALL
            .into_iter()
            .fold(QuoteCatalog::builtin(), |catalog, occasion| {
                match &self.occasions.get(occasion).quotes {
                    Some(quotes) => catalog.with_override(occasion, quotes.clone()),
                    None => catalog,
                }
            })
    }

    /// Base URL for loopback trigger calls.
    pub fn loopback_base_url(&self) -> String {
        if let Some(url) = &self.loopback_base_url {
            return url.trim_end_matches('/').to_owned();
        }
        let port = self.listen.port();
        if self.listen.ip().is_unspecified() {
            format!("http://127.0.0.1:{port}")
        } else {
            format!("http://{}", self.listen)
        }
    }
}
