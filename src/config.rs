use std::time::Duration;

use crate::error::{Result, TrackerError};
use jiff::SignedDuration;
use serde::Deserialize;
use serde::de::{self, Deserializer};
use url::Url;

pub const DEFAULT_TRACKING_URL: &str =
    "http://www.unitedvanlines.com/vanlines/api/shipmentTracking-v1";

/// Runtime configuration, read from the environment (and `.env` if present).
#[derive(Debug, Deserialize)]
pub struct Config {
    pub webhook_url: Url,
    pub nickname: String,
    pub last_name: String,
    pub order_number: String,
    /// Overrides the channel configured on the webhook itself.
    #[serde(default)]
    pub channel: Option<String>,
    /// Time between lookups, e.g. `15m`, `90s` or `1h`.
    #[serde(default = "default_poll_interval", deserialize_with = "interval_from_text")]
    pub poll_interval: Duration,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_tracking_url")]
    pub tracking_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

fn interval_from_text<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let parsed: SignedDuration = text
        .trim()
        .parse()
        .map_err(|e| de::Error::custom(format!("invalid POLL_INTERVAL {text:?}: {e}")))?;
    Duration::try_from(parsed)
        .map_err(|_| de::Error::custom(format!("POLL_INTERVAL must not be negative: {text:?}")))
}

fn default_tracking_url() -> Url {
    Url::parse(DEFAULT_TRACKING_URL).expect("default tracking URL is valid")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("united-tracker/", env!("CARGO_PKG_VERSION")).into()
}

/// Who we are tracking. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentIdentity {
    pub last_name: String,
    pub order_number: String,
    pub nickname: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| TrackerError::Config(e.to_string()))?
            .validate()
    }

    fn validate(mut self) -> Result<Self> {
        for (name, value) in [
            ("NICKNAME", &self.nickname),
            ("LAST_NAME", &self.last_name),
            ("ORDER_NUMBER", &self.order_number),
        ] {
            if value.trim().is_empty() {
                return Err(TrackerError::Config(format!("{name} must not be empty")));
            }
        }

        for (name, url) in [
            ("WEBHOOK_URL", &self.webhook_url),
            ("TRACKING_URL", &self.tracking_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(TrackerError::Config(format!(
                    "{name} must be an http(s) URL, got {url}"
                )));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(TrackerError::Config(
                "POLL_INTERVAL must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(TrackerError::Config(
                "REQUEST_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        self.channel = self.channel.filter(|c| !c.trim().is_empty());
        Ok(self)
    }

    pub fn identity(&self) -> ShipmentIdentity {
        ShipmentIdentity {
            last_name: self.last_name.clone(),
            order_number: self.order_number.clone(),
            nickname: self.nickname.clone(),
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
