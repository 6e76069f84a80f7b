use crate::errors::DashboardError;
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::info;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_LOCATIONS: [&str; 4] = ["Thamel", "Kathmandu", "Bhaktapur", "Lalitpur"];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub click_delay: Duration,
    pub request_timeout: Duration,
    pub locations: Vec<String>,
    pub probe_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            click_delay: Duration::from_millis(250),
            request_timeout: Duration::from_secs(10),
            locations: DEFAULT_LOCATIONS.map(String::from).to_vec(),
            probe_images: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, DashboardError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, with the variable source injected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DashboardError> {
        let defaults = Self::default();

        let api_url = lookup("DASHBOARD_API_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                info!("DASHBOARD_API_URL not set, using default: {}", defaults.api_url);
                defaults.api_url.clone()
            });

        let click_delay = match parse_var::<u64>(&lookup, "DASHBOARD_CLICK_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => defaults.click_delay,
        };
        let request_timeout = match parse_var::<u64>(&lookup, "DASHBOARD_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(DashboardError::config(
                    "DASHBOARD_TIMEOUT_SECS must be greater than zero",
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };
        let probe_images =
            parse_var::<bool>(&lookup, "DASHBOARD_PROBE_IMAGES")?.unwrap_or(defaults.probe_images);

        let locations = match lookup("DASHBOARD_LOCATIONS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|location| !location.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.locations,
        };

        Ok(Self {
            api_url,
            click_delay,
            request_timeout,
            locations,
            probe_images,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, DashboardError>
where
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err| DashboardError::config(format!("invalid {key} value {raw:?}: {err}")))
}
