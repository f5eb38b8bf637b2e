//! # Configuration Module
//!
//! Runtime configuration read from the environment (optionally seeded from a
//! `.env` file by `main`).

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

use crate::fuel::FuelRates;
use crate::session::DEFAULT_SESSION_TTL;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEZONE: &str = "Europe/Kyiv";
pub const DEFAULT_LEDGER_CACHE: Duration = Duration::from_secs(10);
pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("WEBHOOK_URL or RENDER_EXTERNAL_HOSTNAME must be a non-empty URL")]
    EmptyWebhookUrl,
}

/// Where the ledger lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Sheets {
        spreadsheet_id: String,
        service_account_json: String,
    },
    /// Rows kept in process memory; lost on restart
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub telegram_token: String,
    pub ledger: LedgerBackend,
    /// Full webhook URL ending in `/webhook`; `None` selects long polling
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub owner_id: Option<u64>,
    pub rates: FuelRates,
    pub timezone: Tz,
    pub session_ttl: Duration,
    pub ledger_cache: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from a map, mainly for tests
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        let ledger = match get("LEDGER_BACKEND").as_deref().unwrap_or("sheets") {
            "sheets" => LedgerBackend::Sheets {
                spreadsheet_id: get("GOOGLE_SHEET_ID")
                    .ok_or(ConfigError::Missing("GOOGLE_SHEET_ID"))?,
                service_account_json: get("SERVICE_ACCOUNT_JSON")
                    .ok_or(ConfigError::Missing("SERVICE_ACCOUNT_JSON"))?,
            },
            "memory" => LedgerBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LEDGER_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let webhook_url = match get("WEBHOOK_URL").or_else(|| get("RENDER_EXTERNAL_HOSTNAME")) {
            Some(base) => Some(normalize_webhook_url(&base)?),
            None => None,
        };

        let owner_id = parse_or(get("OWNER_ID"), "OWNER_ID", 0u64)?;
        let rates = FuelRates {
            city: parse_rate(get("CITY_L_PER_100"), "CITY_L_PER_100", FuelRates::default().city)?,
            district: parse_rate(
                get("DISTRICT_L_PER_100"),
                "DISTRICT_L_PER_100",
                FuelRates::default().district,
            )?,
            highway: parse_rate(
                get("HIGHWAY_L_PER_100"),
                "HIGHWAY_L_PER_100",
                FuelRates::default().highway,
            )?,
        };

        let timezone_name = get("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name.parse::<Tz>().map_err(|_| ConfigError::Invalid {
            key: "TIMEZONE",
            value: timezone_name.clone(),
        })?;

        let log_format = match get("LOG_FORMAT").as_deref().unwrap_or("text") {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            telegram_token,
            ledger,
            webhook_url,
            webhook_secret: get("WEBHOOK_SECRET"),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            owner_id: Some(owner_id).filter(|id| *id != 0),
            rates,
            timezone,
            session_ttl: Duration::from_secs(parse_or(
                get("SESSION_TTL_SECS"),
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL.as_secs(),
            )?),
            ledger_cache: Duration::from_secs(parse_or(
                get("LEDGER_CACHE_SECS"),
                "LEDGER_CACHE_SECS",
                DEFAULT_LEDGER_CACHE.as_secs(),
            )?),
            log_format,
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Rates may use a decimal comma and must be non-negative
fn parse_rate(value: Option<String>, key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let normalized = value.map(|v| v.replace(',', "."));
    let rate = parse_or(normalized, key, default)?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(ConfigError::Invalid {
            key,
            value: rate.to_string(),
        });
    }
    Ok(rate)
}

/// Normalize a base URL or bare host name to the full webhook URL, ending in
/// exactly one `/webhook`.
pub fn normalize_webhook_url(base: &str) -> Result<String, ConfigError> {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyWebhookUrl);
    }

    let mut url = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    while url.ends_with('/') {
        url.pop();
    }
    while url.ends_with("/webhook/webhook") {
        url.truncate(url.len() - WEBHOOK_PATH.len());
    }
    if !url.ends_with(WEBHOOK_PATH) {
        url.push_str(WEBHOOK_PATH);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_webhook_url() {
        assert_eq!(
            normalize_webhook_url("my-bot.onrender.com").unwrap(),
            "https://my-bot.onrender.com/webhook"
        );
        assert_eq!(
            normalize_webhook_url("https://example.com/").unwrap(),
            "https://example.com/webhook"
        );
        assert_eq!(
            normalize_webhook_url("https://example.com/webhook/webhook/").unwrap(),
            "https://example.com/webhook"
        );
        assert_eq!(
            normalize_webhook_url("http://localhost:8000/webhook").unwrap(),
            "http://localhost:8000/webhook"
        );
        assert_eq!(normalize_webhook_url("  "), Err(ConfigError::EmptyWebhookUrl));
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = Config::from_map(&vars(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("LEDGER_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.ledger, LedgerBackend::Memory);
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.port, 8000);
        assert_eq!(config.owner_id, None);
        assert_eq!(config.rates, FuelRates::default());
        assert_eq!(config.timezone, chrono_tz::Europe::Kyiv);
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_full_sheets_config() {
        let config = Config::from_map(&vars(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GOOGLE_SHEET_ID", "sheet-id"),
            ("SERVICE_ACCOUNT_JSON", "{}"),
            ("RENDER_EXTERNAL_HOSTNAME", "bot.onrender.com"),
            ("OWNER_ID", "1001"),
            ("CITY_L_PER_100", "11,66"),
            ("DISTRICT_L_PER_100", "11.17"),
            ("HIGHWAY_L_PER_100", "10.19"),
            ("PORT", "10000"),
        ]))
        .unwrap();

        assert!(matches!(config.ledger, LedgerBackend::Sheets { .. }));
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://bot.onrender.com/webhook")
        );
        assert_eq!(config.owner_id, Some(1001));
        assert_eq!(config.rates.city, 11.66);
        assert_eq!(config.rates.highway, 10.19);
        assert_eq!(config.port, 10000);
    }

    #[test]
    fn test_missing_and_invalid_values() {
        assert_eq!(
            Config::from_map(&vars(&[])),
            Err(ConfigError::Missing("TELEGRAM_TOKEN"))
        );
        assert_eq!(
            Config::from_map(&vars(&[("TELEGRAM_TOKEN", "t")])),
            Err(ConfigError::Missing("GOOGLE_SHEET_ID"))
        );
        assert_eq!(
            Config::from_map(&vars(&[
                ("TELEGRAM_TOKEN", "t"),
                ("LEDGER_BACKEND", "memory"),
                ("CITY_L_PER_100", "lots"),
            ])),
            Err(ConfigError::Invalid {
                key: "CITY_L_PER_100",
                value: "lots".to_string()
            })
        );
        assert!(Config::from_map(&vars(&[
            ("TELEGRAM_TOKEN", "t"),
            ("LEDGER_BACKEND", "memory"),
            ("HIGHWAY_L_PER_100", "-1"),
        ]))
        .is_err());
    }
}
