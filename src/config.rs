use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

use crate::datasource::coinbase::DEFAULT_COINBASE_URL;
use crate::datasource::gateio::DEFAULT_GATEIO_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub primary_quote_url: String,
    pub secondary_quote_url: String,
    /// Quote sources in the order they are tried.
    pub quote_sources: Vec<QuoteSourceKind>,
    pub price_cache_ttl: Duration,
    pub display_scale: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSourceKind {
    Coinbase,
    GateIo,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            primary_quote_url: DEFAULT_COINBASE_URL.to_string(),
            secondary_quote_url: DEFAULT_GATEIO_URL.to_string(),
            quote_sources: vec![QuoteSourceKind::Coinbase, QuoteSourceKind::GateIo],
            price_cache_ttl: Duration::from_millis(30_000),
            display_scale: 18,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let bind_addr = match env_map.get("BIND_ADDR") {
            Some(raw) => raw.trim().parse::<IpAddr>().map_err(|_| {
                ConfigError::InvalidValue(
                    "BIND_ADDR".to_string(),
                    "must be an IP address".to_string(),
                )
            })?,
            None => defaults.bind_addr,
        };

        let primary_quote_url = parse_url(&env_map, "PRIMARY_QUOTE_URL")?
            .unwrap_or(defaults.primary_quote_url);
        let secondary_quote_url = parse_url(&env_map, "SECONDARY_QUOTE_URL")?
            .unwrap_or(defaults.secondary_quote_url);

        let quote_sources = match env_map.get("QUOTE_SOURCES") {
            Some(raw) => parse_quote_sources(raw)?,
            None => defaults.quote_sources,
        };

        let ttl_ms = env_map
            .get("PRICE_CACHE_TTL_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "PRICE_CACHE_TTL_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let display_scale = env_map
            .get("DISPLAY_SCALE")
            .map(|s| s.as_str())
            .unwrap_or("18")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DISPLAY_SCALE".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        Ok(Config {
            port,
            bind_addr,
            primary_quote_url,
            secondary_quote_url,
            quote_sources,
            price_cache_ttl: Duration::from_millis(ttl_ms),
            display_scale,
        })
    }
}

fn parse_url(env_map: &HashMap<String, String>, key: &str) -> Result<Option<String>, ConfigError> {
    let Some(raw) = env_map.get(key) else {
        return Ok(None);
    };
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be an http(s) URL, got {}", raw),
        ));
    }
    Ok(Some(url.to_string()))
}

fn parse_quote_sources(raw: &str) -> Result<Vec<QuoteSourceKind>, ConfigError> {
    let mut kinds = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = match name.to_ascii_lowercase().as_str() {
            "coinbase" => QuoteSourceKind::Coinbase,
            "gateio" => QuoteSourceKind::GateIo,
            other => {
                return Err(ConfigError::InvalidValue(
                    "QUOTE_SOURCES".to_string(),
                    format!("must list coinbase or gateio, got {}", other),
                ))
            }
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err(ConfigError::InvalidValue(
            "QUOTE_SOURCES".to_string(),
            "must name at least one source".to_string(),
        ));
    }
    Ok(kinds)
}
