use std::path::{Path, PathBuf};

use crate::error::AppError;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FREQUENCY: u32 = 12;
const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Which surface the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// JSON REST API for the browser client.
    Http,
    /// MCP JSON-RPC on stdin/stdout.
    Stdio,
}

/// Application configuration loaded explicitly from environment variables.
///
/// Every setting is optional. Data files default to the copies bundled into the binary;
/// when a path is given it must exist.
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: Transport,
    /// Listen address for the REST API.
    pub http_addr: String,
    /// Medicine catalog JSON overriding the bundled one.
    pub catalog_path: Option<PathBuf>,
    /// Locality multiplier table overriding the bundled one.
    pub localities_path: Option<PathBuf>,
    /// Partner feeds fetched at startup. Empty means bundled listings only.
    pub partner_feed_urls: Vec<String>,
    /// Fills per year used when a savings request omits it.
    pub default_frequency: u32,
    /// Search results returned when a request omits `limit`.
    pub search_limit: usize,
}

impl Config {
    /// Optional:
    /// - `MEDFINDER_TRANSPORT`: `http` (default) or `stdio`
    /// - `MEDFINDER_HTTP_ADDR`: REST listen address (default: "0.0.0.0:8080")
    /// - `MEDFINDER_CATALOG_PATH`: medicine catalog JSON file
    /// - `MEDFINDER_LOCALITIES_PATH`: locality multiplier JSON file
    /// - `MEDFINDER_PARTNER_FEED_URLS`: comma-separated partner feed URLs
    /// - `MEDFINDER_DEFAULT_FREQUENCY`: fills per year (default: 12)
    /// - `MEDFINDER_SEARCH_LIMIT`: default result count (default: 10, max: 50)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = match var("MEDFINDER_TRANSPORT").as_deref().map(str::trim) {
            None | Some("") | Some("http") => Transport::Http,
            Some("stdio") => Transport::Stdio,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "MEDFINDER_TRANSPORT must be 'http' or 'stdio', got '{other}'"
                )))
            }
        };

        let http_addr = var("MEDFINDER_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

        let catalog_path = existing_path(var("MEDFINDER_CATALOG_PATH"), "MEDFINDER_CATALOG_PATH")?;
        let localities_path =
            existing_path(var("MEDFINDER_LOCALITIES_PATH"), "MEDFINDER_LOCALITIES_PATH")?;

        let partner_feed_urls = var("MEDFINDER_PARTNER_FEED_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let default_frequency = match var("MEDFINDER_DEFAULT_FREQUENCY") {
            None => DEFAULT_FREQUENCY,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "MEDFINDER_DEFAULT_FREQUENCY must be a positive integer, got '{raw}'"
                    ))
                })?,
        };

        let search_limit = match var("MEDFINDER_SEARCH_LIMIT") {
            None => DEFAULT_SEARCH_LIMIT,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .map(|n| n.min(MAX_SEARCH_LIMIT))
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "MEDFINDER_SEARCH_LIMIT must be a positive integer, got '{raw}'"
                    ))
                })?,
        };

        Ok(Self {
            transport,
            http_addr,
            catalog_path,
            localities_path,
            partner_feed_urls,
            default_frequency,
            search_limit,
        })
    }
}

fn existing_path(value: Option<String>, name: &str) -> Result<Option<PathBuf>, AppError> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let path = Path::new(raw.trim()).to_path_buf();
    if !path.exists() {
        return Err(AppError::Config(format!(
            "{name} points to a missing file: {}",
            path.display()
        )));
    }
    Ok(Some(path))
}
