/// HTTP client for partner offer feeds.
///
/// A partner feed is a JSON array of `PartnerListing` rows published by a pharmacy or
/// online dispensing partner. Feeds are fetched once at startup; transient failures are
/// retried with exponential backoff and jitter, and callers decide how to degrade when a
/// feed stays unavailable.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::api::PartnerListing;
use crate::error::CommonError;

#[derive(Clone, Debug)]
pub struct PartnerFeedConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for PartnerFeedConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2_000),
            max_error_body_bytes: 4 * 1024,
        }
    }
}

impl PartnerFeedConfig {
    /// Optional:
    /// - `PARTNER_FEED_TIMEOUT_SECS` (default: 8)
    /// - `PARTNER_FEED_MAX_RETRIES` (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout = std::env::var("PARTNER_FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = std::env::var("PARTNER_FEED_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        Self {
            timeout,
            max_retries,
            ..defaults
        }
    }
}

#[derive(Clone)]
pub struct PartnerFeedClient {
    config: PartnerFeedConfig,
    http: reqwest::Client,
}

impl PartnerFeedClient {
    pub fn new(config: PartnerFeedConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("medicine-finder/partner-feed")
            .build()?;
        Ok(Self { config, http })
    }

    /// Fetch and decode a single feed.
    pub async fn fetch_listings(&self, url: &str) -> Result<Vec<PartnerListing>, CommonError> {
        self.request_with_retry(|| async {
            let resp = self
                .http
                .get(url)
                .timeout(self.config.timeout)
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
                return Err(CommonError::Upstream { status, body });
            }
            let bytes = resp.bytes().await?;
            Ok(serde_json::from_slice::<Vec<PartnerListing>>(&bytes)?)
        })
        .await
    }

    /// Fetch every feed concurrently and concatenate the listings in URL order.
    ///
    /// Feeds that fail after retries are logged and skipped; an empty result means no
    /// feed produced data.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<PartnerListing> {
        let results = join_all(urls.iter().map(|url| self.fetch_listings(url))).await;

        let mut listings = Vec::new();
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(mut rows) => {
                    info!(url = %url, listings = rows.len(), "partner feed loaded");
                    listings.append(&mut rows);
                }
                Err(e) => warn!(url = %url, error = %e, "partner feed unavailable, skipping"),
            }
        }
        listings
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CommonError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "partner feed request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn should_retry(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
        CommonError::Upstream { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        CommonError::InvalidJson(_) => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .subsec_nanos() as u64;
    nanos % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read partner feed error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListingKind;

    #[test]
    fn backoff_grows_and_is_capped() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);

        let first = backoff_delay(initial, max, 0);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));

        let third = backoff_delay(initial, max, 2);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));

        let capped = backoff_delay(initial, max, 40);
        assert!(capped >= max && capped <= Duration::from_millis(1_250));
    }

    #[test]
    fn retries_only_transient_upstream_statuses() {
        let busy = CommonError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let down = CommonError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        let missing = CommonError::Upstream {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(should_retry(&busy));
        assert!(should_retry(&down));
        assert!(!should_retry(&missing));

        let bad_json = serde_json::from_str::<Vec<PartnerListing>>("{").unwrap_err();
        assert!(!should_retry(&CommonError::InvalidJson(bad_json)));
    }

    #[test]
    fn listing_defaults_apply_when_fields_missing() {
        let json = r#"[{"partner":"CareKart","kind":"online","locality":"online-us","address":"Nationwide"}]"#;
        let rows: Vec<PartnerListing> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, ListingKind::Online);
        assert_eq!(rows[0].price_multiplier, 1.0);
        assert!(rows[0].distance_km.is_none());
        assert!(rows[0].url.is_none());
    }
}
