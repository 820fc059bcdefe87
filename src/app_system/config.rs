//! Runtime configuration from environment variables.

use std::env;
use std::net::IpAddr;
use std::time::Duration;

/// Settings for the whole order system.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PortOne REST base URL
    pub portone_api_base: String,

    /// PortOne API secret, sent as `Authorization: PortOne <secret>`
    pub portone_api_secret: String,

    /// Source addresses accepted by the webhook
    pub allowed_webhook_ips: Vec<IpAddr>,

    /// Channel capacity of every actor and the cancellation queue
    pub actor_buffer: usize,

    pub gateway_timeout: Duration,

    pub cancellation_max_attempts: u32,

    /// Pause between retries of a failed cancellation
    pub cancellation_backoff: Duration,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portone_api_base: "https://api.portone.io".to_string(),
            portone_api_secret: String::new(),
            allowed_webhook_ips: Vec::new(),
            actor_buffer: 32,
            gateway_timeout: Duration::from_secs(10),
            cancellation_max_attempts: 3,
            cancellation_backoff: Duration::from_millis(500),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORTONE_API_BASE`: gateway base URL (default: https://api.portone.io)
    /// - `PORTONE_API_SECRET`: gateway secret (default: empty)
    /// - `ALLOWED_WEBHOOK_IPS`: comma-separated webhook allow-list (default: empty)
    /// - `MALL_ACTOR_BUFFER`: actor channel capacity (default: 32)
    /// - `MALL_GATEWAY_TIMEOUT_SECS`: gateway request timeout (default: 10)
    /// - `MALL_CANCEL_MAX_ATTEMPTS`: attempts per queued cancellation (default: 3)
    /// - `MALL_CANCEL_BACKOFF_MS`: delay between attempts (default: 500)
    /// - `RUST_LOG`: log filter (default: info)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            portone_api_base: env::var("PORTONE_API_BASE").unwrap_or(defaults.portone_api_base),

            portone_api_secret: env::var("PORTONE_API_SECRET").unwrap_or(defaults.portone_api_secret),

            allowed_webhook_ips: env::var("ALLOWED_WEBHOOK_IPS")
                .map(|v| parse_ip_list(&v))
                .unwrap_or(defaults.allowed_webhook_ips),

            actor_buffer: env::var("MALL_ACTOR_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.actor_buffer),

            gateway_timeout: env::var("MALL_GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.gateway_timeout),

            cancellation_max_attempts: env::var("MALL_CANCEL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cancellation_max_attempts),

            cancellation_backoff: env::var("MALL_CANCEL_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.cancellation_backoff),

            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

/// Parses a comma-separated address list, skipping entries that are not IPs.
pub fn parse_ip_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(entry, "Ignoring invalid webhook address");
                None
            }
        })
        .collect()
}
