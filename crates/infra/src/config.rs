use reminder_engine_domain::RetryPolicy;
use std::{str::FromStr, time::Duration};
use tracing::{info, warn};

/// Base url and global api key of the external messaging gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Relay service that performs the browser push protocol
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub url: String,
    pub key: Option<String>,
    pub icon: String,
    pub badge: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// `None` when the gateway has not been configured for this deployment.
    /// Every gateway operation then fails with `GatewayNotConfigured`.
    pub gateway: Option<GatewayConfig>,
    pub push: PushConfig,
    /// Timeout applied to every outbound http call
    pub http_timeout: Duration,
    /// How often a pairing connection is polled
    pub gateway_poll_interval: Duration,
    /// Upper bound on how long a pairing connection is polled
    pub gateway_pairing_window: Duration,
    pub dispatch_interval: Duration,
    /// How often due expansion jobs are looked for
    pub expansion_interval: Duration,
    /// Max reminders handled by one dispatch pass
    pub dispatch_batch_size: usize,
    /// Reminders delivered concurrently within one dispatch pass
    pub dispatch_concurrency: usize,
    /// A claimed reminder older than this is considered abandoned and may be
    /// claimed again
    pub claim_lease_millis: i64,
    /// Occurrences generated per trigger and resource before an expansion
    /// job is stored to continue later
    pub expansion_batch_size: usize,
    /// Occurrences older than now minus this grace are not scheduled
    pub stale_occurrence_grace_millis: i64,
    pub retry_policy: RetryPolicy,
}

impl Config {
    pub fn new() -> Self {
        let port = parse_env("PORT", 5000);

        let gateway = match (
            std::env::var("GATEWAY_BASE_URL"),
            std::env::var("GATEWAY_API_KEY"),
        ) {
            (Ok(base_url), Ok(api_key)) if !base_url.is_empty() && !api_key.is_empty() => {
                match parse_base_url(&base_url) {
                    Some(base_url) => Some(GatewayConfig { base_url, api_key }),
                    None => {
                        warn!("The given GATEWAY_BASE_URL: {} is not a valid http(s) url. The messaging gateway channel is disabled.", base_url);
                        None
                    }
                }
            }
            _ => {
                info!("GATEWAY_BASE_URL or GATEWAY_API_KEY is not set. The messaging gateway channel is disabled.");
                None
            }
        };

        let push = PushConfig {
            url: std::env::var("PUSH_SERVICE_URL").unwrap_or_default(),
            key: std::env::var("PUSH_SERVICE_KEY").ok(),
            icon: std::env::var("PUSH_ICON").unwrap_or_else(|_| "/icon-192.png".into()),
            badge: std::env::var("PUSH_BADGE").unwrap_or_else(|_| "/badge-72.png".into()),
        };
        if push.url.is_empty() {
            info!("PUSH_SERVICE_URL is not set. Push deliveries will fail.");
        }

        Self {
            port,
            gateway,
            push,
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 10)),
            gateway_poll_interval: Duration::from_secs(parse_env("GATEWAY_POLL_INTERVAL_SECS", 3)),
            gateway_pairing_window: Duration::from_secs(parse_env(
                "GATEWAY_PAIRING_WINDOW_SECS",
                120,
            )),
            dispatch_interval: Duration::from_secs(parse_env("DISPATCH_INTERVAL_SECS", 60)),
            expansion_interval: Duration::from_secs(parse_env("EXPANSION_INTERVAL_SECS", 300)),
            dispatch_batch_size: parse_env("DISPATCH_BATCH_SIZE", 200),
            dispatch_concurrency: parse_env("DISPATCH_CONCURRENCY", 10),
            claim_lease_millis: parse_env::<i64>("CLAIM_LEASE_SECS", 300) * 1000,
            expansion_batch_size: parse_env("EXPANSION_BATCH_SIZE", 20),
            stale_occurrence_grace_millis: parse_env::<i64>("STALE_OCCURRENCE_GRACE_SECS", 300)
                * 1000,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated gateway base url without trailing slash
fn parse_base_url(value: &str) -> Option<String> {
    let url = url::Url::parse(value).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.as_str().trim_end_matches('/').to_string())
}

fn parse_env<T: FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
