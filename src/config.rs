// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the faucet gate.
//!
//! Only `rate_limit.proxy_count`, `rate_limit.interval_mins` and
//! `captcha.secret` change admission behaviour. Everything else is handed
//! through to the ledger client, the payout handler and the info endpoint.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the faucet gate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen port (default: 8080)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Ledger endpoint and network identity
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Payout configuration
    #[serde(default)]
    pub faucet: FaucetConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Captcha configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// External ledger node the service talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Network identifier shown to users
    #[serde(default = "default_network")]
    pub network: String,
}

/// Payout settings for the protected claim handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Currency symbol, display only
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Amount paid per successful claim, in whole currency units
    #[serde(default = "default_payout")]
    pub payout: f64,

    /// Hex private key of the funding account
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

/// Admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minutes a claimant and client address stay blocked after a claim.
    /// Zero disables the limiter.
    #[serde(default = "default_interval_mins")]
    pub interval_mins: u64,

    /// Number of trusted reverse proxies in front of the service
    #[serde(default)]
    pub proxy_count: usize,

    /// Upper bound on the pending-nonce query, in seconds
    #[serde(default = "default_external_timeout_secs")]
    pub ledger_timeout_secs: u64,
}

/// hCaptcha settings. An empty secret disables the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default)]
    pub site_key: String,

    #[serde(default, skip_serializing)]
    pub secret: String,

    /// Upper bound on the verification call, in seconds
    #[serde(default = "default_external_timeout_secs")]
    pub verify_timeout_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_http_port() -> u16 {
    8080
}

fn default_provider() -> String {
    "http://localhost:8545".to_string()
}

fn default_network() -> String {
    "testnet".to_string()
}

fn default_symbol() -> String {
    "ETH".to_string()
}

fn default_payout() -> f64 {
    1.0
}

fn default_interval_mins() -> u64 {
    1440 // one claim per day
}

fn default_external_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            ledger: LedgerConfig::default(),
            faucet: FaucetConfig::default(),
            rate_limit: RateLimitConfig::default(),
            captcha: CaptchaConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            network: default_network(),
        }
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            payout: default_payout(),
            private_key: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            interval_mins: default_interval_mins(),
            proxy_count: 0,
            ledger_timeout_secs: default_external_timeout_secs(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            site_key: String::new(),
            secret: String::new(),
            verify_timeout_secs: default_external_timeout_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Lifetime of a rate-limit record.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.interval_mins.saturating_mul(60))
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }
}

impl CaptchaConfig {
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to their defaults.
    ///
    /// - `WEB3_PROVIDER`, `NETWORK`, `SYMBOL`, `HTTP_PORT`, `PAYOUT`
    /// - `INTERVAL`: minutes between claims (0 disables limiting)
    /// - `PROXY_COUNT`: trusted reverse proxies
    /// - `HCAPTCHA_SITEKEY`, `HCAPTCHA_SECRET`
    /// - `PRIVATE_KEY`: funding account key
    /// - `EXTERNAL_TIMEOUT_SECS`: bound on ledger and captcha calls
    /// - `METRICS_ENABLED`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // A zero timeout would fail every external call.
        let timeout = parse_var(&lookup, "EXTERNAL_TIMEOUT_SECS")
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or_else(default_external_timeout_secs);

        Config {
            http_port: parse_var(&lookup, "HTTP_PORT").unwrap_or_else(default_http_port),
            ledger: LedgerConfig {
                provider: lookup("WEB3_PROVIDER").unwrap_or_else(default_provider),
                network: lookup("NETWORK").unwrap_or_else(default_network),
            },
            faucet: FaucetConfig {
                symbol: lookup("SYMBOL").unwrap_or_else(default_symbol),
                payout: parse_var(&lookup, "PAYOUT").unwrap_or_else(default_payout),
                private_key: lookup("PRIVATE_KEY").filter(|k| !k.is_empty()),
            },
            rate_limit: RateLimitConfig {
                interval_mins: parse_var(&lookup, "INTERVAL").unwrap_or_else(default_interval_mins),
                proxy_count: parse_var(&lookup, "PROXY_COUNT").unwrap_or(0),
                ledger_timeout_secs: timeout,
            },
            captcha: CaptchaConfig {
                site_key: lookup("HCAPTCHA_SITEKEY").unwrap_or_default(),
                secret: lookup("HCAPTCHA_SECRET").unwrap_or_default(),
                verify_timeout_secs: timeout,
            },
            metrics: MetricsConfig {
                enabled: parse_var(&lookup, "METRICS_ENABLED").unwrap_or_else(default_true),
                ..Default::default()
            },
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
