// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Faucet Gate Service
//!
//! Serves a token faucet behind a captcha gate and a claim rate limiter.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! read first if present):
//!
//! - `WEB3_PROVIDER`: ledger JSON-RPC endpoint (default: http://localhost:8545)
//! - `PRIVATE_KEY`: funding account key (required)
//! - `HTTP_PORT`: listen port (default: 8080)
//! - `INTERVAL`: minutes between claims per address/IP (default: 1440)
//! - `PROXY_COUNT`: trusted reverse proxies (default: 0)
//! - `HCAPTCHA_SITEKEY` / `HCAPTCHA_SECRET`: enable the captcha gate

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faucet_gate::{
    captcha::{CaptchaGate, HCaptchaVerifier},
    config::Config,
    faucet::EthPayout,
    handlers::{router, AppState},
    ledger::EthLedgerClient,
    limiter::{LimiterStore, RateLimiter},
    metrics::GateMetrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    info!(
        http_port = config.http_port,
        provider = %config.ledger.provider,
        network = %config.ledger.network,
        interval_mins = config.rate_limit.interval_mins,
        proxy_count = config.rate_limit.proxy_count,
        captcha = !config.captcha.secret.is_empty(),
        "Starting faucet gate"
    );

    let private_key = config
        .faucet
        .private_key
        .clone()
        .context("PRIVATE_KEY must be set")?;

    // Create application state
    let metrics = GateMetrics::new()?;
    let ledger = Arc::new(EthLedgerClient::new(&config.ledger.provider)?);
    let payout =
        Arc::new(EthPayout::connect(&config.ledger.provider, &private_key, config.faucet.payout).await?);

    let limiter = RateLimiter::new(
        config.rate_limit.clone(),
        Arc::new(LimiterStore::new()),
        ledger,
    )
    .with_metrics(metrics.clone());

    let verifier = Arc::new(HCaptchaVerifier::new(
        config.captcha.secret.clone(),
        config.captcha.site_key.clone(),
    ));
    let captcha = CaptchaGate::new(
        config.captcha.secret.clone(),
        verifier,
        config.captcha.verify_timeout(),
    )
    .with_metrics(metrics.clone());

    let state = Arc::new(AppState {
        limiter,
        captcha,
        payout,
        metrics,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
