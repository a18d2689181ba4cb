// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for driving the faucet gate router end to end.
//!
//! Ledger, captcha service and payout are replaced by scripted fakes so the
//! tests control nonces, verification results and handler outcomes.

#![allow(dead_code)]

pub mod generators;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use faucet_gate::{
    captcha::{CaptchaError, CaptchaGate, CaptchaVerifier, CAPTCHA_HEADER},
    config::Config,
    faucet::{FaucetError, Payout},
    handlers::{router, AppState, MessageResponse},
    ledger::{LedgerClient, LedgerError},
    limiter::{LimiterStore, RateLimiter},
    metrics::GateMetrics,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const FUNDING_ACCOUNT: &str = "0x00000000000000000000000000000000000000fa";
pub const GOOD_TOKEN: &str = "10000000-aaaa-bbbb-cccc-000000000001";

/// Ledger returning a settable pending nonce.
#[derive(Default)]
pub struct ScriptedLedger {
    pub nonce: AtomicU64,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn pending_nonce(&self, _address: &str) -> Result<u64, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("node offline".to_string()));
        }
        Ok(self.nonce.load(Ordering::SeqCst))
    }
}

/// Captcha service accepting only [`GOOD_TOKEN`].
#[derive(Default)]
pub struct ScriptedVerifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CaptchaVerifier for ScriptedVerifier {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(token == GOOD_TOKEN)
    }
}

/// Payout recording recipients; can be switched to fail.
#[derive(Default)]
pub struct ScriptedPayout {
    pub fail: AtomicBool,
    pub recipients: Mutex<Vec<String>>,
}

#[async_trait]
impl Payout for ScriptedPayout {
    fn account(&self) -> String {
        FUNDING_ACCOUNT.to_string()
    }

    async fn transfer(&self, recipient: &str) -> Result<String, FaucetError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FaucetError::Transfer("insufficient funds".to_string()));
        }
        let mut recipients = self.recipients.lock().unwrap();
        recipients.push(recipient.to_string());
        Ok(format!("0x{:064x}", recipients.len()))
    }
}

/// A router wired to scripted collaborators.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub ledger: Arc<ScriptedLedger>,
    pub verifier: Arc<ScriptedVerifier>,
    pub payout: Arc<ScriptedPayout>,
    pub metrics: GateMetrics,
}

/// A claim as the client would send it.
pub struct ClaimCall<'a> {
    pub address: &'a str,
    pub remote: &'a str,
    pub forwarded_for: Option<&'a str>,
    pub captcha_token: Option<&'a str>,
}

impl<'a> ClaimCall<'a> {
    pub fn new(address: &'a str, remote: &'a str) -> Self {
        Self {
            address,
            remote,
            forwarded_for: None,
            captcha_token: None,
        }
    }

    pub fn forwarded_for(mut self, header: &'a str) -> Self {
        self.forwarded_for = Some(header);
        self
    }

    pub fn captcha(mut self, token: &'a str) -> Self {
        self.captcha_token = Some(token);
        self
    }
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let ledger = Arc::new(ScriptedLedger::default());
        let verifier = Arc::new(ScriptedVerifier::default());
        let payout = Arc::new(ScriptedPayout::default());
        let metrics = GateMetrics::new().unwrap();

        let limiter = RateLimiter::new(
            config.rate_limit.clone(),
            Arc::new(LimiterStore::new()),
            ledger.clone(),
        )
        .with_metrics(metrics.clone());
        let captcha = CaptchaGate::new(
            config.captcha.secret.clone(),
            verifier.clone(),
            config.captcha.verify_timeout(),
        )
        .with_metrics(metrics.clone());

        let state = Arc::new(AppState {
            limiter,
            captcha,
            payout: payout.clone(),
            metrics: metrics.clone(),
            config,
        });

        Self {
            state,
            ledger,
            verifier,
            payout,
            metrics,
        }
    }

    /// Limiter enabled with the given interval, no captcha, no proxies.
    pub fn with_interval(interval_mins: u64) -> Self {
        let mut config = Config::default();
        config.rate_limit.interval_mins = interval_mins;
        Self::new(config)
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub fn store(&self) -> &LimiterStore {
        self.state.limiter.store()
    }

    /// Send a request and decode the `{"message"}` body, if any.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let message = serde_json::from_slice::<MessageResponse>(&bytes)
            .map(|body| body.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        (status, message)
    }

    pub async fn claim(&self, call: ClaimCall<'_>) -> (StatusCode, String) {
        let body = serde_json::json!({ "address": call.address }).to_string();
        self.send(claim_request(&call, body)).await
    }
}

/// Build the claim HTTP request for `call` with an arbitrary body.
pub fn claim_request(call: &ClaimCall<'_>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/claim")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(xff) = call.forwarded_for {
        builder = builder.header("x-forwarded-for", xff);
    }
    if let Some(token) = call.captcha_token {
        builder = builder.header(CAPTCHA_HEADER, token);
    }

    let mut request = builder.body(Body::from(body)).unwrap();
    let remote: SocketAddr = call.remote.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(remote));
    request
}
