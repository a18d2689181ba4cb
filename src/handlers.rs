// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and middleware for the faucet gate.
//!
//! `POST /api/claim` passes through the captcha gate, then the rate limiter,
//! then the payout handler. Every response body is `{"message": "..."}`.

use crate::captcha::{CaptchaDecision, CaptchaGate, CAPTCHA_HEADER};
use crate::claim::{read_claim, ClaimRequest};
use crate::client_addr;
use crate::config::Config;
use crate::error::GateError;
use crate::faucet::Payout;
use crate::limiter::RateLimiter;
use crate::metrics::GateMetrics;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub captcha: CaptchaGate,
    pub payout: Arc<dyn Payout>,
    pub metrics: GateMetrics,
    pub config: Config,
}

/// Body of every gate and claim response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Public faucet parameters for the frontend.
#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub account: String,
    pub network: String,
    pub symbol: String,
    pub payout: f64,
    pub hcaptcha_sitekey: String,
}

/// JSON `{"message": ...}` with the given status.
pub fn render_message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(MessageResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    // Layers wrap outside-in: the captcha gate runs before the limiter.
    let claim_route = post(claim)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), captcha_gate));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/info", get(info))
        .route("/api/claim", claim_route);

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "faucet-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Faucet parameters endpoint.
pub async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        account: state.payout.account(),
        network: state.config.ledger.network.clone(),
        symbol: state.config.faucet.symbol.clone(),
        payout: state.config.faucet.payout,
        hcaptcha_sitekey: state.config.captcha.site_key.clone(),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Protected handler: pay out to the claimant placed in the request
/// extensions by [`rate_limit`].
pub async fn claim(
    State(state): State<Arc<AppState>>,
    Extension(claim): Extension<ClaimRequest>,
) -> Response {
    match state.payout.transfer(&claim.address).await {
        Ok(tx_hash) => render_message(StatusCode::OK, format!("Txhash: {tx_hash}")),
        Err(err) => {
            warn!(address = %claim.address, error = %err, "Payout failed");
            render_message(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Captcha middleware. The token travels in the `h-captcha-response` header.
pub async fn captcha_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(CAPTCHA_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.captcha.check(token).await {
        CaptchaDecision::Allow => next.run(request).await,
        CaptchaDecision::Deny => {
            debug!("Captcha denied claim");
            GateError::CaptchaFailed.into_response()
        }
    }
}

/// Rate-limit middleware wrapping the protected claim handler.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (claim, mut request) = match read_claim(request).await {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    // Without a peer address every such request would share one key.
    let remote_addr = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.to_string(),
        None => {
            warn!("No peer address on request");
            return GateError::ClientAddressUnknown.into_response();
        }
    };
    let client_addr = client_addr::resolve(
        state.limiter.proxy_count(),
        client_addr::forwarded_for(request.headers()),
        &remote_addr,
    );

    request.extensions_mut().insert(claim.clone());
    state
        .limiter
        .admit(&claim.address, &client_addr, move || next.run(request))
        .await
}
