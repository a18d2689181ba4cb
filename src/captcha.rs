// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! hCaptcha gate placed in front of the rate limiter.
//!
//! Unverified traffic is rejected here so it never takes a rate-limit slot.

use crate::metrics::{GateMetrics, Outcome};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Header carrying the client's captcha token.
pub const CAPTCHA_HEADER: &str = "h-captcha-response";

pub const HCAPTCHA_VERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";

/// Captcha verification error types.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Captcha service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Captcha service returned {0}")]
    Status(reqwest::StatusCode),
}

/// Remote token verification.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(true)` iff the service accepted `token`.
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// hCaptcha `siteverify` client.
pub struct HCaptchaVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
    site_key: String,
}

impl HCaptchaVerifier {
    pub fn new(secret: String, site_key: String) -> Self {
        Self::with_endpoint(HCAPTCHA_VERIFY_URL.to_string(), secret, site_key)
    }

    pub fn with_endpoint(endpoint: String, secret: String, site_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            secret,
            site_key,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for HCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if !self.site_key.is_empty() {
            form.push(("sitekey", self.site_key.as_str()));
        }

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(CaptchaError::Status(response.status()));
        }

        let result: SiteVerifyResponse = response.json().await?;
        if !result.success {
            debug!(error_codes = ?result.error_codes, "Captcha token rejected");
        }
        Ok(result.success)
    }
}

/// Outcome of the captcha check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaDecision {
    Allow,
    Deny,
}

/// Challenge-response gate. An empty secret disables it.
pub struct CaptchaGate {
    secret: String,
    verifier: Arc<dyn CaptchaVerifier>,
    timeout: Duration,
    metrics: Option<GateMetrics>,
}

impl CaptchaGate {
    pub fn new(secret: String, verifier: Arc<dyn CaptchaVerifier>, timeout: Duration) -> Self {
        Self {
            secret,
            verifier,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: GateMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Verify `token`. Verification errors and timeouts deny.
    pub async fn check(&self, token: &str) -> CaptchaDecision {
        if !self.is_enabled() {
            return CaptchaDecision::Allow;
        }

        let verified = match tokio::time::timeout(self.timeout, self.verifier.verify(token)).await {
            Ok(Ok(success)) => success,
            Ok(Err(err)) => {
                warn!(error = %err, "Captcha verification failed");
                false
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Captcha verification timed out");
                false
            }
        };

        if verified {
            CaptchaDecision::Allow
        } else {
            if let Some(metrics) = &self.metrics {
                metrics.record(Outcome::CaptchaDenied);
            }
            CaptchaDecision::Deny
        }
    }
}
