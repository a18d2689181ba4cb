// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for admission decisions.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Admission outcome label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Both keys reserved, request moved on to the nonce check
    Admitted,
    RateLimited,
    Duplicate,
    LedgerUnavailable,
    /// Handler succeeded and the nonce baseline was stored
    Committed,
    /// Handler failed and the reservation was released
    RolledBack,
    CaptchaDenied,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::RateLimited => "rate_limited",
            Self::Duplicate => "duplicate",
            Self::LedgerUnavailable => "ledger_unavailable",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::CaptchaDenied => "captcha_denied",
        }
    }
}

/// Registry plus the counters the gate updates.
#[derive(Clone)]
pub struct GateMetrics {
    registry: Registry,
    admissions: IntCounterVec,
}

impl GateMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let admissions = IntCounterVec::new(
            Opts::new("faucet_admission_total", "Admission decisions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(admissions.clone()))?;
        Ok(Self {
            registry,
            admissions,
        })
    }

    pub fn record(&self, outcome: Outcome) {
        self.admissions.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.admissions.with_label_values(&[outcome.as_str()]).get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
