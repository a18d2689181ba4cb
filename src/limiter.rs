// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Claim rate limiter with duplicate-claim detection.
//!
//! Per request:
//! 1. Reserve the claimant address and the client address for one interval,
//!    unless either already holds a live record.
//! 2. Fetch the claimant's pending sequence number from the ledger. If it
//!    equals the number seen at the last successful claim, the earlier payout
//!    is still unconfirmed and the request is treated as a duplicate; the
//!    stored number is dropped with the reservation.
//! 3. Run the protected handler. A non-200 outcome releases the reservation,
//!    a 200 stores the fetched sequence number as the new baseline.
//!
//! Step 1 runs under a single mutex so two requests for the same key cannot
//! both pass the check before either writes. The ledger call and the handler
//! run outside it.

use crate::config::RateLimitConfig;
use crate::error::GateError;
use crate::ledger::LedgerClient;
use crate::metrics::{GateMetrics, Outcome};
use crate::store::ExpiringStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Key prefix reserved for nonce records. Claim and client-address keys
/// share the same key space, so nothing else may be stored under it.
pub const NONCE_PREFIX: &str = "nonce-";

/// Values held in the limiter's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheValue {
    /// Rate-limit marker, always stored with a TTL
    Reservation,
    /// Pending sequence number at the last successful claim, no TTL
    Nonce(u64),
}

pub type LimiterStore = ExpiringStore<CacheValue>;

/// Store key holding the nonce baseline for `address`.
pub fn nonce_key(address: &str) -> String {
    format!("{NONCE_PREFIX}{address}")
}

/// Keys reserved for a request that passed the rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub claim: String,
    pub client_addr: String,
}

/// What happened to a reservation once the handler finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Handler succeeded, nonce baseline updated
    Committed,
    /// Handler failed, both keys released
    RolledBack,
}

/// Thread-safe claim limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<LimiterStore>,
    ledger: Arc<dyn LedgerClient>,
    /// Guards the check-both/write-both sequence
    admission: Mutex<()>,
    metrics: Option<GateMetrics>,
}

impl RateLimiter {
    /// Create a limiter over an injected store and ledger client.
    pub fn new(
        config: RateLimitConfig,
        store: Arc<LimiterStore>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            admission: Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: GateMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// A zero interval turns the limiter into a pass-through.
    pub fn is_enabled(&self) -> bool {
        !self.config.ttl().is_zero()
    }

    pub fn proxy_count(&self) -> usize {
        self.config.proxy_count
    }

    pub fn store(&self) -> &Arc<LimiterStore> {
        &self.store
    }

    fn record(&self, outcome: Outcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record(outcome);
        }
    }

    /// Run the full admission sequence around `handler`.
    ///
    /// `handler` produces the protected endpoint's response; its status
    /// decides whether the reservation is kept.
    pub async fn admit<F, Fut>(&self, claim: &str, client_addr: &str, handler: F) -> Response
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Response>,
    {
        if !self.is_enabled() {
            return handler().await;
        }

        let reservation = match self.reserve(claim, client_addr).await {
            Ok(reservation) => reservation,
            Err(err) => return err.into_response(),
        };

        let pending_nonce = match self.screen_nonce(&reservation).await {
            Ok(nonce) => nonce,
            Err(err) => return err.into_response(),
        };

        let response = handler().await;
        self.settle(reservation, pending_nonce, response.status()).await;
        response
    }

    /// Check both keys and, if neither is live, reserve both for one
    /// interval. Checking and writing happen under one lock.
    pub async fn reserve(&self, claim: &str, client_addr: &str) -> Result<Reservation, GateError> {
        let ttl = self.config.ttl();
        let _guard = self.admission.lock().await;

        for key in [claim, client_addr] {
            if let Some((_, retry_after)) = self.store.get_with_ttl(key).await {
                debug!(key, ?retry_after, "Rate limit record present");
                self.record(Outcome::RateLimited);
                return Err(GateError::RateLimited { retry_after });
            }
        }

        self.store
            .put_with_ttl(claim, CacheValue::Reservation, ttl)
            .await;
        self.store
            .put_with_ttl(client_addr, CacheValue::Reservation, ttl)
            .await;

        debug!(address = claim, client_addr, ?ttl, "Reserved claim");
        self.record(Outcome::Admitted);
        Ok(Reservation {
            claim: claim.to_string(),
            client_addr: client_addr.to_string(),
        })
    }

    /// Fetch the pending sequence number and compare it with the stored
    /// baseline. Any rejection releases the reservation.
    pub async fn screen_nonce(&self, reservation: &Reservation) -> Result<u64, GateError> {
        let pending_nonce = match self.fetch_pending_nonce(&reservation.claim).await {
            Some(nonce) => nonce,
            None => {
                self.release(reservation).await;
                self.record(Outcome::LedgerUnavailable);
                return Err(GateError::LedgerUnavailable);
            }
        };

        if let Some(CacheValue::Nonce(cached_nonce)) =
            self.store.get(&nonce_key(&reservation.claim)).await
        {
            if cached_nonce == pending_nonce {
                info!(
                    address = %reservation.claim,
                    nonce = pending_nonce,
                    cached_nonce,
                    "Address nonce same as cached nonce"
                );
                // Drop the baseline too so the next attempt starts fresh.
                self.release(reservation).await;
                self.store.remove(&nonce_key(&reservation.claim)).await;
                self.record(Outcome::Duplicate);
                return Err(GateError::DuplicateClaim);
            }
        }

        Ok(pending_nonce)
    }

    async fn fetch_pending_nonce(&self, address: &str) -> Option<u64> {
        let timeout = self.config.ledger_timeout();
        match tokio::time::timeout(timeout, self.ledger.pending_nonce(address)).await {
            Ok(Ok(nonce)) => Some(nonce),
            Ok(Err(err)) => {
                warn!(address, error = %err, "Pending nonce query failed");
                None
            }
            Err(_) => {
                warn!(address, ?timeout, "Pending nonce query timed out");
                None
            }
        }
    }

    /// Reconcile the reservation with the handler's outcome.
    pub async fn settle(
        &self,
        reservation: Reservation,
        pending_nonce: u64,
        status: StatusCode,
    ) -> Settlement {
        if status != StatusCode::OK {
            debug!(address = %reservation.claim, %status, "Handler failed, releasing reservation");
            self.release(&reservation).await;
            self.record(Outcome::RolledBack);
            return Settlement::RolledBack;
        }

        self.store
            .put(nonce_key(&reservation.claim), CacheValue::Nonce(pending_nonce))
            .await;
        info!(
            address = %reservation.claim,
            client_addr = %reservation.client_addr,
            nonce = pending_nonce,
            "Maximum request limit has been reached"
        );
        self.record(Outcome::Committed);
        Settlement::Committed
    }

    /// Drop both rate-limit records for `reservation`.
    pub async fn release(&self, reservation: &Reservation) {
        self.store.remove(&reservation.claim).await;
        self.store.remove(&reservation.client_addr).await;
    }

    /// Time left on the record for `key`, if any.
    pub async fn remaining(&self, key: &str) -> Option<Duration> {
        self.store.get_with_ttl(key).await.map(|(_, ttl)| ttl)
    }

    /// Drop expired records (should be called periodically).
    pub async fn cleanup(&self) {
        let purged = self.store.purge_expired().await;
        if purged > 0 {
            debug!(purged, "Purged expired rate limit records");
        }
    }
}
