// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Faucet Gate
//!
//! Admission layer for a public token faucet. A claim request passes:
//!
//! - hCaptcha verification (skipped when no secret is configured)
//! - Per-claimant and per-client-address rate limiting with a fixed interval
//! - Duplicate-claim detection from the claimant's pending ledger nonce
//!
//! before the payout handler runs. The handler's status decides whether the
//! rate-limit reservation is kept or released.

pub mod captcha;
pub mod claim;
pub mod client_addr;
pub mod config;
pub mod error;
pub mod faucet;
pub mod handlers;
pub mod ledger;
pub mod limiter;
pub mod metrics;
pub mod store;

pub use config::Config;
pub use error::GateError;
pub use limiter::{RateLimiter, Settlement};
pub use store::ExpiringStore;
