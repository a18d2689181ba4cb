// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rejections produced by the admission layer itself.

use crate::handlers::render_message;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

/// Why the gate refused a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    /// A live record exists for the claimant or the client address.
    #[error("You have exceeded the rate limit. Please wait {} before you try again", format_wait(.retry_after))]
    RateLimited { retry_after: Duration },

    /// The account's pending sequence number has not moved since its last
    /// successful claim.
    #[error("Please do not make repeated requests.")]
    DuplicateClaim,

    /// The pending sequence number could not be fetched.
    #[error("Unable to verify the account state, please try again later")]
    LedgerUnavailable,

    #[error("Captcha verification failed, please try again")]
    CaptchaFailed,

    /// The connection carried no peer address to key the limit on.
    #[error("Unable to determine the client address")]
    ClientAddressUnknown,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ClientAddressUnknown => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        render_message(self.status(), self.to_string())
    }
}

/// Render a wait time rounded to whole seconds, e.g. `42s`, `1m30s`,
/// `23h59m59s`.
pub fn format_wait(wait: &Duration) -> String {
    let total = wait.saturating_add(Duration::from_millis(500)).as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
