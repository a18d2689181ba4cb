// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Claim request parsing.
//!
//! The claim body is JSON: `{"address": "0x..."}`. The body is buffered so
//! the address can be read by the gate and again by the payout handler.

use crate::handlers::render_message;
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;
use tracing::debug;

/// Largest accepted claim body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A request that could not be turned into a claim. Carries the status
/// and message returned to the client verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct MalformedRequest {
    pub status: StatusCode,
    pub message: String,
}

impl MalformedRequest {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for MalformedRequest {
    fn into_response(self) -> Response {
        render_message(self.status, self.message)
    }
}

/// Parsed claim body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

/// Parse and validate a claim from its content type and raw body.
pub fn parse_claim(content_type: Option<&str>, body: &[u8]) -> Result<ClaimRequest, MalformedRequest> {
    if let Some(ct) = content_type {
        let media_type = ct.split(';').next().unwrap_or(ct).trim();
        if !media_type.eq_ignore_ascii_case("application/json") {
            return Err(MalformedRequest::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type header is not application/json",
            ));
        }
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(MalformedRequest::bad_request("Request body must not be empty"));
    }

    let claim: ClaimRequest = serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "Claim body rejected");
        match err.classify() {
            Category::Syntax | Category::Eof => MalformedRequest::bad_request(format!(
                "Request body contains badly-formed JSON (at line {} column {})",
                err.line(),
                err.column()
            )),
            Category::Data | Category::Io => {
                MalformedRequest::bad_request(format!("Request body contains an invalid value: {err}"))
            }
        }
    })?;

    if !is_hex_address(&claim.address) {
        return Err(MalformedRequest::bad_request("invalid address"));
    }
    Ok(claim)
}

/// Buffer the request body, parse the claim, and hand back a request whose
/// body can be read again.
pub async fn read_claim(request: Request) -> Result<(ClaimRequest, Request), MalformedRequest> {
    let (parts, body) = request.into_parts();
    let bytes = buffer_body(body).await?;
    let claim = parse_claim(content_type(&parts.headers), &bytes)?;
    Ok((claim, Request::from_parts(parts, Body::from(bytes))))
}

async fn buffer_body(body: Body) -> Result<Bytes, MalformedRequest> {
    axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| {
            if err.into_inner().is::<LengthLimitError>() {
                MalformedRequest::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body must not be larger than 1MB",
                )
            } else {
                MalformedRequest::bad_request("Request body could not be read")
            }
        })
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

/// 20-byte hex account address, with or without a `0x` prefix.
pub fn is_hex_address(address: &str) -> bool {
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}
