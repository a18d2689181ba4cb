// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

/// Generate `count` distinct peer socket addresses in 10.0.0.0/8.
pub fn generate_remotes(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{a}.{b}.{c}:{}", 40_000 + (i % 20_000))
        })
        .collect()
}

/// Generate `count` distinct, well-formed account addresses.
pub fn generate_addresses(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("0x{:040x}", i + 1)).collect()
}

/// Generate forged `X-Forwarded-For` prefixes an attacker might send.
pub fn generate_forged_prefixes(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("192.0.2.{}, 198.51.100.{}", i % 256, (i * 7) % 256))
        .collect()
}

/// Bodies that must be rejected before the limiter runs.
pub fn generate_malformed_bodies() -> Vec<&'static str> {
    vec![
        "",
        "{",
        "[]",
        "{\"address\": 7}",
        "{\"address\": \"\"}",
        "{\"address\": \"0x123\"}",
        "{\"address\": \"not-an-address-at-all-not-an-address-at\"}",
        "{\"address\": \"nonce-0x0000000000000000000000000000000001\"}",
    ]
}
