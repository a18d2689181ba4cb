// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proxy-aware client address resolution.
//!
//! Each trusted reverse proxy appends the peer it saw to `X-Forwarded-For`.
//! With `proxy_count` trusted hops, the entry `proxy_count` places from the
//! end was written by the outermost trusted proxy. Anything to its left may
//! have been supplied by the client and is ignored.

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the address used as the client's rate-limit key.
pub fn resolve(proxy_count: usize, forwarded_for: Option<&str>, remote_addr: &str) -> String {
    if proxy_count > 0 {
        if let Some(header) = forwarded_for.filter(|h| !h.is_empty()) {
            let parts: Vec<&str> = header.split(',').collect();
            let index = parts.len().saturating_sub(proxy_count);
            return parts[index].trim().to_string();
        }
    }

    host_of(remote_addr).to_string()
}

/// `X-Forwarded-For` value, if present and valid UTF-8.
pub fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

/// Strip the port from `host:port` or `[host]:port`. Values without a port
/// come back unchanged.
fn host_of(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, port)) = rest.split_once("]:") {
            if !port.contains(':') {
                return host;
            }
        }
        return addr;
    }

    // Exactly one colon means host:port; more is a bare IPv6 literal.
    match addr.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const CHAIN: &str = "1.1.1.1, 2.2.2.2, 3.3.3.3";

    #[test]
    fn test_proxy_count_selects_trusted_hop() {
        assert_eq!(resolve(2, Some(CHAIN), "9.9.9.9:1234"), "2.2.2.2");
        assert_eq!(resolve(1, Some(CHAIN), "9.9.9.9:1234"), "3.3.3.3");
    }

    #[test]
    fn test_proxy_count_larger_than_chain_clamps_to_first() {
        assert_eq!(resolve(5, Some(CHAIN), "9.9.9.9:1234"), "1.1.1.1");
    }

    #[test]
    fn test_zero_proxies_ignores_header() {
        assert_eq!(resolve(0, Some(CHAIN), "9.9.9.9:1234"), "9.9.9.9");
    }

    #[test]
    fn test_missing_or_empty_header_uses_remote() {
        assert_eq!(resolve(2, None, "9.9.9.9:1234"), "9.9.9.9");
        assert_eq!(resolve(2, Some(""), "9.9.9.9:1234"), "9.9.9.9");
    }

    #[test]
    fn test_spoofed_prefix_is_ignored() {
        // Client forged two entries before reaching our single proxy.
        let header = "6.6.6.6, 7.7.7.7, 203.0.113.9";
        assert_eq!(resolve(1, Some(header), "10.0.0.2:80"), "203.0.113.9");
    }

    #[test]
    fn test_remote_host_port_forms() {
        assert_eq!(host_of("192.168.1.10:8080"), "192.168.1.10");
        assert_eq!(host_of("[2001:db8::1]:443"), "2001:db8::1");
        assert_eq!(host_of("localhost:3000"), "localhost");
    }

    #[test]
    fn test_remote_without_port_returned_unchanged() {
        assert_eq!(host_of("192.168.1.10"), "192.168.1.10");
        assert_eq!(host_of("2001:db8::1"), "2001:db8::1");
        assert_eq!(host_of("@unix-socket"), "@unix-socket");
        assert_eq!(host_of(""), "");
    }

    #[test]
    fn test_forwarded_for_header_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_for(&headers), None);

        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("   "));
        assert_eq!(forwarded_for(&headers), None);

        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(CHAIN));
        assert_eq!(forwarded_for(&headers), Some(CHAIN));
    }
}
