// src/api/identity.rs
//! Rate-limit identity of the caller.
//!
//! The peer socket address is the identity. Forwarding headers are client
//! controlled, so they are read only when `trusted_proxy_hops > 0`, and then
//! only the entry appended by the outermost trusted proxy counts.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use super::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Right-most untrusted `X-Forwarded-For` hop. The nearest proxy is the
/// peer; each trusted proxy appended one entry, so the client sits `hops`
/// entries from the right. `None` when the chain is shorter than that.
fn forwarded_client(headers: &HeaderMap, hops: usize) -> Option<String> {
    let chain: Vec<&str> = header_value(headers, "x-forwarded-for")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let idx = chain.len().checked_sub(hops)?;
    chain.get(idx).map(|s| s.to_string())
}

pub fn identify(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_proxy_hops: usize) -> String {
    if trusted_proxy_hops > 0 {
        if let Some(client) = forwarded_client(headers, trusted_proxy_hops) {
            return client;
        }
        if let Some(real) = header_value(headers, "x-real-ip") {
            return real.to_string();
        }
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        Ok(Self(identify(
            &parts.headers,
            peer,
            state.settings.trusted_proxy_hops,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.9:4242".parse().expect("addr")
    }

    fn headers(xff: Option<&'static str>, real: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = xff {
            h.insert("x-forwarded-for", HeaderValue::from_static(v));
        }
        if let Some(v) = real {
            h.insert("x-real-ip", HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn without_trusted_proxies_headers_are_ignored() {
        let h = headers(Some("203.0.113.5"), Some("198.51.100.7"));
        assert_eq!(identify(&h, Some(peer()), 0), "10.0.0.9");
        assert_eq!(identify(&h, None, 0), "unknown");
        assert_eq!(identify(&HeaderMap::new(), None, 0), "unknown");
    }

    #[test]
    fn trusted_hops_pick_rightmost_untrusted_entry() {
        // Client spoofed the first entry; one proxy appended the real address.
        let h = headers(Some(" 6.6.6.6 , 203.0.113.5"), None);
        assert_eq!(identify(&h, Some(peer()), 1), "203.0.113.5");

        // Two proxies: the second one appended the first proxy's address.
        let h = headers(Some("6.6.6.6, 203.0.113.5, 172.16.0.2"), None);
        assert_eq!(identify(&h, Some(peer()), 2), "203.0.113.5");
    }

    #[test]
    fn short_chain_falls_back_to_real_ip_then_peer() {
        let h = headers(Some("203.0.113.5"), Some("198.51.100.7"));
        assert_eq!(identify(&h, Some(peer()), 2), "198.51.100.7");
        let h = headers(Some(" , "), None);
        assert_eq!(identify(&h, Some(peer()), 1), "10.0.0.9");
    }
}
