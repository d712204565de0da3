//! Client identity and limiter key construction.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;

pub const UNKNOWN_CLIENT: &str = "unknown";

const MAX_IP_LEN: usize = 64;

// Accept only things shaped like an IPv4/IPv6 literal (or a hostname-ish token)
fn normalize(raw: &str) -> Option<String> {
    let ip = raw.trim();
    if ip.is_empty() || ip.len() > MAX_IP_LEN {
        return None;
    }
    if ip
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
    {
        Some(ip.to_string())
    } else {
        None
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    // X-Forwarded-For: client, proxy1, proxy2
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = xff.split(',').next().and_then(normalize) {
            return Some(ip);
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(normalize)
}

/// Resolves the caller's address: forwarded headers first (when trusted),
/// then the socket peer, then [`UNKNOWN_CLIENT`].
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub fn limit_key(namespace: &str, ip: &str) -> String {
    format!("{namespace}:{ip}")
}

pub fn resource_key(namespace: &str, ip: &str, resource: &str) -> String {
    format!("{namespace}:{ip}:{resource}")
}

/// Extractor wrapper around [`client_ip`]. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_ip(
            &parts.headers,
            peer,
            state.config.trust_forwarded,
        )))
    }
}
