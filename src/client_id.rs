/// Best-effort client identification for admission control
use axum::http::HeaderMap;
use std::net::IpAddr;

/// Grouping bucket for requests carrying no identifying information at all.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives a grouping key for the calling client: the first address in the
/// forwarded chain when present, otherwise the transport peer address,
/// otherwise a shared sentinel bucket. The value is an opaque key; no
/// address-format validation is performed.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}
