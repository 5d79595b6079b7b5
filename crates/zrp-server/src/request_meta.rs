//! Pulls the two request-metadata fields every audited mutation threads
//! through (`ip`, `user_agent`) out of the extractors axum already hands
//! handlers, so each route doesn't repeat the boilerplate.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap};

pub fn client_ip(addr: SocketAddr) -> String {
    addr.ip().to_string()
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
