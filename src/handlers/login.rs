use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;

fn header_ip<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// Caller identity. Forwarding headers are client-controlled, so they only count
// when the service sits behind a proxy that overwrites them.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr, trust_proxy_headers: bool) -> String {
    if !trust_proxy_headers {
        return peer.ip().to_string();
    }

    header_ip(headers, "x-forwarded-for")
        .or_else(|| header_ip(headers, "x-real-ip"))
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

pub async fn login_check_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let key = client_key(&headers, peer, state.trust_proxy_headers);
    let check = state.login_guard.check_login_rate_limit(&key).await;

    if check.allowed {
        return Json(check).into_response();
    }

    if check.store_unavailable {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(check)).into_response();
    }

    let mut res = (StatusCode::TOO_MANY_REQUESTS, Json(&check)).into_response();
    if let Some(secs) = check.retry_after {
        res.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    res
}
