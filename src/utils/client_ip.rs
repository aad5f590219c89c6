//! 클라이언트 IP 해석
//!
//! 레이트 리밋 키와 로그인 이력에 기록할 클라이언트 주소를 결정합니다.
//! `X-Forwarded-For`는 직접 연결한 상대가 신뢰하는 프록시일 때만 따르며,
//! 체인을 오른쪽에서부터 거슬러 올라가 처음 만나는 비신뢰 주소를 클라이언트로 봅니다.

use std::net::IpAddr;

use actix_web::dev::ServiceRequest;
use actix_web::HttpRequest;

const PLACEHOLDERS: [&str; 2] = ["unknown", "-"];

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let value = raw.trim();
    if value.is_empty() || PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p)) {
        return None;
    }
    value.parse().ok()
}

/// 클라이언트 IP를 결정합니다.
///
/// * `peer` - 소켓 상대 주소
/// * `forwarded_for` - `X-Forwarded-For` 헤더 값
/// * `real_ip` - `X-Real-IP` 헤더 값
/// * `trusted_proxies` - 신뢰하는 프록시 주소 목록
///
/// 상대 주소가 없거나 해석할 수 없으면 `"unknown"`을 돌려줍니다.
pub fn resolve_client_ip(
    peer: Option<IpAddr>,
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = peer else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    if let Some(chain) = forwarded_for {
        let hops: Vec<IpAddr> = chain.split(',').filter_map(parse_ip).collect();
        if let Some(client) = hops.iter().rev().find(|ip| !trusted_proxies.contains(ip)) {
            return client.to_string();
        }
        if let Some(first) = hops.first() {
            return first.to_string();
        }
    }

    if let Some(ip) = real_ip.and_then(parse_ip) {
        return ip.to_string();
    }

    peer.to_string()
}

/// `ServiceRequest`에서 클라이언트 IP를 추출합니다. (미들웨어용)
pub fn client_ip_from_service_request(req: &ServiceRequest, trusted_proxies: &[IpAddr]) -> String {
    client_ip_from_http_request(req.request(), trusted_proxies)
}

/// `HttpRequest`에서 클라이언트 IP를 추출합니다. (핸들러용)
pub fn client_ip_from_http_request(req: &HttpRequest, trusted_proxies: &[IpAddr]) -> String {
    let header = |name: &str| req.headers().get(name).and_then(|h| h.to_str().ok());
    resolve_client_ip(
        req.peer_addr().map(|addr| addr.ip()),
        header("X-Forwarded-For"),
        header("X-Real-IP"),
        trusted_proxies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_headers() {
        let resolved = resolve_client_ip(
            Some(ip("203.0.113.9")),
            Some("1.2.3.4"),
            Some("5.6.7.8"),
            &[ip("10.0.0.1")],
        );
        assert_eq!(resolved, "203.0.113.9");
    }

    #[test]
    fn test_trusted_proxy_chain_is_walked_from_the_right() {
        let trusted = [ip("10.0.0.1"), ip("10.0.0.2")];
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            Some("198.51.100.7, 203.0.113.5, 10.0.0.2"),
            None,
            &trusted,
        );
        assert_eq!(resolved, "203.0.113.5");
    }

    #[test]
    fn test_placeholder_values_fall_back() {
        let trusted = [ip("10.0.0.1")];
        let resolved = resolve_client_ip(Some(ip("10.0.0.1")), Some("unknown"), Some("unknown"), &trusted);
        assert_eq!(resolved, "10.0.0.1");

        let resolved = resolve_client_ip(Some(ip("10.0.0.1")), Some("unknown"), Some("198.51.100.1"), &trusted);
        assert_eq!(resolved, "198.51.100.1");
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        assert_eq!(resolve_client_ip(None, Some("1.2.3.4"), None, &[]), "unknown");
    }
}
