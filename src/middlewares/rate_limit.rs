//! 레이트 리밋 미들웨어
//!
//! 모든 요청의 클라이언트 IP를 신뢰 프록시 규칙으로 결정해 [`ClientIp`]로 저장하고,
//! 경로 등급(AUTH/API)에 맞는 한도를 적용합니다. 헬스 체크는 제외됩니다.
//!
//! 통과한 응답에도 `X-RateLimit-*` 헤더를 붙입니다.

use std::future::{ready, Ready};
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, ResponseError};
use futures_util::future::LocalBoxFuture;

use crate::domain::models::{ClientIp, RateLimitInfo};
use crate::services::security::{tier_for_path, RateLimiter};
use crate::utils::client_ip::client_ip_from_service_request;

pub const LIMIT_MINUTE_HEADER: &str = "x-ratelimit-limit-minute";
pub const LIMIT_HOUR_HEADER: &str = "x-ratelimit-limit-hour";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    trusted_proxies: Arc<Vec<IpAddr>>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>, trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            limiter,
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
    trusted_proxies: Arc<Vec<IpAddr>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let client_ip = client_ip_from_service_request(&req, &self.trusted_proxies);

        Box::pin(async move {
            req.extensions_mut().insert(ClientIp(client_ip.clone()));

            let Some(tier) = tier_for_path(req.path()) else {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            };

            let info = match limiter.check(&client_ip, tier).await {
                Ok(info) => info,
                Err(err) => {
                    let (req, _) = req.into_parts();
                    return Ok(ServiceResponse::new(req, err.error_response()).map_into_right_body());
                }
            };

            let mut res = service.call(req).await?;
            insert_limit_headers(res.headers_mut(), info);
            Ok(res.map_into_left_body())
        })
    }
}

fn insert_limit_headers(headers: &mut actix_web::http::header::HeaderMap, info: RateLimitInfo) {
    headers.insert(HeaderName::from_static(LIMIT_MINUTE_HEADER), HeaderValue::from(info.limit_per_minute));
    headers.insert(HeaderName::from_static(LIMIT_HOUR_HEADER), HeaderValue::from(info.limit_per_hour));
    headers.insert(HeaderName::from_static(REMAINING_HEADER), HeaderValue::from(info.remaining));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};

    use crate::config::TierLimits;
    use crate::repositories::rate_limit::InMemoryRateLimitStore;
    use crate::utils::clock::ManualClock;

    async fn echo_ip(req: HttpRequest) -> HttpResponse {
        let ip = req.extensions().get::<ClientIp>().map(|ip| ip.0.clone()).unwrap_or_default();
        HttpResponse::Ok().body(ip)
    }

    fn limiter() -> Arc<RateLimiter> {
        let clock = Arc::new(ManualClock::starting_now());
        Arc::new(RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new(clock.clone())),
            TierLimits { per_minute: 2, per_hour: 20 },
            TierLimits { per_minute: 60, per_hour: 1000 },
            clock,
        ))
    }

    #[actix_web::test]
    async fn test_auth_tier_is_limited_with_headers() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(), vec![]))
                .route("/api/v1/auth/login", web::post().to(echo_ip)),
        )
        .await;

        for expected_remaining in ["1", "0"] {
            let req = test::TestRequest::post().uri("/api/v1/auth/login").to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 200);
            assert_eq!(resp.headers().get(REMAINING_HEADER).unwrap(), expected_remaining);
            assert_eq!(resp.headers().get(LIMIT_MINUTE_HEADER).unwrap(), "2");
        }

        let req = test::TestRequest::post().uri("/api/v1/auth/login").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 429);
        assert_eq!(resp.headers().get(LIMIT_HOUR_HEADER).unwrap(), "20");
        assert_eq!(resp.headers().get(REMAINING_HEADER).unwrap(), "0");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");
    }

    #[actix_web::test]
    async fn test_health_is_exempt() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(), vec![]))
                .route("/health", web::get().to(echo_ip)),
        )
        .await;

        for _ in 0..100 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
            assert_eq!(resp.status(), 200);
            assert!(resp.headers().get(REMAINING_HEADER).is_none());
        }
    }

    #[actix_web::test]
    async fn test_client_ip_honors_trusted_proxy() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(), vec![proxy]))
                .route("/api/v1/things", web::get().to(echo_ip)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/things")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "198.51.100.9"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(test::read_body(resp).await, "198.51.100.9");

        let req = test::TestRequest::get()
            .uri("/api/v1/things")
            .peer_addr("203.0.113.5:4000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "198.51.100.9"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(test::read_body(resp).await, "203.0.113.5");
    }
}
