//! CSRF 검증 미들웨어
//!
//! 상태를 바꾸는 메서드(POST/PUT/PATCH/DELETE)에 `X-CSRF-TOKEN` 헤더를 요구합니다.
//! subject는 [`AuthMiddleware`](crate::middlewares::AuthMiddleware)가 넣어 둔 인증 정보에서만 가져오므로,
//! 반드시 인증 미들웨어 안쪽에 등록해야 합니다. 인증 정보가 없으면 거부합니다.
//!
//! ```rust,ignore
//! web::scope("/api/v1/sessions")
//!     .wrap(CsrfMiddleware::new(csrf_guard))
//!     .wrap(AuthMiddleware::new(auth_service))
//! ```

use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::Method;
use actix_web::{Error, HttpMessage, ResponseError};
use futures_util::future::LocalBoxFuture;

use crate::domain::models::AuthenticatedUser;
use crate::errors::AppError;
use crate::services::security::{CsrfGuard, CSRF_HEADER};

pub struct CsrfMiddleware {
    guard: Arc<CsrfGuard>,
}

impl CsrfMiddleware {
    pub fn new(guard: Arc<CsrfGuard>) -> Self {
        Self { guard }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfMiddlewareService {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct CsrfMiddlewareService<S> {
    service: Rc<S>,
    guard: Arc<CsrfGuard>,
}

fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

impl<S, B> Service<ServiceRequest> for CsrfMiddlewareService<S>
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
        let guard = self.guard.clone();

        Box::pin(async move {
            if is_state_changing(req.method()) {
                let subject = req.extensions().get::<AuthenticatedUser>().map(|user| user.subject.clone());
                let supplied = req
                    .headers()
                    .get(CSRF_HEADER)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string);

                if !guard.validate(subject.as_deref(), supplied.as_deref()).await {
                    log::warn!(
                        "CSRF 검증 실패: {} {}, subject={}",
                        req.method(),
                        req.path(),
                        subject.as_deref().unwrap_or("-")
                    );
                    let err = AppError::CsrfTokenInvalid("CSRF 토큰이 유효하지 않습니다".to_string());
                    let (req, _) = req.into_parts();
                    return Ok(ServiceResponse::new(req, err.error_response()).map_into_right_body());
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use chrono::Duration;

    use crate::repositories::csrf::InMemoryCsrfTokenStore;
    use crate::utils::clock::SystemClock;

    fn guard() -> Arc<CsrfGuard> {
        Arc::new(CsrfGuard::new(
            Arc::new(InMemoryCsrfTokenStore::new(Arc::new(SystemClock))),
            Duration::minutes(120),
        ))
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            subject: "alice".to_string(),
            user_id: 1,
            role: None,
            session_id: None,
            access_token: "token".to_string(),
        }
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_mutating_request_requires_matching_token() {
        let guard = guard();
        let token = guard.issue_token("alice").await.unwrap();
        let app = test::init_service(
            App::new()
                .wrap(CsrfMiddleware::new(guard.clone()))
                .route("/things", web::post().to(ok))
                .route("/things", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/things")
            .insert_header((CSRF_HEADER, token.as_str()))
            .to_request();
        req.extensions_mut().insert(alice());
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/things")
            .insert_header((CSRF_HEADER, "forged"))
            .to_request();
        req.extensions_mut().insert(alice());
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "CSRF_TOKEN_INVALID");

        let req = test::TestRequest::get().uri("/things").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn test_unauthenticated_request_fails_closed() {
        let guard = guard();
        let token = guard.issue_token("alice").await.unwrap();
        let app = test::init_service(
            App::new()
                .wrap(CsrfMiddleware::new(guard))
                .route("/things", web::delete().to(ok)),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/things")
            .insert_header((CSRF_HEADER, token.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }
}
