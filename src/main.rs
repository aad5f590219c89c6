//! Hamalog 인증 서비스 메인 애플리케이션
//!
//! 설정을 읽고 저장소에 연결한 뒤 [`AppContainer`]로 서비스 그래프를 조립하고
//! Actix-web HTTP 서버를 구동합니다.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};

use hamalog_auth::caching::redis::RedisClient;
use hamalog_auth::config::{JwtConfig, PasswordConfig, ServerConfig, StorageBackend, StorageConfig};
use hamalog_auth::core::AppContainer;
use hamalog_auth::db::Database;
use hamalog_auth::domain::entities::Member;
use hamalog_auth::errors::{AppError, ErrorContext};
use hamalog_auth::middlewares::rate_limit::{LIMIT_HOUR_HEADER, LIMIT_MINUTE_HEADER, REMAINING_HEADER};
use hamalog_auth::middlewares::RateLimitMiddleware;
use hamalog_auth::routes::configure_all_routes;
use hamalog_auth::utils::clock::SystemClock;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    load_env_file();
    init_logging();

    info!("🚀 Hamalog 인증 서비스 시작중...");

    let container = match build_container().await {
        Ok(container) => Arc::new(container),
        Err(e) => {
            error!("서비스 초기화 실패: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    info!("✅ 모든 서비스가 성공적으로 초기화되었습니다!");

    container.spawn_maintenance(ServerConfig::maintenance_interval());

    start_http_server(container).await
}

/// HTTP 서버를 구성하고 실행합니다
///
/// 미들웨어는 아래에서 위 순서로 감싸지므로, 요청은 경로 정규화 → 로깅 → CORS → 레이트 리밋 순으로 지납니다.
async fn start_http_server(container: Arc<AppContainer>) -> std::io::Result<()> {
    let bind_address = format!("{}:{}", ServerConfig::host(), ServerConfig::port());

    info!("🌐 서버가 http://{} 에서 실행중입니다", bind_address);
    info!("📍 Health check: http://{}/health", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(
                container.rate_limiter.clone(),
                container.trusted_proxies.clone(),
            ))
            .wrap(configure_cors())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(|cfg| configure_all_routes(cfg, &container))
    })
    .bind(bind_address)?
    .workers(ServerConfig::workers())
    .run()
    .await
}

/// 설정된 백엔드로 컨테이너를 만듭니다. 서명 키가 없으면 즉시 실패합니다.
async fn build_container() -> Result<AppContainer, AppError> {
    let secret = JwtConfig::secret()?;

    match StorageConfig::backend() {
        StorageBackend::MongoRedis => {
            info!("📡 데이터베이스 연결 중...");
            let database = Database::connect(&StorageConfig::mongodb_uri(), &StorageConfig::database_name()).await?;
            let redis = RedisClient::connect(&StorageConfig::redis_url()).await?;

            AppContainer::build_mongo_redis(&database, redis, Arc::new(SystemClock)).await
        }
        StorageBackend::Memory => {
            warn!("메모리 저장소로 실행합니다. 재시작하면 모든 데이터가 사라집니다");
            let container = AppContainer::build_in_memory(&secret)?;
            seed_demo_member(&container)?;
            Ok(container)
        }
    }
}

/// `DEMO_LOGIN_ID`/`DEMO_PASSWORD`가 있으면 메모리 저장소에 로그인 가능한 회원을 등록합니다.
fn seed_demo_member(container: &AppContainer) -> Result<(), AppError> {
    let (Ok(login_id), Ok(password)) = (std::env::var("DEMO_LOGIN_ID"), std::env::var("DEMO_PASSWORD")) else {
        return Ok(());
    };

    let hash = bcrypt::hash(&password, PasswordConfig::bcrypt_cost())
        .context("데모 비밀번호 해시 실패")?;
    if container.seed_member(Member::new(1, login_id.as_str(), Some(hash))) {
        info!("데모 회원 등록: {}", login_id);
    }
    Ok(())
}

/// 환경별 설정 파일을 로드합니다
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    // 로거 초기화 전이라 결과는 stderr로 남깁니다.
    let loaded = match profile.as_str() {
        "prod" => dotenv::from_filename(".env.prod").map(|_| ".env.prod"),
        "dev" => dotenv::from_filename(".env.dev").map(|_| ".env.dev"),
        _ => dotenv().map(|_| ".env"),
    };

    match loaded {
        Ok(file) => eprintln!("profile={}: {} 파일 로드 됨", profile, file),
        Err(e) => eprintln!("profile={}: 설정 파일 로드 실패: {}", profile, e),
    }
}

/// 로깅 시스템을 초기화합니다
///
/// ```bash
/// RUST_LOG=hamalog_auth::services=debug cargo run
/// ```
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info,actix_web=info"));
}

/// CORS 설정을 구성합니다
///
/// 프론트엔드 개발 서버와의 통신을 허용하고, 레이트 리밋 헤더를 노출합니다.
fn configure_cors() -> Cors {
    Cors::default()
        .allowed_origin("http://localhost:3000")
        .allowed_origin("http://127.0.0.1:3000")
        .allowed_origin("http://localhost:8080")
        .allowed_origin("http://127.0.0.1:8080")
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers(vec![
            header::HeaderName::from_static(LIMIT_MINUTE_HEADER),
            header::HeaderName::from_static(LIMIT_HOUR_HEADER),
            header::HeaderName::from_static(REMAINING_HEADER),
        ])
        .supports_credentials()
        .max_age(3600)
}
