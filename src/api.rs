mod ingest;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::instrument;

use crate::{media::ObjectStorage, state::AppState, storage::PostStore};

pub use self::ingest::IngestResponse;

/// 设置应用的路由。
///
/// - `POST {prefix}/{webhook_id}`：接收推送的文章
/// - `POST {prefix}`：缺少 `webhook_id`，返回 400
/// - `GET /health`：存活检查
///
/// 所有路由都带有 CORS 预检处理。
pub fn setup_route<S, M>(app: AppState<S, M>, prefix: &str) -> Router
where
    S: PostStore + Clone + 'static,
    M: ObjectStorage + 'static,
{
    let prefix = prefix.trim_matches('/');
    let (base, by_id) = if prefix.is_empty() {
        ("/".to_string(), "/{webhook_id}".to_string())
    } else {
        (format!("/{prefix}"), format!("/{prefix}/{{webhook_id}}"))
    };

    Router::new()
        .route(&by_id, post(ingest::ingest::<S, M>))
        .route(&base, post(ingest::missing_webhook_id))
        .route("/health", get(health))
        .layer(cors_layer())
        .with_state(app)
}

/// 允许任意来源，并放行自定义的签名、时间戳和密钥请求头
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(crate::auth::SIGNATURE_HEADER),
            HeaderName::from_static(crate::auth::TIMESTAMP_HEADER),
            HeaderName::from_static(crate::auth::SECRET_HEADER),
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

async fn health() -> &'static str {
    "ok"
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
///
/// - Panics
///
/// 无法绑定地址或服务异常退出时会 panic
#[instrument(name = "http server", skip_all)]
pub async fn run_server_with_router(router: Router, bind: &str) {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind TCP listener on {bind}: {e}"));

    tracing::info!("listening on {bind}");

    axum::serve(listener, router)
        .await
        .expect("Failed to start Axum server");
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server<S, M>(app: AppState<S, M>, bind: &str, prefix: &str)
where
    S: PostStore + Clone + 'static,
    M: ObjectStorage + 'static,
{
    let router = setup_route(app, prefix);
    let router = add_middlewares(router);
    run_server_with_router(router, bind).await
}

/// 为路由添加中间件，包括请求追踪和失败日志记录。
///
/// 日志记录会在请求失败时输出错误信息。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 关闭请求日志
            }),
    )
}
