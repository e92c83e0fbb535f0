#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::{Response, StatusCode, header},
    routing::get,
};
use gecko_webhook::{
    api,
    content::Post,
    error::{Error, Result},
    media::{MediaRelocator, ObjectStorage},
    state::AppState,
    storage::{PostStore, WebhookConfig},
};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PREFIX: &str = "/functions/v1/gecko-webhook";
pub const WEBHOOK_ID: &str = "wh_7f3c9a";
pub const SECRET: &str = "gecko-test-secret";
pub const SITE_URL: &str = "https://blog.example.com";

/// 内存中的 [`PostStore`]，按 slug 保存文章
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    configs: HashMap<String, WebhookConfig>,
    categories: HashMap<String, Uuid>,
    posts: HashMap<String, (Uuid, Post)>,
    fail_upsert: bool,
}

impl MemoryStore {
    pub fn add_config(&self, webhook_id: &str, secret: &str, site_url: Option<&str>) {
        self.inner.lock().unwrap().configs.insert(
            webhook_id.to_string(),
            WebhookConfig {
                webhook_id: webhook_id.to_string(),
                webhook_secret: secret.to_string(),
                site_url: site_url.map(str::to_string),
            },
        );
    }

    pub fn add_category(&self, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .lock()
            .unwrap()
            .categories
            .insert(slug.to_string(), id);
        id
    }

    pub fn fail_upsert(&self) {
        self.inner.lock().unwrap().fail_upsert = true;
    }

    pub fn post_count(&self) -> usize {
        self.inner.lock().unwrap().posts.len()
    }

    pub fn post(&self, slug: &str) -> Option<(Uuid, Post)> {
        self.inner.lock().unwrap().posts.get(slug).cloned()
    }
}

impl PostStore for MemoryStore {
    async fn webhook_config(&self, webhook_id: &str) -> Result<Option<WebhookConfig>> {
        Ok(self.inner.lock().unwrap().configs.get(webhook_id).cloned())
    }

    async fn category_id(&self, slug: &str) -> Result<Option<Uuid>> {
        Ok(self.inner.lock().unwrap().categories.get(slug).copied())
    }

    async fn upsert_post(&self, post: &Post) -> Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_upsert {
            return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let id = inner
            .posts
            .get(&post.slug)
            .map(|(id, _)| *id)
            .unwrap_or_else(Uuid::new_v4);
        inner.posts.insert(post.slug.clone(), (id, post.clone()));
        Ok(id)
    }
}

/// 内存中的 [`ObjectStorage`]，键为 `{bucket}/{path}`
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
}

impl MemoryStorage {
    pub const PUBLIC_BASE: &'static str = "https://storage.test/public";

    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        _upsert: bool,
    ) -> Result<()> {
        self.objects.lock().unwrap().insert(
            format!("{bucket}/{path}"),
            (bytes, content_type.to_string()),
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", Self::PUBLIC_BASE)
    }
}

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";
pub const JPEG_BYTES: &[u8] = b"\xff\xd8\xfffake-jpeg";
pub const MP3_BYTES: &[u8] = b"ID3fake-mp3";

/// 在 `127.0.0.1:0` 上启动一个模拟的外部媒体服务器，返回其地址
///
/// 未注册的路径返回 404。
pub async fn spawn_media_host() -> String {
    let app = Router::new()
        .route(
            "/images/cover",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], JPEG_BYTES) }),
        )
        .route(
            "/images/a.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES) }),
        )
        .route(
            "/images/b.gif",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], PNG_BYTES) }),
        )
        .route(
            "/audio/episode",
            get(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], MP3_BYTES) }),
        )
        .route(
            "/broken.png",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定端口失败");
    let addr = listener.local_addr().expect("获取地址失败");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("媒体服务器异常");
    });

    format!("http://{addr}")
}

pub struct TestApp {
    router: Router,
    pub store: MemoryStore,
    pub storage: MemoryStorage,
    pub media_host: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = MemoryStore::default();
        store.add_config(WEBHOOK_ID, SECRET, Some(SITE_URL));

        let storage = MemoryStorage::default();
        let media = MediaRelocator::new(storage.clone(), "images", "audio", Duration::from_secs(5));

        let router = api::setup_route(AppState::new(store.clone(), media), PREFIX);

        Self {
            router,
            store,
            storage,
            media_host: spawn_media_host().await,
        }
    }

    pub fn media_url(&self, path: &str) -> String {
        format!("{}{}", self.media_host, path)
    }

    pub async fn request(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot fail")
    }

    /// 发送请求并解析 JSON 响应
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = self.request(req).await;
        let status = resp.status();
        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        let json = serde_json::from_slice(&data).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    /// 使用 Bearer token 推送文章
    pub async fn push_bearer(
        &self,
        webhook_id: &str,
        payload: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let req = webhook_request(webhook_id)
            .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
            .body(Body::from(payload.to_string()))
            .expect("构建请求失败");
        self.send(req).await
    }
}

pub fn webhook_request(webhook_id: &str) -> axum::http::request::Builder {
    Request::post(format!("{PREFIX}/{webhook_id}")).header(header::CONTENT_TYPE, "application/json")
}
