use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{Span, field, instrument};
use uuid::Uuid;

use crate::{
    auth,
    content::{IngestPayload, PostBuilder},
    error::{Error, Result},
    media::ObjectStorage,
    state::AppState,
    storage::PostStore,
};

/// 推送成功的响应
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub url: String,
    pub post_id: Uuid,
}

/// 路径中缺少 `webhook_id`
pub async fn missing_webhook_id() -> Result<()> {
    Err(Error::BadRequest("invalid webhook url"))
}

/// 接收外部推送的文章。
///
/// 处理流程：
/// 1. 根据 `webhook_id` 查询配置，不存在返回 404
/// 2. 使用配置中的密钥认证请求，失败返回 401
/// 3. 解析请求体，格式错误返回 400
/// 4. 迁移封面、正文图片和音频，单个文件失败时保留原始地址
/// 5. 改写正文中的媒体地址，按 slug 插入或更新文章，数据库错误返回 500
#[instrument(
    name = "ingest",
    skip_all,
    fields(webhook_id = field::Empty, slug = field::Empty)
)]
pub async fn ingest<S, M>(
    Path(webhook_id): Path<String>,
    State(app): State<AppState<S, M>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>>
where
    S: PostStore,
    M: ObjectStorage,
{
    let webhook_id = webhook_id.trim();
    if webhook_id.is_empty() {
        return Err(Error::BadRequest("invalid webhook url"));
    }
    Span::current().record("webhook_id", webhook_id);

    let config = app
        .store()
        .webhook_config(webhook_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("webhook config not found");
            Error::NotFound
        })?;

    let scheme = auth::authenticate(
        &config.webhook_secret,
        &body,
        &headers,
        Utc::now().timestamp(),
    )
    .inspect_err(|_| tracing::warn!("webhook authentication failed"))?;

    let payload: IngestPayload = serde_json::from_slice(&body)?;
    payload.validate()?;
    Span::current().record("slug", payload.slug.trim());

    let category_id = match payload.category_slug() {
        Some(slug) => app.store().category_id(slug).await.unwrap_or_else(|e| {
            tracing::warn!(%e, category = slug, "category lookup failed");
            None
        }),
        None => None,
    };

    let media = app.media().relocate_all(&payload).await;
    let relocated = media.replacements.len();

    let post = PostBuilder::new(payload)
        .media(media)
        .category(category_id)
        .build(Utc::now());

    let post_id = app.store().upsert_post(&post).await?;

    tracing::info!(
        %post_id,
        ?scheme,
        relocated,
        published = post.published,
        "post ingested"
    );

    Ok(Json(IngestResponse {
        success: true,
        url: config.post_url(&post.slug),
        post_id,
    }))
}
