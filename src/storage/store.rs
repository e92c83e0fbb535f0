use std::future::Future;

use sqlx::types::Json;
use uuid::Uuid;

use super::{DBPool, WebhookConfig};
use crate::{content::Post, error::Result};

/// webhook 所需的数据库操作
pub trait PostStore: Send + Sync {
    /// 根据 `webhook_id` 查询 webhook 配置，不存在时返回 `None`
    fn webhook_config(
        &self,
        webhook_id: &str,
    ) -> impl Future<Output = Result<Option<WebhookConfig>>> + Send;

    /// 根据 slug 查询分类 ID，不存在时返回 `None`
    fn category_id(&self, slug: &str) -> impl Future<Output = Result<Option<Uuid>>> + Send;

    /// 以 slug 为键插入或更新文章，返回文章 ID
    ///
    /// 必须是单条原子操作：并发推送同一个新 slug 时只会产生一行记录。
    fn upsert_post(&self, post: &Post) -> impl Future<Output = Result<Uuid>> + Send;
}

impl PostStore for DBPool {
    async fn webhook_config(&self, webhook_id: &str) -> Result<Option<WebhookConfig>> {
        let config = sqlx::query_as::<_, WebhookConfig>(
            r#"
            SELECT webhook_id, webhook_secret, site_url
            FROM site_settings
            WHERE webhook_id = $1
            LIMIT 1
            "#,
        )
        .bind(webhook_id)
        .fetch_optional(self)
        .await?;
        Ok(config)
    }

    async fn category_id(&self, slug: &str) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM categories
            WHERE slug = $1
            LIMIT 1
            "#,
        )
        .bind(slug)
        .fetch_optional(self)
        .await?;
        Ok(id)
    }

    async fn upsert_post(&self, post: &Post) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO posts (
                title, slug, content, content_markdown, excerpt, meta_description,
                cover_image, content_images, audio_url, youtube_video_id, json_ld_schemas,
                category_id, tags, published, published_at, source, reading_time, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (slug)
            DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                content_markdown = EXCLUDED.content_markdown,
                excerpt = EXCLUDED.excerpt,
                meta_description = EXCLUDED.meta_description,
                cover_image = EXCLUDED.cover_image,
                content_images = EXCLUDED.content_images,
                audio_url = EXCLUDED.audio_url,
                youtube_video_id = EXCLUDED.youtube_video_id,
                json_ld_schemas = EXCLUDED.json_ld_schemas,
                category_id = EXCLUDED.category_id,
                tags = EXCLUDED.tags,
                published = EXCLUDED.published,
                published_at = EXCLUDED.published_at,
                source = EXCLUDED.source,
                reading_time = EXCLUDED.reading_time,
                updated_at = EXCLUDED.updated_at
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.content_markdown)
        .bind(&post.excerpt)
        .bind(&post.meta_description)
        .bind(&post.cover_image)
        .bind(Json(&post.content_images))
        .bind(&post.audio_url)
        .bind(&post.youtube_video_id)
        .bind(Json(&post.json_ld_schemas))
        .bind(post.category_id)
        .bind(&post.tags)
        .bind(post.published)
        .bind(post.published_at)
        .bind(&post.source)
        .bind(post.reading_time)
        .bind(post.updated_at)
        .fetch_one(self)
        .await?;
        Ok(id)
    }
}
