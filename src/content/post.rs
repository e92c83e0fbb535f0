use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::text;
use crate::{
    error::{Error, Result},
    media::MediaSet,
};

/// 未指定来源时写入的 `source`
pub const DEFAULT_SOURCE: &str = "geckogen";

/// 表示"已发布"的 `status` 值
const PUBLISH_STATUS: &str = "publish";

/// 正文中的图片
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentImage {
    pub url: String,
    #[serde(
        rename = "altText",
        alias = "alt_text",
        default,
        deserialize_with = "null_as_default"
    )]
    pub alt_text: String,
}

/// 嵌套形式的分类引用：`{ "category": { "slug": "..." } }`
#[derive(Debug, Default, Deserialize)]
pub struct CategoryRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
}

/// webhook 推送的文章内容
#[derive(Debug, Default, Deserialize)]
pub struct IngestPayload {
    pub title: String,
    pub slug: String,
    #[serde(default, alias = "content", deserialize_with = "null_as_default")]
    pub content_html: String,
    pub content_markdown: Option<String>,
    pub excerpt: Option<String>,
    pub meta_description: Option<String>,
    #[serde(alias = "cover_image")]
    pub featured_image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_images: Vec<ContentImage>,
    pub audio_url: Option<String>,
    pub youtube_video_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub json_ld_schemas: Vec<serde_json::Value>,
    pub category_slug: Option<String>,
    pub category: Option<CategoryRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time_minutes: Option<f64>,
    pub source: Option<String>,
}

/// `null` 与缺省字段同样处理
fn null_as_default<'de, D, T>(deserializer: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 无法识别的发布时间记录警告后按未提供处理，不拒绝整篇文章
fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> core::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            let parsed = parse_published_at(&s);
            if parsed.is_none() && !s.trim().is_empty() {
                tracing::warn!(published_at = %s, "unrecognized published_at, ignoring");
            }
            parsed
        }
        Some(other) => {
            tracing::warn!(published_at = %other, "unrecognized published_at, ignoring");
            None
        }
    })
}

/// 解析发布时间：RFC 3339，或 `YYYY-MM-DD`（UTC 零点）
fn parse_published_at(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.to_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// slug 只允许 URL 安全字符，且不能以 `.` 开头，保证存储路径不会越出所属目录
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}

impl IngestPayload {
    /// 校验必填字段
    pub fn validate(&self) -> Result<()> {
        let slug = self.slug.trim();
        if slug.is_empty() {
            return Err(Error::BadRequest("missing slug"));
        }
        if !is_valid_slug(slug) {
            return Err(Error::BadRequest("invalid slug"));
        }
        if self.title.trim().is_empty() {
            return Err(Error::BadRequest("missing title"));
        }
        Ok(())
    }

    /// 分类 slug，优先 `category_slug`，其次 `category.slug`
    pub fn category_slug(&self) -> Option<&str> {
        [
            self.category_slug.as_deref(),
            self.category.as_ref().map(|c| c.slug.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }

    pub fn is_published(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(PUBLISH_STATUS))
    }
}

/// 写入 `posts` 表的文章
#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub content_markdown: Option<String>,
    pub excerpt: String,
    pub meta_description: String,
    pub cover_image: Option<String>,
    pub content_images: Vec<ContentImage>,
    pub audio_url: Option<String>,
    pub youtube_video_id: Option<String>,
    pub json_ld_schemas: Vec<serde_json::Value>,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    pub reading_time: i32,
    pub updated_at: DateTime<Utc>,
}

/// 由 [`IngestPayload`] 构建 [`Post`]
///
/// ```ignore
/// let post = PostBuilder::new(payload)
///     .media(media)
///     .category(category_id)
///     .build(Utc::now());
/// ```
pub struct PostBuilder {
    payload: IngestPayload,
    media: Option<MediaSet>,
    category_id: Option<Uuid>,
}

impl PostBuilder {
    pub fn new(payload: IngestPayload) -> Self {
        Self {
            payload,
            media: None,
            category_id: None,
        }
    }

    /// 使用迁移后的媒体地址，并据此改写正文
    pub fn media(mut self, media: MediaSet) -> Self {
        self.media = Some(media);
        self
    }

    pub fn category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn build(self, now: DateTime<Utc>) -> Post {
        let p = self.payload;
        let published = p.is_published();

        let (content, cover_image, content_images, audio_url) = match self.media {
            Some(media) => (
                text::rewrite_urls(&p.content_html, &media.replacements),
                media.cover_image,
                media.content_images,
                media.audio_url,
            ),
            None => (
                p.content_html,
                p.featured_image_url,
                p.content_images,
                p.audio_url,
            ),
        };

        let excerpt = text::excerpt(
            p.meta_description.as_deref(),
            p.excerpt.as_deref(),
            &content,
        );
        let meta_description = p
            .meta_description
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| excerpt.clone());

        Post {
            reading_time: text::reading_time(p.reading_time_minutes, &content),
            title: p.title.trim().to_string(),
            slug: p.slug.trim().to_string(),
            content,
            content_markdown: p.content_markdown,
            excerpt,
            meta_description,
            cover_image,
            content_images,
            audio_url,
            youtube_video_id: p.youtube_video_id.filter(|s| !s.is_empty()),
            json_ld_schemas: p.json_ld_schemas,
            category_id: self.category_id,
            tags: p.tags,
            published,
            published_at: p.published_at,
            source: p
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            updated_at: now,
        }
    }
}
