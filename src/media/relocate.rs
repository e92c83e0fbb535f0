use std::time::Duration;

use axum::body::Bytes;
use reqwest::header;

use super::{DEFAULT_CONTENT_TYPE, ObjectStorage, extension_for};
use crate::{
    content::{ContentImage, IngestPayload, UrlMap},
    error::Result,
};

/// 单个媒体文件的迁移结果
///
/// - [`Relocation::Relocated`]：已上传到自有存储
/// - [`Relocation::Fallback`]：下载或上传失败，继续使用原始地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Relocated { original: String, public_url: String },
    Fallback { original: String },
}

impl Relocation {
    /// 文章中应使用的地址
    pub fn url(&self) -> &str {
        match self {
            Relocation::Relocated { public_url, .. } => public_url,
            Relocation::Fallback { original } => original,
        }
    }

    /// 只有迁移成功的地址才记入替换表
    fn record(self, replacements: &mut UrlMap) -> String {
        let url = self.url().to_string();
        if let Relocation::Relocated {
            original,
            public_url,
        } = self
        {
            replacements.insert(original, public_url);
        }
        url
    }
}

/// 一篇文章迁移后的媒体地址
#[derive(Debug, Default)]
pub struct MediaSet {
    pub cover_image: Option<String>,
    pub content_images: Vec<ContentImage>,
    pub audio_url: Option<String>,
    /// 迁移成功的 `原始地址 → 新地址`
    pub replacements: UrlMap,
}

/// 下载外部媒体并转存到 [`ObjectStorage`]
///
/// 存储路径由文章 slug 决定，重复推送同一 slug 会覆盖原有文件：
///
/// - 封面：`{image_bucket}/covers/{slug}.{ext}`
/// - 正文图片：`{image_bucket}/content/{slug}/{index}.{ext}`
/// - 音频：`{audio_bucket}/{slug}.{ext}`
pub struct MediaRelocator<S> {
    client: reqwest::Client,
    storage: S,
    image_bucket: String,
    audio_bucket: String,
}

impl<S: ObjectStorage> MediaRelocator<S> {
    pub fn new(
        storage: S,
        image_bucket: impl Into<String>,
        audio_bucket: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            storage,
            image_bucket: image_bucket.into(),
            audio_bucket: audio_bucket.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 迁移文章引用的全部媒体
    ///
    /// 依次处理封面、正文图片（按顺序编号）和音频。单个文件失败只会让该文件
    /// 保留原始地址，不影响其余文件。
    pub async fn relocate_all(&self, payload: &IngestPayload) -> MediaSet {
        let slug = payload.slug.trim();
        let mut media = MediaSet::default();

        if let Some(url) = non_empty(payload.featured_image_url.as_deref()) {
            let path = format!("covers/{slug}");
            let relocation = self.relocate(url, &self.image_bucket, &path).await;
            media.cover_image = Some(relocation.record(&mut media.replacements));
        }

        for (index, image) in payload.content_images.iter().enumerate() {
            let url = match non_empty(Some(&image.url)) {
                Some(url) => url,
                None => {
                    media.content_images.push(image.clone());
                    continue;
                }
            };
            let path = format!("content/{slug}/{index}");
            let relocation = self.relocate(url, &self.image_bucket, &path).await;
            media.content_images.push(ContentImage {
                url: relocation.record(&mut media.replacements),
                alt_text: image.alt_text.clone(),
            });
        }

        if let Some(url) = non_empty(payload.audio_url.as_deref()) {
            let relocation = self.relocate(url, &self.audio_bucket, slug).await;
            media.audio_url = Some(relocation.record(&mut media.replacements));
        }

        media
    }

    /// 迁移单个文件，`path_stem` 为不含扩展名的存储路径
    pub async fn relocate(&self, url: &str, bucket: &str, path_stem: &str) -> Relocation {
        match self.try_relocate(url, bucket, path_stem).await {
            Ok(public_url) => {
                tracing::debug!(url, %public_url, "media relocated");
                Relocation::Relocated {
                    original: url.to_string(),
                    public_url,
                }
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "media relocation failed, keeping original url");
                Relocation::Fallback {
                    original: url.to_string(),
                }
            }
        }
    }

    async fn try_relocate(&self, url: &str, bucket: &str, path_stem: &str) -> Result<String> {
        let (bytes, content_type) = self.fetch(url).await?;
        let extension = extension_for(content_type.as_deref(), url);
        let path = format!("{path_stem}.{extension}");

        self.storage
            .upload(
                bucket,
                &path,
                bytes,
                content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
                true,
            )
            .await?;

        Ok(self.storage.public_url(bucket, &path))
    }

    async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>)> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?;
        Ok((bytes, content_type))
    }
}

fn non_empty(url: Option<&str>) -> Option<&str> {
    url.map(str::trim).filter(|u| !u.is_empty())
}
