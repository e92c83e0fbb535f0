use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue},
};
use reqwest::header;

use super::ObjectStorage;
use crate::error::Result;

/// Supabase Storage 的 [`ObjectStorage`] 实现
///
/// 通过 REST 接口上传对象，公开访问地址为
/// `{base}/storage/v1/object/public/{bucket}/{path}`。
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
}

impl SupabaseStorage {
    /// 使用项目地址和 service role key 创建存储客户端
    ///
    /// - Panics
    ///
    /// key 含有非法请求头字符时会 panic
    pub fn new(base_url: impl AsRef<str>, service_key: impl AsRef<str>, timeout: Duration) -> Self {
        let key = service_key.as_ref();
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .default_headers({
                let mut header = HeaderMap::new();
                let mut auth = HeaderValue::from_str(&format!("Bearer {key}"))
                    .expect("Failed to create Authorization header");
                auth.set_sensitive(true);
                header.insert(header::AUTHORIZATION, auth);

                let mut apikey =
                    HeaderValue::from_str(key).expect("Failed to create apikey header");
                apikey.set_sensitive(true);
                header.insert("apikey", apikey);
                header
            })
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base_url)
    }
}

impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        self.client
            .post(self.object_url(bucket, path))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let storage = SupabaseStorage::new(
            "https://project.supabase.co/",
            "service-key",
            Duration::from_secs(5),
        );
        assert_eq!(
            storage.object_url("images", "covers/hello.png"),
            "https://project.supabase.co/storage/v1/object/images/covers/hello.png"
        );
        assert_eq!(
            storage.public_url("images", "covers/hello.png"),
            "https://project.supabase.co/storage/v1/object/public/images/covers/hello.png"
        );
    }
}
