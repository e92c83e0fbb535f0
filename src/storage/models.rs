use std::fmt;

/// 站点的 webhook 配置，对应 `site_settings` 表
#[derive(Clone, sqlx::FromRow)]
pub struct WebhookConfig {
    /// 公开的 webhook 标识，出现在请求路径中
    pub webhook_id: String,
    /// 共享密钥，不得写入日志或返回给调用方
    pub webhook_secret: String,
    /// 站点地址，用于生成文章链接
    pub site_url: Option<String>,
}

impl WebhookConfig {
    /// 文章的公开地址
    ///
    /// 配置了站点地址时为 `{site_url}/blog/{slug}`，否则为相对路径 `/blog/{slug}`。
    pub fn post_url(&self, slug: &str) -> String {
        match self
            .site_url
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
        {
            Some(site) => format!("{site}/blog/{slug}"),
            None => format!("/blog/{slug}"),
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("webhook_id", &self.webhook_id)
            .field("webhook_secret", &"<redacted>")
            .field("site_url", &self.site_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(site_url: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            webhook_id: "wh_1".to_string(),
            webhook_secret: "top-secret".to_string(),
            site_url: site_url.map(str::to_string),
        }
    }

    #[test]
    fn test_post_url() {
        assert_eq!(
            config(Some("https://blog.example.com/")).post_url("hello-world"),
            "https://blog.example.com/blog/hello-world"
        );
        assert_eq!(config(None).post_url("hello-world"), "/blog/hello-world");
        assert_eq!(config(Some(" ")).post_url("hello-world"), "/blog/hello-world");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", config(None));
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("wh_1"));
    }
}
