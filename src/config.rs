use std::{env, fs, time::Duration};

use serde::Deserialize;

use crate::error::{Error, Result};

/// 服务配置
///
/// 先读取 `GECKO_CONFIG` 指向的 TOML 文件（可选），再由环境变量覆盖。
/// 数据库连接串单独从 `DATABASE_URL` 读取，见 [`crate::storage::init_db_from_env`]。
#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub bind: String,
    /// webhook 路由前缀，完整路径为 `{route_prefix}/{webhook_id}`
    pub route_prefix: String,
    /// 对象存储（Supabase）项目地址
    pub storage_url: String,
    /// 对象存储的 service role key
    pub storage_key: String,
    pub image_bucket: String,
    pub audio_bucket: String,
    /// 下载媒体和上传存储的超时时间（秒）
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            route_prefix: "/functions/v1/gecko-webhook".to_string(),
            storage_url: String::new(),
            storage_key: String::new(),
            image_bucket: "images".to_string(),
            audio_bucket: "audio".to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

impl Config {
    /// 从配置文件和环境变量加载配置
    pub fn load() -> Result<Self> {
        let mut config = match env::var("GECKO_CONFIG") {
            Ok(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// 使用 `get` 返回的环境变量覆盖配置项
    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let overrides = [
            ("GECKO_BIND", &mut self.bind),
            ("GECKO_ROUTE_PREFIX", &mut self.route_prefix),
            ("SUPABASE_URL", &mut self.storage_url),
            ("SUPABASE_SERVICE_ROLE_KEY", &mut self.storage_key),
            ("GECKO_IMAGE_BUCKET", &mut self.image_bucket),
            ("GECKO_AUDIO_BUCKET", &mut self.audio_bucket),
        ];
        for (key, field) in overrides {
            if let Some(value) = get(key) {
                *field = value;
            }
        }

        match get("GECKO_FETCH_TIMEOUT").map(|v| v.parse()) {
            Some(Ok(secs)) => self.fetch_timeout_secs = secs,
            Some(Err(e)) => tracing::warn!(%e, "invalid GECKO_FETCH_TIMEOUT, keeping default"),
            None => {}
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage_url.trim().is_empty() {
            return Err(Error::MissingConfig("SUPABASE_URL"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(Error::MissingConfig("SUPABASE_SERVICE_ROLE_KEY"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
