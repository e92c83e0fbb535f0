use std::io;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not Found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("missing config value: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// 错误对应的状态码与返回给调用方的简短信息
    ///
    /// 信息中不包含内部错误详情，详情只写入服务端日志。
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound => (StatusCode::NOT_FOUND, "webhook not found"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication failed"),
            Error::BadRequest(s) => (StatusCode::BAD_REQUEST, *s),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "invalid payload"),
            Error::Reqwest(_) => (StatusCode::BAD_GATEWAY, "Bad Gateway"),
            Error::Sqlx(_) => (StatusCode::INTERNAL_SERVER_ERROR, "failed to save post"),
            Error::MissingConfig(_) | Error::Config(_) | Error::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match &self {
            Error::Sqlx(e) => tracing::error!(%e, "sqlx error"),
            Error::Reqwest(e) => tracing::error!(%e, "upstream request error"),
            Error::Io(e) => tracing::error!(%e, "file io error"),
            Error::Config(e) => tracing::error!(%e, "config error"),
            Error::MissingConfig(key) => tracing::error!(key, "missing config value"),
            Error::Json(e) => tracing::warn!(%e, "malformed payload"),
            _ => {}
        }

        let (status, message) = self.status_and_message();
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
