mod mime;
mod relocate;
mod supabase;

use axum::body::Bytes;

use crate::error::Result;

pub use self::{
    mime::{DEFAULT_CONTENT_TYPE, DEFAULT_EXTENSION, extension_for},
    relocate::{MediaRelocator, MediaSet, Relocation},
    supabase::SupabaseStorage,
};

/// 对象存储接口
pub trait ObjectStorage: Send + Sync {
    /// 上传对象到 `bucket` 下的 `path`，`upsert` 为真时覆盖已有对象
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 对象的公开访问地址
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
