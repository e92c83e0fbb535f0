use std::sync::Arc;

use crate::{
    media::{MediaRelocator, ObjectStorage},
    storage::PostStore,
};

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库访问和媒体迁移器，请求之间不共享其它状态。
pub struct AppState<S, M> {
    store: S,
    media: Arc<MediaRelocator<M>>,
}

impl<S: Clone, M> Clone for AppState<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            media: self.media.clone(),
        }
    }
}

impl<S: PostStore, M: ObjectStorage> AppState<S, M> {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(store: S, media: MediaRelocator<M>) -> Self {
        Self {
            store,
            media: Arc::new(media),
        }
    }

    /// 获取数据库访问对象
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 获取媒体迁移器
    pub fn media(&self) -> &MediaRelocator<M> {
        &self.media
    }
}
