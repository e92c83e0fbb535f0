mod post;
mod text;

pub use self::{
    post::{CategoryRef, ContentImage, DEFAULT_SOURCE, IngestPayload, Post, PostBuilder},
    text::{UrlMap, excerpt, reading_time, rewrite_urls, strip_html},
};
