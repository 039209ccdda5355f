use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::repo::PostStatus;
use crate::mutation::nullable;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_image_alt: Option<String>,
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Vec<String>,
    pub feature_embed_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

/// Sparse post edit. Optional text fields accept `null` to clear them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub excerpt: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_image_alt: Option<Option<String>>,
    pub status: Option<PostStatus>,
    pub content: Option<Vec<Value>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_description: Option<Option<String>>,
    pub meta_keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub feature_embed_url: Option<Option<String>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

impl UpdatePostRequest {
    /// True when the body names no column at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.excerpt.is_none()
            && self.cover_image_url.is_none()
            && self.cover_image_alt.is_none()
            && self.status.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.meta_keywords.is_none()
            && self.feature_embed_url.is_none()
            && self.published_at.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub tag: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct ReadingTimeRequest {
    #[serde(default)]
    pub content: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ReadingTimeResponse {
    pub reading_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_detected() {
        let req: UpdatePostRequest = serde_json::from_str("{}").unwrap();
        assert!(req.is_empty());
        let req: UpdatePostRequest = serde_json::from_str(r#"{"excerpt":null}"#).unwrap();
        assert!(!req.is_empty());
    }

    #[test]
    fn list_query_defaults() {
        let q: PostListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((q.limit, q.offset), (20, 0));
        assert!(q.tag.is_none());
    }
}
