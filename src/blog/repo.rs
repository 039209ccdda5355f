use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::store::{text_field, Record, Table};

pub static BLOG_POSTS: Table = Table {
    name: "blog_posts",
    label: "Post",
    primary_key: "id",
    owner: Some("author_id"),
    updatable: &[
        "title",
        "slug",
        "excerpt",
        "cover_image_url",
        "cover_image_alt",
        "status",
        "content",
        "tags",
        "meta_title",
        "meta_description",
        "meta_keywords",
        "feature_embed_url",
        "reading_time",
        "published_at",
    ],
    unique: &["slug"],
    decimals: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

text_field!(PostStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_image_alt: Option<String>,
    pub status: PostStatus,
    /// Editor blocks exactly as submitted.
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Vec<String>,
    pub feature_embed_url: Option<String>,
    pub reading_time: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BlogPost {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

impl Record for BlogPost {
    const TABLE: &'static Table = &BLOG_POSTS;
}
