use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    content,
    dto::{CreatePostRequest, PostListQuery, UpdatePostRequest},
    repo::{BlogPost, PostStatus},
    slug::generate_unique_slug,
};
use crate::{
    error::AppError,
    mutation::{update_record, Changes, MutationError},
    store::{self, FieldValue, RecordStore, Scope, StoreError},
    validation,
};

/// Probe-then-write rounds before a slug race is reported as a conflict.
const MAX_SLUG_ATTEMPTS: usize = 3;
const MAX_PAGE_SIZE: i64 = 100;

fn not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

fn content_json(blocks: &[serde_json::Value]) -> FieldValue {
    FieldValue::Json(serde_json::Value::Array(blocks.to_vec()))
}

fn list_json(items: Vec<String>) -> FieldValue {
    FieldValue::Json(items.into_iter().map(serde_json::Value::String).collect())
}

/// Explicit slug when it is non-blank, otherwise the title.
fn slug_source<'a>(slug: Option<&'a str>, title: &'a str) -> &'a str {
    slug.filter(|s| !s.trim().is_empty()).unwrap_or(title)
}

/// `published_at` for a post whose status after the write is `status`.
fn publish_stamp(status: PostStatus, supplied: Option<OffsetDateTime>) -> Option<OffsetDateTime> {
    match status {
        PostStatus::Published => Some(supplied.unwrap_or_else(OffsetDateTime::now_utc)),
        _ => None,
    }
}

pub async fn create_post(
    store: &dyn RecordStore,
    author_id: i64,
    words_per_minute: usize,
    req: CreatePostRequest,
) -> Result<BlogPost, AppError> {
    let title = validation::required_text("title", &req.title)?;
    content::validate(&req.content)?;
    let status = req.status.unwrap_or(PostStatus::Draft);

    let columns: Vec<(&'static str, FieldValue)> = vec![
        ("author_id", author_id.into()),
        ("title", title.as_str().into()),
        ("excerpt", req.excerpt.into()),
        ("cover_image_url", req.cover_image_url.into()),
        ("cover_image_alt", req.cover_image_alt.into()),
        ("status", status.into()),
        ("content", content_json(&req.content)),
        ("tags", list_json(content::normalize_tags(req.tags))),
        ("meta_title", req.meta_title.into()),
        ("meta_description", req.meta_description.into()),
        ("meta_keywords", list_json(content::normalize_tags(req.meta_keywords))),
        ("feature_embed_url", req.feature_embed_url.into()),
        (
            "reading_time",
            content::estimate_reading_time(&req.content, words_per_minute).into(),
        ),
        ("published_at", publish_stamp(status, req.published_at).into()),
    ];
    let source = slug_source(req.slug.as_deref(), &title);

    let mut attempt = 1;
    loop {
        let slug = generate_unique_slug(store, source, None).await?;
        let mut row = columns.clone();
        row.push(("slug", slug.as_str().into()));

        match store::insert_record::<BlogPost>(store, row).await {
            Ok(post) => {
                info!(author_id, post_id = post.id, slug = %post.slug, "post created");
                return Ok(post);
            }
            Err(StoreError::Conflict(constraint)) if attempt < MAX_SLUG_ATTEMPTS => {
                warn!(%constraint, %slug, attempt, "slug taken between probe and insert; retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Applies a sparse edit. Whenever the resulting status is `published` the
/// publish time is written again (supplied value or now); any other status
/// clears it.
pub async fn update_post(
    store: &dyn RecordStore,
    author_id: i64,
    id: i64,
    words_per_minute: usize,
    req: UpdatePostRequest,
) -> Result<BlogPost, AppError> {
    if req.is_empty() {
        return Err(MutationError::NoFieldsProvided.into());
    }
    let scope = Scope::owned(id, author_id);
    let existing = store::fetch_record::<BlogPost>(store, scope)
        .await?
        .ok_or_else(not_found)?;

    let title = validation::optional_text("title", req.title)?;
    let title_changed = title.as_ref().is_some_and(|t| *t != existing.title);
    let slug_changed = req
        .slug
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty() && s != existing.slug);
    let source = if slug_changed || title_changed {
        let effective_title = title.as_deref().unwrap_or(&existing.title);
        Some(slug_source(req.slug.as_deref(), effective_title).to_string())
    } else {
        None
    };

    let mut changes = Changes::new();
    changes
        .set_some("title", title)
        .set_nullable("excerpt", req.excerpt)
        .set_nullable("cover_image_url", req.cover_image_url)
        .set_nullable("cover_image_alt", req.cover_image_alt)
        .set_some("status", req.status)
        .set_nullable("meta_title", req.meta_title)
        .set_nullable("meta_description", req.meta_description)
        .set_nullable("feature_embed_url", req.feature_embed_url);
    if let Some(blocks) = &req.content {
        content::validate(blocks)?;
        changes
            .set("content", content_json(blocks))
            .set(
                "reading_time",
                content::estimate_reading_time(blocks, words_per_minute),
            );
    }
    if let Some(tags) = req.tags {
        changes.set("tags", list_json(content::normalize_tags(tags)));
    }
    if let Some(keywords) = req.meta_keywords {
        changes.set("meta_keywords", list_json(content::normalize_tags(keywords)));
    }
    let status = req.status.unwrap_or(existing.status);
    changes.set("published_at", publish_stamp(status, req.published_at));

    let Some(source) = source else {
        return Ok(update_record::<BlogPost>(store, scope, changes).await?);
    };

    let mut attempt = 1;
    loop {
        let slug = generate_unique_slug(store, &source, Some(id)).await?;
        let mut attempt_changes = changes.clone();
        attempt_changes.set("slug", slug.as_str());

        match update_record::<BlogPost>(store, scope, attempt_changes).await {
            Ok(post) => {
                info!(post_id = id, slug = %post.slug, "post slug regenerated");
                return Ok(post);
            }
            Err(MutationError::Store(StoreError::Conflict(constraint)))
                if attempt < MAX_SLUG_ATTEMPTS =>
            {
                warn!(%constraint, %slug, attempt, "slug taken between probe and update; retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Published posts, newest publish time first.
pub async fn list_published(
    store: &dyn RecordStore,
    query: &PostListQuery,
) -> Result<Vec<BlogPost>, AppError> {
    let tag = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let mut posts: Vec<BlogPost> =
        store::find_records::<BlogPost>(store, "status", PostStatus::Published)
            .await?
            .into_iter()
            .filter(|p| tag.map_or(true, |t| p.tags.iter().any(|pt| pt == t)))
            .collect();
    posts.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then(b.id.cmp(&a.id))
    });

    let offset = query.offset.max(0) as usize;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE) as usize;
    Ok(posts.into_iter().skip(offset).take(limit).collect())
}

pub async fn get_published_by_slug(
    store: &dyn RecordStore,
    slug: &str,
) -> Result<BlogPost, AppError> {
    store::find_records::<BlogPost>(store, "slug", slug)
        .await?
        .into_iter()
        .find(BlogPost::is_published)
        .ok_or_else(not_found)
}

pub async fn get_own_post(
    store: &dyn RecordStore,
    author_id: i64,
    id: i64,
) -> Result<BlogPost, AppError> {
    store::fetch_record::<BlogPost>(store, Scope::owned(id, author_id))
        .await?
        .ok_or_else(not_found)
}

pub async fn delete_post(store: &dyn RecordStore, author_id: i64, id: i64) -> Result<(), AppError> {
    if !store::delete_record::<BlogPost>(store, Scope::owned(id, author_id)).await? {
        return Err(not_found());
    }
    info!(author_id, post_id = id, "post deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blog::repo::BLOG_POSTS,
        mutation::UpdatePlan,
        store::{MemoryStore, Row, Table},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WPM: usize = content::DEFAULT_WORDS_PER_MINUTE;

    fn create_req(title: &str) -> CreatePostRequest {
        serde_json::from_value(serde_json::json!({ "title": title })).unwrap()
    }

    fn update_req(body: serde_json::Value) -> UpdatePostRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn same_title_gets_numeric_suffix() {
        let store = MemoryStore::new();
        let first = create_post(&store, 1, WPM, create_req("Smart Saving Tips"))
            .await
            .unwrap();
        let second = create_post(&store, 2, WPM, create_req("Smart Saving Tips"))
            .await
            .unwrap();
        assert_eq!(first.slug, "smart-saving-tips");
        assert_eq!(second.slug, "smart-saving-tips-1");
    }

    #[tokio::test]
    async fn create_defaults_to_unpublished_draft() {
        let store = MemoryStore::new();
        let post = create_post(&store, 1, WPM, create_req("Draft")).await.unwrap();
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());
        assert_eq!(post.reading_time, 1);
        assert!(post.content.is_empty());
    }

    #[tokio::test]
    async fn content_is_stored_exactly_as_sent() {
        let store = MemoryStore::new();
        let blocks = serde_json::json!([
            {"type": "heading", "text": "Intro", "id": "b1", "anchor": "intro"},
            {"type": "callout", "text": "editor-only block", "tone": "warn"},
            {"text": "block without a type"},
            {"type": "heading", "text": "Next", "level": "3"}
        ]);
        let req: CreatePostRequest = serde_json::from_value(serde_json::json!({
            "title": "Raw Blocks",
            "content": blocks.clone(),
        }))
        .unwrap();
        let post = create_post(&store, 1, WPM, req).await.unwrap();
        assert_eq!(serde_json::Value::Array(post.content.clone()), blocks);
        assert!(post.content[0].get("level").is_none());
        assert_eq!(post.reading_time, 1);

        let reread = get_own_post(&store, 1, post.id).await.unwrap();
        assert_eq!(serde_json::Value::Array(reread.content), blocks);

        let edited = serde_json::json!([{"type": "quote", "text": "kept", "cite": {"who": "me"}}]);
        let updated = update_post(
            &store,
            1,
            post.id,
            WPM,
            update_req(serde_json::json!({"content": edited.clone()})),
        )
        .await
        .unwrap();
        assert_eq!(serde_json::Value::Array(updated.content), edited);
    }

    #[tokio::test]
    async fn published_at_tracks_status() {
        let store = MemoryStore::new();
        let mut req = create_req("Launch");
        req.status = Some(PostStatus::Published);
        let post = create_post(&store, 1, WPM, req).await.unwrap();
        assert!(post.published_at.is_some());

        let archived = update_post(&store, 1, post.id, WPM, update_req(serde_json::json!({"status": "archived"})))
            .await
            .unwrap();
        assert_eq!(archived.status, PostStatus::Archived);
        assert!(archived.published_at.is_none());

        let republished = update_post(&store, 1, post.id, WPM, update_req(serde_json::json!({"status": "published"})))
            .await
            .unwrap();
        assert!(republished.published_at.is_some());
    }

    #[tokio::test]
    async fn editing_a_published_post_restamps_published_at() {
        let store = MemoryStore::new();
        let mut req = create_req("Already Out");
        req.status = Some(PostStatus::Published);
        req.published_at = Some(time::macros::datetime!(2020-01-01 00:00 UTC));
        let post = create_post(&store, 1, WPM, req).await.unwrap();

        let edited = update_post(&store, 1, post.id, WPM, update_req(serde_json::json!({"excerpt": "new teaser"})))
            .await
            .unwrap();
        assert_eq!(edited.excerpt.as_deref(), Some("new teaser"));
        assert!(edited.published_at.unwrap() > post.published_at.unwrap());
    }

    #[tokio::test]
    async fn no_op_resave_keeps_slug() {
        let store = MemoryStore::new();
        let post = create_post(&store, 1, WPM, create_req("Monthly Review")).await.unwrap();
        let saved = update_post(
            &store,
            1,
            post.id,
            WPM,
            update_req(serde_json::json!({"title": "Monthly Review", "slug": "monthly-review"})),
        )
        .await
        .unwrap();
        assert_eq!(saved.slug, "monthly-review");
    }

    #[tokio::test]
    async fn title_change_regenerates_slug_and_content_updates_reading_time() {
        let store = MemoryStore::new();
        create_post(&store, 1, WPM, create_req("Fresh Start")).await.unwrap();
        let post = create_post(&store, 1, WPM, create_req("Old Name")).await.unwrap();

        let words = vec!["word"; 450].join(" ");
        let renamed = update_post(
            &store,
            1,
            post.id,
            WPM,
            update_req(serde_json::json!({
                "title": "Fresh Start",
                "content": [{"type": "paragraph", "text": words}]
            })),
        )
        .await
        .unwrap();
        assert_eq!(renamed.slug, "fresh-start-1");
        assert_eq!(renamed.reading_time, 3);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let store = MemoryStore::new();
        let post = create_post(&store, 1, WPM, create_req("Quiet")).await.unwrap();
        let err = update_post(&store, 1, post.id, WPM, UpdatePostRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn other_authors_cannot_edit() {
        let store = MemoryStore::new();
        let post = create_post(&store, 1, WPM, create_req("Mine")).await.unwrap();
        let err = update_post(&store, 2, post.id, WPM, update_req(serde_json::json!({"title": "Theirs"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn public_listing_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (title, status, tags, day) in [
            ("Old", "published", vec!["saving"], 1),
            ("New", "published", vec!["saving", "tips"], 3),
            ("Hidden", "draft", vec!["saving"], 2),
            ("Mid", "published", vec!["tips"], 2),
        ] {
            let req: CreatePostRequest = serde_json::from_value(serde_json::json!({
                "title": title,
                "status": status,
                "tags": tags,
                "published_at": format!("2024-05-0{}T08:00:00Z", day),
            }))
            .unwrap();
            create_post(&store, 1, WPM, req).await.unwrap();
        }

        let all = list_published(&store, &PostListQuery { tag: None, limit: 20, offset: 0 })
            .await
            .unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);

        let saving = list_published(
            &store,
            &PostListQuery { tag: Some("saving".into()), limit: 1, offset: 1 },
        )
        .await
        .unwrap();
        assert_eq!(saving.len(), 1);
        assert_eq!(saving[0].title, "Old");

        assert!(get_published_by_slug(&store, "hidden").await.is_err());
        assert_eq!(get_published_by_slug(&store, "mid").await.unwrap().title, "Mid");
    }

    /// Lets another writer claim the probed slug right before the first insert.
    struct RacingStore {
        inner: MemoryStore,
        races: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for RacingStore {
        async fn insert(
            &self,
            table: &'static Table,
            columns: Vec<(&'static str, FieldValue)>,
        ) -> Result<Row, StoreError> {
            let race = self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if table.name == BLOG_POSTS.name && race {
                let slug = columns.iter().find(|(c, _)| *c == "slug").map(|(_, v)| v.clone());
                if let Some(slug) = slug {
                    self.inner
                        .insert(table, vec![("author_id", 99i64.into()), ("slug", slug)])
                        .await?;
                }
            }
            self.inner.insert(table, columns).await
        }

        async fn update_scoped(&self, plan: &UpdatePlan, scope: Scope) -> Result<u64, StoreError> {
            self.inner.update_scoped(plan, scope).await
        }

        async fn find_by_id(
            &self,
            table: &'static Table,
            scope: Scope,
        ) -> Result<Option<Row>, StoreError> {
            self.inner.find_by_id(table, scope).await
        }

        async fn find_by_owner(
            &self,
            table: &'static Table,
            owner: i64,
        ) -> Result<Vec<Row>, StoreError> {
            self.inner.find_by_owner(table, owner).await
        }

        async fn find_by_column(
            &self,
            table: &'static Table,
            column: &'static str,
            value: FieldValue,
        ) -> Result<Vec<Row>, StoreError> {
            self.inner.find_by_column(table, column, value).await
        }

        async fn delete(&self, table: &'static Table, scope: Scope) -> Result<u64, StoreError> {
            self.inner.delete(table, scope).await
        }
    }

    #[tokio::test]
    async fn lost_slug_race_is_retried_then_reported() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            races: AtomicUsize::new(1),
        };
        let post = create_post(&store, 1, WPM, create_req("Race")).await.unwrap();
        assert_eq!(post.slug, "race-1");

        let store = RacingStore {
            inner: MemoryStore::new(),
            races: AtomicUsize::new(MAX_SLUG_ATTEMPTS),
        };
        let err = create_post(&store, 1, WPM, create_req("Race")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
