use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    content,
    dto::{
        CreatePostRequest, PostListQuery, ReadingTimeRequest, ReadingTimeResponse,
        UpdatePostRequest,
    },
    repo::BlogPost,
    services,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson, AppPath, AppQuery},
    state::AppState,
    store,
};

/// Readers: no authentication.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/blog/posts", get(list_posts))
        .route("/blog/posts/:slug", get(get_post_by_slug))
        .route("/blog/reading-time", post(reading_time))
}

/// Authors manage their own posts in any status.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/blog/admin/posts", get(list_own_posts).post(create_post))
        .route(
            "/blog/admin/posts/:id",
            get(get_own_post).put(update_post).delete(delete_post),
        )
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    let posts = services::list_published(state.store.as_ref(), &query).await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<Json<BlogPost>, AppError> {
    let post = services::get_published_by_slug(state.store.as_ref(), &slug).await?;
    Ok(Json(post))
}

#[instrument(skip(state, body))]
pub async fn reading_time(
    State(state): State<AppState>,
    AppJson(body): AppJson<ReadingTimeRequest>,
) -> Json<ReadingTimeResponse> {
    Json(ReadingTimeResponse {
        reading_time: content::estimate_reading_time(&body.content, state.config.words_per_minute),
    })
}

#[instrument(skip(state))]
pub async fn list_own_posts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    let posts = store::list_owned::<BlogPost>(state.store.as_ref(), user_id).await?;
    Ok(Json(posts))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let post = services::create_post(
        state.store.as_ref(),
        user_id,
        state.config.words_per_minute,
        body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state))]
pub async fn get_own_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<BlogPost>, AppError> {
    let post = services::get_own_post(state.store.as_ref(), user_id, id).await?;
    Ok(Json(post))
}

#[instrument(skip(state, body))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdatePostRequest>,
) -> Result<Json<BlogPost>, AppError> {
    let post = services::update_post(
        state.store.as_ref(),
        user_id,
        id,
        state.config.words_per_minute,
        body,
    )
    .await?;
    Ok(Json(post))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    services::delete_post(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
