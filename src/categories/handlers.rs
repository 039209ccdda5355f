use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateCategoryRequest, UpdateCategoryRequest},
    repo::Category,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson, AppPath},
    mutation::update_record,
    state::AppState,
    store::{self, Scope},
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Category not found".into())
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Category>>, AppError> {
    let mut categories = store::list_owned::<Category>(state.store.as_ref(), user_id).await?;
    categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(categories))
}

#[instrument(skip(state, body))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let columns = body.into_columns(user_id)?;
    let category = store::insert_record::<Category>(state.store.as_ref(), columns).await?;
    info!(user_id, category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Category>, AppError> {
    store::fetch_record::<Category>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let changes = body.into_changes()?;
    let category =
        update_record::<Category>(state.store.as_ref(), Scope::owned(id, user_id), changes)
            .await?;
    Ok(Json(category))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<Category>(state.store.as_ref(), Scope::owned(id, user_id)).await? {
        return Err(not_found());
    }
    info!(user_id, category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
