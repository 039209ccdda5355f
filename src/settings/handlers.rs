use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::{dto::UpdateSettingsRequest, repo::Settings};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson},
    mutation::update_record,
    state::AppState,
    store::Scope,
};

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

/// Returns the caller's settings, creating the defaults on first access.
#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(Settings::fetch_or_create(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<UpdateSettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    let changes = body.into_changes()?;
    let db = state.store.as_ref();
    Settings::fetch_or_create(db, user_id).await?;
    let settings = update_record::<Settings>(db, Scope::id(user_id), changes).await?;
    Ok(Json(settings))
}
