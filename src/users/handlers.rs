use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{dto::UpdateMeRequest, repo::User};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson},
    mutation::update_record,
    state::AppState,
    store::{self, Scope},
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me).delete(delete_me))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, AppError> {
    let user = store::fetch_record::<User>(state.store.as_ref(), Scope::id(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, body))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<UpdateMeRequest>,
) -> Result<Json<User>, AppError> {
    let changes = body.into_changes()?;
    let user = update_record::<User>(state.store.as_ref(), Scope::id(user_id), changes).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<User>(state.store.as_ref(), Scope::id(user_id)).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
