use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateGoalRequest, UpdateGoalRequest},
    repo::Goal,
};
use crate::{
    auth::AuthUser,
    categories::repo::Category,
    error::{AppError, AppJson, AppPath},
    mutation::update_record,
    state::AppState,
    store::{self, Scope},
    validation::ensure_owned,
};

pub fn goal_routes() -> Router<AppState> {
    Router::new()
        .route("/goals", get(list_goals).post(create_goal))
        .route(
            "/goals/:id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Goal not found".into())
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Goal>>, AppError> {
    let goals = store::list_owned::<Goal>(state.store.as_ref(), user_id).await?;
    Ok(Json(goals))
}

#[instrument(skip(state, body))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), AppError> {
    let db = state.store.as_ref();
    if let Some(category_id) = body.category_id {
        ensure_owned::<Category>(db, "category_id", category_id, user_id).await?;
    }
    let columns = body.into_columns(user_id)?;
    let goal = store::insert_record::<Goal>(db, columns).await?;
    info!(user_id, goal_id = goal.id, "goal created");
    Ok((StatusCode::CREATED, Json(goal)))
}

#[instrument(skip(state))]
pub async fn get_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Goal>, AppError> {
    store::fetch_record::<Goal>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn update_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdateGoalRequest>,
) -> Result<Json<Goal>, AppError> {
    let db = state.store.as_ref();
    if let Some(Some(category_id)) = body.category_id {
        ensure_owned::<Category>(db, "category_id", category_id, user_id).await?;
    }
    let changes = body.into_changes()?;
    let goal = update_record::<Goal>(db, Scope::owned(id, user_id), changes).await?;
    Ok(Json(goal))
}

#[instrument(skip(state))]
pub async fn delete_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<Goal>(state.store.as_ref(), Scope::owned(id, user_id)).await? {
        return Err(not_found());
    }
    info!(user_id, goal_id = id, "goal deleted");
    Ok(StatusCode::NO_CONTENT)
}
