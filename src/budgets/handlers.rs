use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{check_range, CreateBudgetRequest, UpdateBudgetRequest},
    repo::Budget,
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

pub fn budget_routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route(
            "/budgets/:id",
            get(get_budget).put(update_budget).delete(delete_budget),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Budget not found".into())
}

#[instrument(skip(state))]
pub async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Budget>>, AppError> {
    let budgets = store::list_owned::<Budget>(state.store.as_ref(), user_id).await?;
    Ok(Json(budgets))
}

#[instrument(skip(state, body))]
pub async fn create_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    let db = state.store.as_ref();
    ensure_owned::<Category>(db, "category_id", body.category_id, user_id).await?;
    let columns = body.into_columns(user_id)?;
    let budget = store::insert_record::<Budget>(db, columns).await?;
    info!(user_id, budget_id = budget.id, "budget created");
    Ok((StatusCode::CREATED, Json(budget)))
}

#[instrument(skip(state))]
pub async fn get_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Budget>, AppError> {
    store::fetch_record::<Budget>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn update_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdateBudgetRequest>,
) -> Result<Json<Budget>, AppError> {
    let db = state.store.as_ref();
    let scope = Scope::owned(id, user_id);

    if let Some(category_id) = body.category_id {
        ensure_owned::<Category>(db, "category_id", category_id, user_id).await?;
    }
    // a changed bound must still be ordered against the stored one
    if body.start_date.is_some() || body.end_date.is_some() {
        let current = store::fetch_record::<Budget>(db, scope)
            .await?
            .ok_or_else(not_found)?;
        let start = body.start_date.unwrap_or(current.start_date);
        let end = body.end_date.unwrap_or(current.end_date);
        check_range(start, end)?;
    }

    let changes = body.into_changes()?;
    let budget = update_record::<Budget>(db, scope, changes).await?;
    Ok(Json(budget))
}

#[instrument(skip(state))]
pub async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<Budget>(state.store.as_ref(), Scope::owned(id, user_id)).await? {
        return Err(not_found());
    }
    info!(user_id, budget_id = id, "budget deleted");
    Ok(StatusCode::NO_CONTENT)
}
