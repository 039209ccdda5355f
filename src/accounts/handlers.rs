use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateAccountRequest, UpdateAccountRequest},
    repo::Account,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson, AppPath},
    mutation::update_record,
    state::AppState,
    store::{self, Scope},
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Account not found".into())
}

#[instrument(skip(state))]
pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = store::list_owned::<Account>(state.store.as_ref(), user_id).await?;
    Ok(Json(accounts))
}

#[instrument(skip(state, body))]
pub async fn create_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let columns = body.into_columns(user_id)?;
    let account = store::insert_record::<Account>(state.store.as_ref(), columns).await?;
    info!(user_id, account_id = account.id, "account created");
    Ok((StatusCode::CREATED, Json(account)))
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Account>, AppError> {
    store::fetch_record::<Account>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let changes = body.into_changes()?;
    let account =
        update_record::<Account>(state.store.as_ref(), Scope::owned(id, user_id), changes).await?;
    Ok(Json(account))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<Account>(state.store.as_ref(), Scope::owned(id, user_id)).await? {
        return Err(not_found());
    }
    info!(user_id, account_id = id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
