use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateTransactionRequest, TransactionFilter, UpdateTransactionRequest},
    repo::Transaction,
};
use crate::{
    accounts::repo::Account,
    auth::AuthUser,
    categories::repo::Category,
    error::{AppError, AppJson, AppPath, AppQuery},
    mutation::update_record,
    state::AppState,
    store::{self, Scope},
    validation::ensure_owned,
};

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Transaction not found".into())
}

/// Newest booking date first.
#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(filter): AppQuery<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let mut transactions: Vec<Transaction> =
        store::list_owned::<Transaction>(state.store.as_ref(), user_id)
            .await?
            .into_iter()
            .filter(|t| filter.account_id.map_or(true, |id| t.account_id == id))
            .filter(|t| filter.category_id.map_or(true, |id| t.category_id == Some(id)))
            .collect();
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(Json(transactions))
}

#[instrument(skip(state, body))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let db = state.store.as_ref();
    ensure_owned::<Account>(db, "account_id", body.account_id, user_id).await?;
    if let Some(category_id) = body.category_id {
        ensure_owned::<Category>(db, "category_id", category_id, user_id).await?;
    }

    let columns = body.into_columns(user_id)?;
    let transaction = store::insert_record::<Transaction>(db, columns).await?;
    info!(user_id, transaction_id = transaction.id, "transaction created");
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Transaction>, AppError> {
    store::fetch_record::<Transaction>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, body))]
pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    let db = state.store.as_ref();
    if let Some(account_id) = body.account_id {
        ensure_owned::<Account>(db, "account_id", account_id, user_id).await?;
    }
    if let Some(Some(category_id)) = body.category_id {
        ensure_owned::<Category>(db, "category_id", category_id, user_id).await?;
    }

    let changes = body.into_changes()?;
    let transaction =
        update_record::<Transaction>(db, Scope::owned(id, user_id), changes).await?;
    Ok(Json(transaction))
}

#[instrument(skip(state))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete_record::<Transaction>(state.store.as_ref(), Scope::owned(id, user_id))
        .await?
    {
        return Err(not_found());
    }
    info!(user_id, transaction_id = id, "transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}
