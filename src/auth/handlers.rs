use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{digest_new_password, password_matches},
        services::{issue_tokens, normalize_email},
    },
    error::{AppError, AppJson},
    settings::repo::Settings,
    state::AppState,
    store::{self, Scope},
    users::repo::User,
    validation,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = validation::required_text("name", &payload.name)?;
    let email = normalize_email(&payload.email).map_err(|e| {
        warn!(email = %payload.email, "invalid email");
        e
    })?;
    let hash = digest_new_password(&payload.password)?;

    // Ensure email is not taken
    if User::find_by_email(state.store.as_ref(), &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let user = User::create(state.store.as_ref(), &name, &email, &hash).await?;
    Settings::create_default(state.store.as_ref(), user.id).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(issue_tokens(&keys, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&payload.email)?;

    let Some(user) = User::find_by_email(state.store.as_ref(), &email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !password_matches(&user.password_hash, &payload.password) {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::TokenInvalid
    })?;

    let user = store::fetch_record::<User>(state.store.as_ref(), Scope::id(claims.sub))
        .await?
        .ok_or(AppError::TokenInvalid)?;
    Ok(Json(issue_tokens(&keys, user)?))
}
