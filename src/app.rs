use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{accounts, auth, blog, budgets, categories, goals, settings, transactions, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(settings::router())
                .merge(accounts::router())
                .merge(categories::router())
                .merge(transactions::router())
                .merge(budgets::router())
                .merge(goals::router())
                .merge(blog::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Dana", "email": email, "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn registration_creates_default_settings() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;
        let (status, settings) = send(&app, Method::GET, "/api/v1/settings", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settings["currency"], "USD");
        assert_eq!(settings["theme"], "system");
        assert_eq!(settings["notifications_enabled"], true);
    }

    #[tokio::test]
    async fn settings_update_recreates_a_missing_row() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = register(&app, "dana@example.com").await;
        let (_, me) = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        let user_id = me["id"].as_i64().unwrap();

        let removed = crate::store::delete_record::<crate::settings::repo::Settings>(
            state.store.as_ref(),
            crate::store::Scope::id(user_id),
        )
        .await
        .unwrap();
        assert!(removed);

        let (status, settings) = send(
            &app,
            Method::PUT,
            "/api/v1/settings",
            Some(&token),
            Some(json!({"theme": "dark"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", settings);
        assert_eq!(settings["theme"], "dark");
        assert_eq!(settings["currency"], "USD");
        assert_eq!(settings["user_id"], user_id);
    }

    #[tokio::test]
    async fn partial_update_changes_only_balance() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(&token),
            Some(json!({"name": "Everyday", "type": "checking", "currency": "eur"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/accounts/{}", id),
            Some(&token),
            Some(json!({"balance": "125.40"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", updated);
        assert_eq!(updated["balance"], "125.40");
        assert_eq!(updated["name"], "Everyday");
        assert_eq!(updated["type"], "checking");
        assert_eq!(updated["currency"], "EUR");
        assert_eq!(updated["created_at"], created["created_at"]);
    }

    #[tokio::test]
    async fn empty_update_is_a_client_error() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/v1/categories",
            Some(&token),
            Some(json!({"name": "Food", "type": "expense"})),
        )
        .await;
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/categories/{}", created["id"]),
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_transaction_is_404_without_detail() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/transactions/999",
            Some(&token),
            Some(json!({"description": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"code": "NOT_FOUND", "message": "Transaction not found"}));
    }

    #[tokio::test]
    async fn resources_are_scoped_to_their_owner() {
        let app = build_app(AppState::fake());
        let alice = register(&app, "alice@example.com").await;
        let bob = register(&app, "bob@example.com").await;

        let (_, account) = send(
            &app,
            Method::POST,
            "/api/v1/accounts",
            Some(&alice),
            Some(json!({"name": "Savings", "type": "savings"})),
        )
        .await;
        let uri = format!("/api/v1/accounts/{}", account["id"]);

        let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/transactions",
            Some(&bob),
            Some(json!({"account_id": account["id"], "amount": "5", "type": "expense"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, list) = send(&app, Method::GET, "/api/v1/accounts", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn transactions_filter_by_account() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;
        let mut accounts = Vec::new();
        for name in ["Cash", "Card"] {
            let (_, account) = send(
                &app,
                Method::POST,
                "/api/v1/accounts",
                Some(&token),
                Some(json!({"name": name, "type": "cash"})),
            )
            .await;
            accounts.push(account["id"].as_i64().unwrap());
        }
        for (account_id, date) in [(accounts[0], "2024-03-01"), (accounts[1], "2024-03-02"), (accounts[0], "2024-03-05")] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/v1/transactions",
                Some(&token),
                Some(json!({"account_id": account_id, "amount": "9.99", "type": "expense", "date": date})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{}", body);
        }

        let (status, list) = send(
            &app,
            Method::GET,
            &format!("/api/v1/transactions?account_id={}", accounts[0]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let dates: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, vec!["2024-03-05", "2024-03-01"]);
    }

    #[tokio::test]
    async fn malformed_path_and_query_use_the_error_body() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;

        for uri in [
            "/api/v1/accounts/abc",
            "/api/v1/goals/1.5",
            "/api/v1/transactions?account_id=x",
            "/api/v1/blog/posts?limit=many",
        ] {
            let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["code"], "VALIDATION_ERROR", "{}", uri);
            assert!(body["message"].is_string(), "{}", uri);
        }

        let (status, body) = send(
            &app,
            Method::DELETE,
            "/api/v1/blog/admin/posts/first",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    #[tokio::test]
    async fn login_checks_the_stored_digest() {
        let app = build_app(AppState::fake());
        register(&app, "dana@example.com").await;

        let (status, body) = login(&app, "Dana@Example.com", "correct horse").await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert!(body["access_token"].is_string());
        assert!(body["user"].get("password_hash").is_none());

        let (status, body) = login(&app, "dana@example.com", "wrong horse").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");

        let (status, body) = login(&app, "nobody@example.com", "correct horse").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn changed_password_replaces_the_old_one() {
        let app = build_app(AppState::fake());
        let token = register(&app, "dana@example.com").await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/me",
            Some(&token),
            Some(json!({"password": "short"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/me",
            Some(&token),
            Some(json!({"password": "battery staple"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        let (status, _) = login(&app, "dana@example.com", "battery staple").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = login(&app, "dana@example.com", "correct horse").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_rejected() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/api/v1/goals", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn published_post_is_readable_by_slug() {
        let app = build_app(AppState::fake());
        let token = register(&app, "writer@example.com").await;

        let (status, post) = send(
            &app,
            Method::POST,
            "/api/v1/blog/admin/posts",
            Some(&token),
            Some(json!({
                "title": "Smart Saving Tips",
                "status": "published",
                "tags": ["saving", " saving ", "tips"],
                "content": [{"type": "heading", "text": "Start small"}, {"type": "paragraph", "text": "Put aside a little every week."}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", post);
        assert_eq!(post["slug"], "smart-saving-tips");
        assert_eq!(post["tags"], json!(["saving", "tips"]));
        assert_eq!(post["reading_time"], 1);
        assert!(post["published_at"].is_string());

        let (status, public) =
            send(&app, Method::GET, "/api/v1/blog/posts/smart-saving-tips", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(public["id"], post["id"]);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/blog/admin/posts/{}", post["id"]),
            Some(&token),
            Some(json!({"status": "draft"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["published_at"].is_null());

        let (status, _) =
            send(&app, Method::GET, "/api/v1/blog/posts/smart-saving-tips", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reading_time_preview() {
        let app = build_app(AppState::fake());
        let words = vec!["w"; 401].join(" ");
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/blog/reading-time",
            None,
            Some(json!({"content": [{"type": "paragraph", "text": words}, {"type": "image", "url": "x"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"reading_time": 3}));
    }

    #[tokio::test]
    async fn reading_time_tolerates_unknown_blocks() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/blog/reading-time",
            None,
            Some(json!({"content": [
                {"text": "no type here"},
                {"type": "video", "src": "clip.mp4"},
                {"type": "heading", "text": "Title", "level": "2"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body, json!({"reading_time": 1}));
    }
}
