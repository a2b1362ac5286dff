//! HTTP policy authority against an in-process axum mock of the backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use stockgate::identity::{Claims, LoginRequest, TokenStore};
use stockgate::policy::{ClearanceLevel, FunctionId, HttpPolicyAuthority, PolicyAuthority, PolicyCache};
use stockgate::storage::MemoryStore;
use stockgate::{AuthError, FetchError};

#[derive(Clone, Default)]
struct Backend {
    /// `(route, authorization header)` for every authenticated call.
    seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Backend {
    fn record(&self, route: String, headers: &HeaderMap) {
        let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().push((route, auth));
    }
}

fn issued_token() -> String {
    Claims { email: Some("lead@shop.test".into()), clearance_level: Some(2), ..Default::default() }.encode_unsigned()
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "lead@shop.test" && body["password"] == "pw" {
        (StatusCode::CREATED, Json(json!({ "accessToken": issued_token() })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Wrong email or password" })))
    }
}

async fn levels(State(b): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    b.record("GET /clearance-levels".into(), &headers);
    Json(json!([
        { "level": 1, "name": "Associate", "allowedFunctions": ["product:view"] },
        { "level": 2, "name": "Manager", "description": "Runs the floor", "allowedFunctions": ["product:view", "product:edit"] }
    ]))
}

async fn create_level(State(b): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    b.record("POST /clearance-levels".into(), &headers);
    (StatusCode::BAD_REQUEST, Json(json!({ "message": ["name must be a string", "level must be an integer"] })))
}

async fn delete_level(State(b): State<Backend>, headers: HeaderMap, Path(level): Path<i32>) -> impl IntoResponse {
    b.record(format!("DELETE /clearance-levels/{}", level), &headers);
    (StatusCode::NOT_FOUND, Json(json!({ "message": format!("Clearance level {} not found", level) })))
}

async fn add_function(
    State(b): State<Backend>,
    headers: HeaderMap,
    Path((level, function_id)): Path<(i32, String)>,
) -> impl IntoResponse {
    b.record(format!("POST {}/{}", level, function_id), &headers);
    (StatusCode::CREATED, Json(json!({})))
}

async fn functions(State(b): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    b.record("GET /clearance-levels/functions".into(), &headers);
    Json(json!([{ "id": "product:edit", "name": "Edit Product", "category": "product" }]))
}

async fn garbage() -> impl IntoResponse { "not json" }

// Serve the mock on an ephemeral localhost port under an `/api` prefix.
async fn start_backend(backend: Backend) -> Result<(JoinHandle<()>, String)> {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/clearance-levels", get(levels).post(create_level))
        .route("/clearance-levels/functions", get(functions))
        .route("/clearance-levels/{level}", delete(delete_level))
        .route("/clearance-levels/{level}/functions/{function_id}", post(add_function))
        .with_state(backend);
    let app = Router::new().nest("/api", api).route("/broken/clearance-levels", get(garbage));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e:?}");
        }
    });
    Ok((handle, format!("http://{}", addr)))
}

fn client(base: &str, tokens: &Arc<TokenStore>) -> Result<HttpPolicyAuthority> {
    Ok(HttpPolicyAuthority::new(base, Duration::from_secs(5))?.with_tokens(tokens.clone()))
}

#[tokio::test]
async fn login_then_fetch_sends_bearer_credential() -> Result<()> {
    let backend = Backend::default();
    let (handle, root) = start_backend(backend.clone()).await?;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let auth = client(&format!("{}/api", root), &tokens)?;

    let resp = auth.login(&LoginRequest::new("lead@shop.test", "pw")).await?;
    tokens.set_token(&resp.access_token)?;
    assert_eq!(tokens.clearance_level(), 2);

    let levels = auth.fetch_levels().await?;
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[1].description.as_deref(), Some("Runs the floor"));
    assert!(levels[1].allows(&FunctionId::new("product:edit")));

    let seen = backend.seen.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1.as_deref(), Some(format!("Bearer {}", resp.access_token).as_str()));
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn rejected_login_surfaces_backend_message() -> Result<()> {
    let (handle, root) = start_backend(Backend::default()).await?;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let auth = client(&format!("{}/api", root), &tokens)?;

    let err = auth.login(&LoginRequest::new("lead@shop.test", "nope")).await.unwrap_err();
    assert_eq!(err, AuthError::rejected("Wrong email or password"));
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization() -> Result<()> {
    let backend = Backend::default();
    let (handle, root) = start_backend(backend.clone()).await?;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let auth = client(&format!("{}/api", root), &tokens)?;

    let list = auth.fetch_functions().await?;
    assert_eq!(list[0].name, "Edit Product");
    assert_eq!(backend.seen.lock()[0].1, None);
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn function_ids_round_trip_through_the_path() -> Result<()> {
    let backend = Backend::default();
    let (handle, root) = start_backend(backend.clone()).await?;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    tokens.set_token(&issued_token())?;
    let auth = client(&format!("{}/api", root), &tokens)?;

    auth.add_function(2, &FunctionId::new("admin:clearance-levels")).await?;
    let seen = backend.seen.lock().clone();
    assert_eq!(seen[0].0, "POST 2/admin:clearance-levels");
    assert!(seen[0].1.as_deref().is_some_and(|h| h.starts_with("Bearer ")));
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn error_statuses_keep_backend_messages() -> Result<()> {
    let (handle, root) = start_backend(Backend::default()).await?;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let auth = client(&format!("{}/api", root), &tokens)?;

    let err = auth.delete_level(9).await.unwrap_err();
    assert_eq!(err, FetchError::status(404, "Clearance level 9 not found"));

    let err = auth.create_level(&ClearanceLevel::new(4, "Auditor")).await.unwrap_err();
    assert_eq!(err, FetchError::status(400, "name must be a string, level must be an integer"));
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn unreadable_table_keeps_cached_snapshot() -> Result<()> {
    let (handle, root) = start_backend(Backend::default()).await?;
    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenStore::new(store.clone()));

    let good = PolicyCache::new(Arc::new(client(&format!("{}/api", root), &tokens)?), store.clone());
    good.refresh().await?;
    assert_eq!(good.current_snapshot().levels.len(), 2);

    let broken = PolicyCache::new(Arc::new(client(&format!("{}/broken", root), &tokens)?), store.clone());
    assert!(broken.init());
    let err = broken.refresh().await.unwrap_err();
    assert!(matches!(err, FetchError::Payload { .. }));
    assert_eq!(broken.current_snapshot().levels.len(), 2);
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn unreachable_authority_is_a_transport_error() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
    let auth = client(&format!("http://{}", addr), &tokens)?;
    assert!(matches!(auth.fetch_levels().await, Err(FetchError::Transport { .. })));
    assert!(matches!(auth.login(&LoginRequest::new("a", "b")).await, Err(AuthError::Transport { .. })));
    Ok(())
}
