//! In-memory stand-in for the parts of the GitLab v4 API the dispatcher
//! tests exercise: users lookup, project variables CRUD, an echo endpoint,
//! a chunked download, a binary file, and arbitrary error statuses. Every route requires
//! the `PRIVATE-TOKEN` header.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

/// Token accepted by `app()`.
pub const TOKEN: &str = "test-token";

/// Body served by `/raw`; not valid UTF-8.
pub const RAW_BYTES: &[u8] = &[0xff, 0xfe, 0x00, 0x01];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
    pub variable_type: String,
    pub protected: bool,
    pub masked: bool,
    pub environment_scope: String,
}

#[derive(Deserialize)]
pub struct CreateVariable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_type")]
    pub variable_type: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
    #[serde(default = "default_scope")]
    pub environment_scope: String,
}

#[derive(Deserialize)]
pub struct UpdateVariable {
    pub value: Option<String>,
    pub variable_type: Option<String>,
    pub protected: Option<bool>,
    pub masked: Option<bool>,
    pub environment_scope: Option<String>,
}

fn default_type() -> String {
    "env_var".to_string()
}

fn default_scope() -> String {
    "*".to_string()
}

/// Variables keyed by (project, key).
pub type Db = Arc<RwLock<BTreeMap<(String, String), Variable>>>;

#[derive(Clone)]
struct AppState {
    token: Arc<str>,
    db: Db,
}

pub fn app() -> Router {
    app_with_token(TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        token: Arc::from(token),
        db: Arc::new(RwLock::new(BTreeMap::new())),
    };
    let api = Router::new()
        .route("/users", get(list_users))
        .route("/echo", post(echo).put(echo))
        .route("/stream/{chunks}", get(stream))
        .route("/raw", get(raw))
        .route("/status/{code}", get(status).post(status).put(status).delete(status))
        .route("/projects/{project}/variables", get(list_variables).post(create_variable))
        .route(
            "/projects/{project}/variables/{key}",
            get(get_variable).put(update_variable).delete(delete_variable),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);
    Router::new().nest("/api/v4", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = request.headers().get("PRIVATE-TOKEN").and_then(|v| v.to_str().ok());
    if presented != Some(&*state.token) {
        log::warn!("rejecting {} {}: bad token", request.method(), request.uri());
        return message(StatusCode::UNAUTHORIZED, "401 Unauthorized");
    }
    next.run(request).await
}

async fn list_users(Query(params): Query<BTreeMap<String, String>>) -> Json<Vec<User>> {
    let users = [
        User {
            id: 42,
            username: "alice".to_string(),
        },
        User {
            id: 43,
            username: "bob".to_string(),
        },
    ];
    let wanted = params.get("username");
    Json(
        users
            .into_iter()
            .filter(|u| wanted.map_or(true, |name| &u.username == name))
            .collect(),
    )
}

/// Returns the request body verbatim with the request's content type.
async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// `chunks` lines of the form `chunk-<n>\n`.
async fn stream(Path(chunks): Path<usize>) -> Response {
    let body: String = (0..chunks).map(|n| format!("chunk-{n}\n")).collect();
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/octet-stream")], Bytes::from(body)).into_response()
}

async fn raw() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Bytes::from_static(RAW_BYTES),
    )
        .into_response()
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) if status.is_success() => (status, Json(json!({ "status": code }))).into_response(),
        Ok(status) => message(status, &format!("{code} {}", status.canonical_reason().unwrap_or("Error"))),
        Err(_) => message(StatusCode::BAD_REQUEST, "400 invalid status code"),
    }
}

async fn list_variables(State(state): State<AppState>, Path(project): Path<String>) -> Json<Vec<Variable>> {
    let db = state.db.read().await;
    Json(
        db.iter()
            .filter(|((p, _), _)| *p == project)
            .map(|(_, v)| v.clone())
            .collect(),
    )
}

async fn create_variable(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(input): Json<CreateVariable>,
) -> Response {
    let mut db = state.db.write().await;
    let id = (project, input.key.clone());
    if db.contains_key(&id) {
        return message(StatusCode::BAD_REQUEST, &format!("{} has already been taken", input.key));
    }
    let variable = Variable {
        key: input.key,
        value: input.value,
        variable_type: input.variable_type,
        protected: input.protected,
        masked: input.masked,
        environment_scope: input.environment_scope,
    };
    db.insert(id, variable.clone());
    (StatusCode::CREATED, Json(variable)).into_response()
}

async fn get_variable(State(state): State<AppState>, Path((project, key)): Path<(String, String)>) -> Response {
    let db = state.db.read().await;
    match db.get(&(project, key)) {
        Some(variable) => Json(variable.clone()).into_response(),
        None => message(StatusCode::NOT_FOUND, "404 Variable Not Found"),
    }
}

async fn update_variable(
    State(state): State<AppState>,
    Path((project, key)): Path<(String, String)>,
    Json(input): Json<UpdateVariable>,
) -> Response {
    let mut db = state.db.write().await;
    let Some(variable) = db.get_mut(&(project, key)) else {
        return message(StatusCode::NOT_FOUND, "404 Variable Not Found");
    };
    if let Some(value) = input.value {
        variable.value = value;
    }
    if let Some(variable_type) = input.variable_type {
        variable.variable_type = variable_type;
    }
    if let Some(protected) = input.protected {
        variable.protected = protected;
    }
    if let Some(masked) = input.masked {
        variable.masked = masked;
    }
    if let Some(scope) = input.environment_scope {
        variable.environment_scope = scope;
    }
    Json(variable.clone()).into_response()
}

async fn delete_variable(State(state): State<AppState>, Path((project, key)): Path<(String, String)>) -> Response {
    let mut db = state.db.write().await;
    match db.remove(&(project, key)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => message(StatusCode::NOT_FOUND, "404 Variable Not Found"),
    }
}
