//! In-memory implementation of the todosync REST API.
//!
//! Mirrors the service's contract closely enough for end-to-end tests of the
//! client: `{"data": ...}` envelopes on success, `{"message": ...}` bodies on
//! failure, bearer tokens issued at login, and server-assigned ids and
//! timestamps on every to-do.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Account {
    email: String,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    /// token -> username
    sessions: HashMap<String, String>,
    /// username -> todos in creation order
    todos: HashMap<String, Vec<Todo>>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct Registration {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct NewTodo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/profile", get(profile))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Serve on an ephemeral localhost port in the background and return its address.
pub async fn spawn() -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(run(listener));
    Ok(addr)
}

fn data<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "data": data }))).into_response()
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Username behind the request's bearer token.
fn authorize(store: &Store, headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| store.sessions.get(token))
        .cloned()
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

async fn register(State(db): State<Db>, Json(input): Json<Registration>) -> Response {
    if input.username.is_empty() || input.email.is_empty() || input.password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "All fields are required");
    }

    let mut store = db.write().await;
    if store.accounts.contains_key(&input.username) {
        return message(StatusCode::CONFLICT, "Username already exists");
    }
    debug!(username = %input.username, "registered");
    store.accounts.insert(
        input.username,
        Account {
            email: input.email,
            password: input.password,
        },
    );
    message(StatusCode::CREATED, "User registered successfully")
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Response {
    let mut store = db.write().await;
    let valid = store
        .accounts
        .get(&input.username)
        .is_some_and(|account| account.password == input.password);
    if !valid {
        return message(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), input.username);
    data(StatusCode::OK, json!({ "token": token }))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Response {
    let store = db.read().await;
    let username = match authorize(&store, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    match store.accounts.get(&username) {
        Some(account) => data(
            StatusCode::OK,
            json!({ "username": username, "email": account.email }),
        ),
        None => message(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn list_todos(State(db): State<Db>, headers: HeaderMap) -> Response {
    let store = db.read().await;
    let username = match authorize(&store, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    let todos = store.todos.get(&username).cloned().unwrap_or_default();
    data(StatusCode::OK, todos)
}

async fn create_todo(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewTodo>,
) -> Response {
    let mut store = db.write().await;
    let username = match authorize(&store, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    if input.title.is_empty() || input.description.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Title and description are required");
    }

    let todo = Todo {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        description: input.description,
        created_at: Utc::now(),
    };
    store.todos.entry(username).or_default().push(todo.clone());
    data(StatusCode::CREATED, todo)
}

async fn delete_todo(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut store = db.write().await;
    let username = match authorize(&store, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    let todos = store.todos.entry(username).or_default();
    match todos.iter().position(|todo| todo.id == id) {
        Some(index) => {
            todos.remove(index);
            message(StatusCode::OK, "Todo deleted")
        }
        None => message(StatusCode::NOT_FOUND, "Todo not found"),
    }
}
