//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{NewUser, UserDetail, UserSummary},
    repositories::{
        session::{MemorySessionStore, SessionStore},
        user::UserRepository,
    },
    routes,
    state::AppState,
};

#[derive(Clone)]
struct StoredUser {
    id: i64,
    name: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct UserTable {
    rows: Vec<StoredUser>,
    next_id: i64,
}

/// An in-memory `UserRepository` with the same uniqueness rule as the table.
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    table: Arc<Mutex<UserTable>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly, bypassing validation and hashing.
    pub fn seed(&self, name: &str, email: &str) -> i64 {
        let mut table = self.table.lock().unwrap();
        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(StoredUser {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: "seeded-hash".to_string(),
        });
        id
    }

    pub fn count(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    pub fn stored_password(&self, email: &str) -> Option<String> {
        self.table
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|row| row.email == email)
            .map(|row| row.password.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let table = self.table.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .map(|row| UserSummary { id: row.id, name: row.name.clone() })
            .collect())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().any(|row| row.email == email))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let mut table = self.table.lock().unwrap();
        if table.rows.iter().any(|row| row.email == user.email) {
            return Err(AppError::Conflict(format!("email {} is already registered", user.email)));
        }
        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(StoredUser {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
        });
        Ok(id)
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserDetail>> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().find(|row| row.id == id).map(|row| UserDetail {
            id: row.id,
            name: row.name.clone(),
            email: row.email.clone(),
        }))
    }

    async fn delete_user(&self, id: i64) -> Result<u64> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|row| row.id != id);
        Ok((before - table.rows.len()) as u64)
    }
}

/// Builds application state over the given storage doubles.
pub fn test_state(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionStore>) -> AppState {
    let config = Config::from_lookup(|_| None).unwrap();
    AppState::from_parts(config, users, sessions)
}

/// A captured response.
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Drives the full router and carries the session cookie between requests,
/// like a browser would.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self::with_sessions(users, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_sessions(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            app: routes::router(test_state(users, sessions)),
            cookie: None,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, form: &str) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(form.to_string())).await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie.as_str());
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
