use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::{Row, error::SqlState};
use crate::{
    error::{AppError, Result},
    models::user::{NewUser, UserDetail, UserSummary},
};

const FETCH_ALL_USERS: &str = "SELECT id, name FROM users ORDER BY id";
const EMAIL_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)";
const INSERT_USER: &str = "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id";
const FETCH_USER_DETAIL: &str = "SELECT id, name, email FROM users WHERE id = $1";
const DELETE_USER: &str = "DELETE FROM users WHERE id = $1";

/// Storage capability for registered users.
///
/// Handlers only ever see this trait, so tests can swap in a double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns every user's id and name, ordered by id.
    async fn list_users(&self) -> Result<Vec<UserSummary>>;

    /// Whether a user with exactly this email exists.
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Inserts a user and returns the id assigned by storage.
    async fn insert_user(&self, user: &NewUser) -> Result<i64>;

    /// Finds the detail fields of a user.
    async fn find_user(&self, id: i64) -> Result<Option<UserDetail>>;

    /// Deletes a user and returns the number of rows removed.
    async fn delete_user(&self, id: i64) -> Result<u64>;
}

/// A helper function to map a `tokio_postgres::Row` to a `UserSummary`.
fn row_to_summary(row: &Row) -> Result<UserSummary> {
    Ok(UserSummary {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
    })
}

/// A helper function to map a `tokio_postgres::Row` to a `UserDetail`.
fn row_to_detail(row: &Row) -> Result<UserDetail> {
    Ok(UserDetail {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
    })
}

/// `UserRepository` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(FETCH_ALL_USERS).await?;
        let rows = client.query(&statement, &[]).await?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(EMAIL_EXISTS).await?;
        let row = client.query_one(&statement, &[&email]).await?;
        row.try_get(0)
            .map_err(|_| AppError::MissingData("exists".to_string()))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(INSERT_USER).await?;
        let row = client
            .query_one(&statement, &[&user.name, &user.email, &user.password_hash])
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::Conflict(format!("email {} is already registered", user.email))
                } else {
                    AppError::Database(e)
                }
            })?;
        row.try_get("id")
            .map_err(|_| AppError::MissingData("id".to_string()))
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserDetail>> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(FETCH_USER_DETAIL).await?;
        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_detail(&r)).transpose()
    }

    async fn delete_user(&self, id: i64) -> Result<u64> {
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(DELETE_USER).await?;
        let deleted = client.execute(&statement, &[&id]).await?;
        Ok(deleted)
    }
}
