use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{NewUser, User},
};

/// Credential and profile storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_num(&self, user_num: i32) -> AppResult<Option<User>>;

    async fn find_by_name(&self, user_name: &str) -> AppResult<Option<User>>;

    /// Fails with `AppError::Duplicate` when the email is taken
    async fn insert(&self, user: NewUser) -> AppResult<User>;

    /// Returns `false` when no account has this email
    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool>;

    async fn update_profile(
        &self,
        user_num: i32,
        user_name: &str,
        user_phone: Option<String>,
    ) -> AppResult<Option<User>>;
}

const USER_COLUMNS: &str =
    "user_num, user_email, user_name, user_pw, user_phone, social_login, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_num(&self, user_num: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_num = $1",
            USER_COLUMNS
        ))
        .bind(user_num)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_name(&self, user_name: &str) -> AppResult<Option<User>> {
        // Display names are not unique; the oldest account wins
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_name = $1 ORDER BY user_num LIMIT 1",
            USER_COLUMNS
        ))
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_email, user_name, user_pw, user_phone, social_login)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.user_email)
        .bind(&user.user_name)
        .bind(&user.user_pw)
        .bind(&user.user_phone)
        .bind(user.social_login)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Duplicate(
                format!("Email {} is already registered", user.user_email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET user_pw = $2 WHERE user_email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        user_num: i32,
        user_name: &str,
        user_phone: Option<String>,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET user_name = $2, user_phone = $3
            WHERE user_num = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_num)
        .bind(user_name)
        .bind(user_phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
