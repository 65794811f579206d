use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^01[016789]-\d{3,4}-\d{4}$").expect("phone pattern is valid")
});

pub const MIN_PASSWORD_LEN: usize = 8;

/// Stored account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub user_num: i32,
    pub user_email: String,
    pub user_name: String,
    /// Argon2 PHC string; absent for accounts created through social login
    pub user_pw: Option<String>,
    pub user_phone: Option<String>,
    pub social_login: bool,
    pub created_at: DateTime<Utc>,
}

/// Account about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub user_email: String,
    pub user_name: String,
    pub user_pw: Option<String>,
    pub user_phone: Option<String>,
    pub social_login: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_email: String,
    pub user_pw: String,
}

/// Password reset shares the login payload shape
pub type PasswordResetRequest = LoginRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
    pub kakao_email: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub name: String,
    pub user_num: i32,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_email: String,
    pub user_name: String,
    pub user_pw: String,
    pub user_phone: String,
}

impl SignupRequest {
    /// Rejects the first malformed field with a client-facing message
    pub fn validate(&self) -> AppResult<()> {
        if !EMAIL_RE.is_match(self.user_email.trim()) {
            return Err(AppError::InvalidInput(
                "userEmail must be a valid email address".to_string(),
            ));
        }
        if self.user_name.trim().is_empty() {
            return Err(AppError::InvalidInput("userName cannot be empty".to_string()));
        }
        validate_password(&self.user_pw)?;
        if !PHONE_RE.is_match(self.user_phone.trim()) {
            return Err(AppError::InvalidInput(
                "userPhone must look like 010-1234-5678".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "userPw must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub user_num: i32,
    pub user_email: String,
    pub user_name: String,
    pub user_phone: Option<String>,
    pub social_login: bool,
}

impl From<User> for ProfileDto {
    fn from(user: User) -> Self {
        Self {
            user_num: user.user_num,
            user_email: user.user_email,
            user_name: user.user_name,
            user_phone: user.user_phone,
            social_login: user.social_login,
        }
    }
}

/// Editable profile fields; email and user number are fixed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub user_name: String,
    #[serde(default)]
    pub user_phone: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if self.user_name.trim().is_empty() {
            return Err(AppError::InvalidInput("userName cannot be empty".to_string()));
        }
        if let Some(phone) = &self.user_phone {
            if !PHONE_RE.is_match(phone.trim()) {
                return Err(AppError::InvalidInput(
                    "userPhone must look like 010-1234-5678".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailCheckResponse {
    pub is_duplicated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserNumResponse {
    pub user_num: i32,
}
