use std::sync::Arc;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{
        user::validate_password, LoginRequest, LoginResponse, NewUser, ProfileDto, ProfileUpdate,
        SignupRequest, SocialLoginRequest, User,
    },
    services::{
        mail::Mailer,
        password::{hash_password, verify_password},
        tokens::JwtTokenProvider,
    },
};

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Account workflows: login, registration, password reset and profile edits
pub struct UserService {
    store: Arc<dyn UserStore>,
    tokens: JwtTokenProvider,
    mailer: Arc<dyn Mailer>,
    password_reset_url: String,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: JwtTokenProvider,
        mailer: Arc<dyn Mailer>,
        password_reset_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            password_reset_url: password_reset_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &JwtTokenProvider {
        &self.tokens
    }

    fn login_response(&self, user: &User, message: &str) -> AppResult<LoginResponse> {
        Ok(LoginResponse {
            token: self.tokens.issue(user)?,
            email: user.user_email.clone(),
            name: user.user_name.clone(),
            user_num: user.user_num,
            message: message.to_string(),
        })
    }

    /// Password login. Social-only accounts have no password and cannot use it.
    pub async fn authenticate(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let user = self
            .store
            .find_by_email(request.user_email.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        let verified = user
            .user_pw
            .as_deref()
            .is_some_and(|hash| verify_password(&request.user_pw, hash));

        if !verified {
            tracing::info!(user_num = user.user_num, "Login rejected");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        tracing::info!(user_num = user.user_num, "Login succeeded");
        self.login_response(&user, "Login successful")
    }

    /// Finds the social account for an email, creating a password-less one
    /// on first use. An email that belongs to a password account is refused.
    pub async fn social_login(&self, request: &SocialLoginRequest) -> AppResult<LoginResponse> {
        let email = request.kakao_email.trim();
        if email.is_empty() {
            return Err(AppError::InvalidInput("kakaoEmail is required".to_string()));
        }

        let user = match self.store.find_by_email(email).await? {
            Some(user) if user.social_login => user,
            Some(user) => {
                tracing::info!(user_num = user.user_num, "Social login rejected for password account");
                return Err(AppError::Unauthorized(
                    "Email is registered with a password; use password login".to_string(),
                ));
            }
            None => {
                let name = match request.user_name.trim() {
                    "" => email.to_string(),
                    name => name.to_string(),
                };
                let user = self
                    .store
                    .insert(NewUser {
                        user_email: email.to_string(),
                        user_name: name,
                        user_pw: None,
                        user_phone: None,
                        social_login: true,
                    })
                    .await?;
                tracing::info!(user_num = user.user_num, "Social account created");
                user
            }
        };

        self.login_response(&user, "Social login successful")
    }

    pub async fn register(&self, request: &SignupRequest) -> AppResult<User> {
        request.validate()?;

        let email = request.user_email.trim();
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AppError::Duplicate(format!(
                "Email {} is already registered",
                email
            )));
        }

        let user = self
            .store
            .insert(NewUser {
                user_email: email.to_string(),
                user_name: request.user_name.trim().to_string(),
                user_pw: Some(hash_password(&request.user_pw)?),
                user_phone: Some(request.user_phone.trim().to_string()),
                social_login: false,
            })
            .await?;

        tracing::info!(user_num = user.user_num, "User registered");
        Ok(user)
    }

    pub async fn is_email_registered(&self, email: &str) -> AppResult<bool> {
        Ok(self.store.find_by_email(email.trim()).await?.is_some())
    }

    /// Sends one reset link when the email belongs to an account.
    ///
    /// Returns whether the email is registered. A mail failure is returned
    /// as an error and changes nothing else.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<bool> {
        if !self.is_email_registered(email).await? {
            return Ok(false);
        }

        let email = email.trim();
        let reset_url = format!("{}/{}", self.password_reset_url, email);
        self.mailer
            .send_password_reset(email, &reset_url)
            .await
            .map_err(|e| {
                tracing::error!(email = %email, error = %e, "Password reset mail failed");
                e
            })?;

        Ok(true)
    }

    pub async fn reset_password(&self, email: &str, new_password: &str) -> AppResult<()> {
        validate_password(new_password)?;

        let hash = hash_password(new_password)?;
        if !self.store.update_password(email.trim(), &hash).await? {
            return Err(AppError::NotFound(format!("User {} not found", email)));
        }

        tracing::info!("Password reset completed");
        Ok(())
    }

    pub async fn lookup_profile(&self, user_num: i32) -> AppResult<ProfileDto> {
        self.store
            .find_by_num(user_num)
            .await?
            .map(ProfileDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_num)))
    }

    pub async fn update_profile(
        &self,
        user_num: i32,
        update: &ProfileUpdate,
    ) -> AppResult<ProfileDto> {
        update.validate()?;

        let phone = update
            .user_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        self.store
            .update_profile(user_num, update.user_name.trim(), phone)
            .await?
            .map(ProfileDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_num)))
    }

    pub async fn user_num_by_name(&self, user_name: &str) -> AppResult<Option<i32>> {
        Ok(self
            .store
            .find_by_name(user_name)
            .await?
            .map(|u| u.user_num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryUserStore, services::mail::MockMailer};
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            user_email: email.to_string(),
            user_name: "Park".to_string(),
            user_pw: "password123".to_string(),
            user_phone: "010-1234-5678".to_string(),
        }
    }

    fn service_with(mailer: MockMailer) -> UserService {
        UserService::new(
            Arc::new(MemoryUserStore::new()),
            JwtTokenProvider::new("secret", 3600),
            Arc::new(mailer),
            "http://localhost:3000/change-pw/",
        )
    }

    fn service() -> UserService {
        service_with(MockMailer::new())
    }

    fn login(email: &str, pw: &str) -> LoginRequest {
        LoginRequest {
            user_email: email.to_string(),
            user_pw: pw.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let user = service.register(&signup("park@example.com")).await.unwrap();
        assert_ne!(user.user_pw.as_deref(), Some("password123"));

        let response = service
            .authenticate(&login("park@example.com", "password123"))
            .await
            .unwrap();

        assert_eq!(response.email, "park@example.com");
        assert_eq!(response.name, "Park");
        assert_eq!(response.user_num, user.user_num);
        let claims = service.tokens().verify(&response.token).unwrap();
        assert_eq!(claims.user_num, user.user_num);
    }

    #[tokio::test]
    async fn test_wrong_password_unauthorized() {
        let service = service();
        service.register(&signup("park@example.com")).await.unwrap();

        for request in [
            login("park@example.com", "password124"),
            login("nobody@example.com", "password123"),
        ] {
            assert!(matches!(
                service.authenticate(&request).await,
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service();
        service.register(&signup("park@example.com")).await.unwrap();

        let err = assert_err!(service.register(&signup("park@example.com")).await);
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_register_validates() {
        let request = SignupRequest {
            user_phone: "12345".to_string(),
            ..signup("park@example.com")
        };
        assert!(matches!(
            service().register(&request).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_social_login_creates_once() {
        let service = service();
        let request = SocialLoginRequest {
            kakao_email: "kakao@example.com".to_string(),
            user_name: "Choi".to_string(),
        };

        let first = service.social_login(&request).await.unwrap();
        let second = service.social_login(&request).await.unwrap();

        assert_eq!(first.user_num, second.user_num);
        assert_eq!(first.message, "Social login successful");

        // No password was ever set
        assert!(matches!(
            service
                .authenticate(&login("kakao@example.com", "anything-at-all"))
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_social_login_rejects_password_account() {
        let service = service();
        let user = service.register(&signup("park@example.com")).await.unwrap();

        let request = SocialLoginRequest {
            kakao_email: "park@example.com".to_string(),
            user_name: "Someone Else".to_string(),
        };
        let err = assert_err!(service.social_login(&request).await);
        assert!(matches!(err, AppError::Unauthorized(_)));

        // The password account is untouched and still logs in
        let response = service
            .authenticate(&login("park@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(response.user_num, user.user_num);
        assert_eq!(response.name, "Park");
    }

    #[tokio::test]
    async fn test_registered_email_sends_exactly_one_mail() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_password_reset()
            .with(
                eq("park@example.com"),
                eq("http://localhost:3000/change-pw/park@example.com"),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        let service = service_with(mailer);
        service.register(&signup("park@example.com")).await.unwrap();

        assert!(service.request_password_reset("park@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_email_sends_nothing() {
        let mut mailer = MockMailer::new();
        mailer.expect_send_password_reset().times(0);
        let service = service_with(mailer);

        assert!(!assert_ok!(service.request_password_reset("ghost@example.com").await));
        assert!(!service.is_email_registered("ghost@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_mail_failure_surfaces() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_password_reset()
            .returning(|_, _| Err(AppError::Mail("connection refused".to_string())));
        let service = service_with(mailer);
        service.register(&signup("park@example.com")).await.unwrap();

        assert!(matches!(
            service.request_password_reset("park@example.com").await,
            Err(AppError::Mail(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_password() {
        let service = service();
        service.register(&signup("park@example.com")).await.unwrap();

        service
            .reset_password("park@example.com", "new-password")
            .await
            .unwrap();

        assert_ok!(
            service
                .authenticate(&login("park@example.com", "new-password"))
                .await
        );
        assert!(matches!(
            service.reset_password("ghost@example.com", "new-password").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.reset_password("park@example.com", "short").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let service = service();
        let user = service.register(&signup("park@example.com")).await.unwrap();

        let updated = service
            .update_profile(
                user.user_num,
                &ProfileUpdate {
                    user_name: "Park Jiwoo".to_string(),
                    user_phone: Some("010-9999-0000".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.user_name, "Park Jiwoo");

        let profile = service.lookup_profile(user.user_num).await.unwrap();
        assert_eq!(profile, updated);
        assert!(matches!(
            service.lookup_profile(999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_num_by_name() {
        let service = service();
        let user = service.register(&signup("park@example.com")).await.unwrap();

        assert_eq!(
            service.user_num_by_name("Park").await.unwrap(),
            Some(user.user_num)
        );
        assert_eq!(service.user_num_by_name("Nobody").await.unwrap(), None);
    }
}
