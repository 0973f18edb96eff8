use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{AuthResponseDto, SignInDto, SignUpDto};
use crate::features::auth::services::{hash_password, verify_password, TokenService};
use crate::features::users::dtos::UserResponseDto;
use crate::features::users::models::{NewUser, User, UserRole};
use crate::features::users::repositories::UserRepository;
use crate::shared::utils::normalize_email;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Local email/password authentication
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Registers a `user`-role account and signs it in
    pub async fn sign_up(&self, dto: SignUpDto) -> Result<AuthResponseDto> {
        let email = normalize_email(&dto.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = self
            .users
            .create(NewUser {
                name: dto.name.trim().to_string(),
                email,
                password_hash: hash_password(&dto.password)?,
                role: UserRole::User,
            })
            .await?;

        tracing::info!("User signed up: id={}", user.id);
        self.issue(user)
    }

    pub async fn sign_in(&self, dto: SignInDto) -> Result<AuthResponseDto> {
        let email = normalize_email(&dto.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&dto.password, &user.password_hash)? {
            tracing::debug!("Rejected sign-in for user id={}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue(user)
    }

    pub async fn me(&self, user_id: i64) -> Result<UserResponseDto> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }

    fn issue(&self, user: User) -> Result<AuthResponseDto> {
        let access_token = self.tokens.create_token(user.id, &user.email, user.role)?;
        Ok(AuthResponseDto {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
            user: user.into(),
        })
    }
}
