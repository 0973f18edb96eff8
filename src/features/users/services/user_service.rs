use std::sync::Arc;

use crate::core::error::Result;
use crate::features::auth::services::hash_password;
use crate::features::users::dtos::{CreateUserDto, UserResponseDto};
use crate::features::users::models::NewUser;
use crate::features::users::repositories::UserRepository;
use crate::shared::types::PaginationQuery;
use crate::shared::utils::normalize_email;

/// Service for admin user management
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn list(&self, pagination: &PaginationQuery) -> Result<(Vec<UserResponseDto>, i64)> {
        let users = self
            .users
            .list(pagination.limit(), pagination.offset())
            .await?;
        let total = self.users.count().await?;
        Ok((users.into_iter().map(Into::into).collect(), total))
    }

    pub async fn create(&self, dto: CreateUserDto) -> Result<UserResponseDto> {
        let user = self
            .users
            .create(NewUser {
                name: dto.name.trim().to_string(),
                email: normalize_email(&dto.email),
                password_hash: hash_password(&dto.password)?,
                role: dto.role.unwrap_or_default(),
            })
            .await?;

        tracing::info!("User created: id={}, role={}", user.id, user.role.as_str());
        Ok(user.into())
    }
}
