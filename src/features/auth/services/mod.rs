mod auth_service;
mod password;
mod token_service;

pub use auth_service::AuthService;
pub use password::{hash_password, verify_password};
pub use token_service::TokenService;
