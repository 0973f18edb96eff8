use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::model::{AuthenticatedUser, Claims};
use crate::core::config::JwtConfig;
use crate::core::error::AppError;

pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway.as_secs();
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::services::TokenService;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::test_jwt_config;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_issued_token_round_trips_identity() {
        let config = test_jwt_config();
        let token = TokenService::new(&config)
            .create_token(42, "a@example.com", UserRole::Admin)
            .unwrap();

        let user = JwtValidator::new(&config).validate_token(&token).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.email, "a@example.com");
        assert!(user.is_admin());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let mut other = test_jwt_config();
        other.secret = "a-completely-different-secret-value".to_string();
        let token = TokenService::new(&other)
            .create_token(1, "a@example.com", UserRole::User)
            .unwrap();

        let err = JwtValidator::new(&test_jwt_config())
            .validate_token(&token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = test_jwt_config();
        let claims = Claims {
            sub: "1".to_string(),
            email: "a@example.com".to_string(),
            role: UserRole::User,
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(JwtValidator::new(&config).validate_token(&token).is_err());
    }
}
