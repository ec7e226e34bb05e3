use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims of the bearer tokens issued by the session system.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // recipient identity
    pub role: String,
    pub exp: i64,
}

/// Verify JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

/// Issue a short-lived access token. Sessions are owned elsewhere; this is for
/// service accounts and tests.
pub fn create_access_token(subject: &str, role: &str, secret: &str) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::minutes(15)).timestamp();

    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Unauthorized("Failed to create access token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = create_access_token("alice", "employee", "secret").unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, "employee");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token("alice", "employee", "secret").unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
