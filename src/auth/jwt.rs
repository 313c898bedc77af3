use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Verify a token issued by the identity service. This backend never
/// issues tokens itself.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
