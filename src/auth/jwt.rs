use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::CustomError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

pub fn decoding_key(public_key_pem: &str) -> Result<DecodingKey, CustomError> {
    DecodingKey::from_rsa_pem(public_key_pem.replace("\\n", "\n").as_bytes())
        .map_err(CustomError::DecodeKeyError)
}

pub fn verify_jwt(token: &str, key: &DecodingKey) -> Result<Claims, CustomError> {
    let validation = Validation::new(Algorithm::RS256);
    let data = decode::<Claims>(token, key, &validation).map_err(CustomError::TokenError)?;
    Ok(data.claims)
}
