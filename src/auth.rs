pub mod jwt;
pub mod record;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::DecodingKey;

use crate::{account::model::Identity, error::CustomError};

/// Where a request's identity comes from.
pub enum SessionSource<'a> {
    /// Bearer token issued by the auth server.
    Token(&'a str),
    /// Session record kept on the client, serialized as JSON.
    Record(&'a str),
}

/// An identity together with the moment its session stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub identity: Identity,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn resolve_identity(
    source: SessionSource<'_>,
    key: &DecodingKey,
) -> Result<SessionIdentity, CustomError> {
    match source {
        SessionSource::Token(token) => {
            let claims = jwt::verify_jwt(token, key)?;
            Ok(SessionIdentity {
                expires_at: Utc.timestamp_opt(claims.exp as i64, 0).single(),
                identity: Identity::new(claims.sub, claims.email),
            })
        }
        SessionSource::Record(raw) => {
            let record = record::SessionRecord::parse(raw)?;
            let expires_at = record.expires_at;
            Ok(SessionIdentity {
                identity: record.into_identity()?,
                expires_at,
            })
        }
    }
}
