use std::{error::Error, fmt::Debug};

#[derive(thiserror::Error)]
pub enum CustomError {
    #[error("ENV '{0}' Not Found")]
    EnvError(String, #[source] std::env::VarError),

    #[error("ENV '{0}' has an invalid value '{1}'")]
    EnvValueError(String, String),

    #[error("Error decode public key")]
    DecodeKeyError(#[source] jsonwebtoken::errors::Error),

    #[error("Session token rejected")]
    TokenError(#[source] jsonwebtoken::errors::Error),

    #[error("Session record invalid")]
    SessionRecordError(#[source] serde_json::Error),

    #[error("Session expired")]
    SessionExpired,

    #[error("Database connection")]
    DBConnectionError(#[source] sqlx::Error),
}

/// Failure of the account store, kept apart from "no accounts".
#[derive(thiserror::Error)]
pub enum FetchFailure {
    #[error("Database query")]
    DBQueryError(#[source] sqlx::Error),

    #[error("Account row '{account_id}' has invalid {field} '{value}'")]
    Decode {
        account_id: String,
        field: &'static str,
        value: String,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Account '{0}' is not one of the known accounts")]
    InvalidSelection(String),
}

fn write_with_source(err: &dyn Error, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", err)?;
    if let Some(source) = err.source() {
        write!(f, " (Caused by: {})", source)?;
    }
    Ok(())
}

impl Debug for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_with_source(self, f)
    }
}

impl Debug for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_with_source(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_includes_cause() {
        let err = FetchFailure::DBQueryError(sqlx::Error::PoolTimedOut);
        let rendered = format!("{:?}", err);
        assert!(rendered.starts_with("Database query"));
        assert!(rendered.contains("(Caused by:"));
    }

    #[test]
    fn decode_failure_names_the_field() {
        let err = FetchFailure::Decode {
            account_id: "acc-1".to_string(),
            field: "status",
            value: "frozen".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Account row 'acc-1' has invalid status 'frozen'"
        );
    }
}
