use std::env;

use dotenvy::dotenv;

use crate::{error::CustomError, utils::Locale};

pub struct Config {
    pub database_url: String,
    pub jwt_public_key: String,
    pub addr: String,
    pub locale: Locale,
    pub max_connections: u32,
    pub min_connections: u32,
    pub session_idle_secs: u32,
    pub accept_session_records: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, CustomError> {
        dotenv().ok(); // Load environment variables

        let locale_tag = optional("DASHBOARD_LOCALE", "en-US");
        let locale = locale_tag
            .parse::<Locale>()
            .map_err(|_| CustomError::EnvValueError("DASHBOARD_LOCALE".to_string(), locale_tag))?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            jwt_public_key: required("JWT_PUBLIC_KEY")?,
            addr: optional("DASHBOARD_ADDR", "127.0.0.1:7879"),
            locale,
            max_connections: number("DB_MAX_CONNECTIONS", 10)?,
            min_connections: number("DB_MIN_CONNECTIONS", 5)?,
            session_idle_secs: number("SESSION_IDLE_SECS", 1800)?,
            accept_session_records: flag("DASHBOARD_ACCEPT_SESSION_RECORDS")?,
        })
    }
}

fn required(key: &str) -> Result<String, CustomError> {
    env::var(key).map_err(|e| CustomError::EnvError(key.to_string(), e))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn number(key: &str, default: u32) -> Result<u32, CustomError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| CustomError::EnvValueError(key.to_string(), value)),
        Err(_) => Ok(default),
    }
}

fn flag(key: &str) -> Result<bool, CustomError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => Err(CustomError::EnvValueError(key.to_string(), value)),
        },
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_falls_back_to_default() {
        assert_eq!(number("BROKERAGE_DASHBOARD_UNSET_NUMBER", 7).unwrap(), 7);
    }

    #[test]
    fn unset_flag_is_off() {
        assert!(!flag("BROKERAGE_DASHBOARD_UNSET_FLAG").unwrap());
    }

    #[test]
    fn missing_required_reports_key() {
        let err = required("BROKERAGE_DASHBOARD_UNSET_KEY").unwrap_err();
        assert_eq!(err.to_string(), "ENV 'BROKERAGE_DASHBOARD_UNSET_KEY' Not Found");
    }
}
