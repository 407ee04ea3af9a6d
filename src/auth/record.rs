use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{account::model::Identity, error::CustomError};

/// Locally stored session, as written by the sign-in page.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn parse(raw: &str) -> Result<Self, CustomError> {
        serde_json::from_str(raw).map_err(CustomError::SessionRecordError)
    }

    pub fn into_identity(self) -> Result<Identity, CustomError> {
        if self.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(CustomError::SessionExpired);
        }
        Ok(Identity::new(self.user_id, self.email))
    }
}
