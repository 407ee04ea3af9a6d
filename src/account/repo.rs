use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::error::FetchFailure;

use super::model::{AccountRow, Identity, TradingAccount};

const ACCOUNTS_BY_OWNER: &str = r#"
    SELECT account_id, user_id, balance, currency, equity, margin, free_margin,
           leverage, status, account_type, created_at, watchlist
    FROM trading_accounts
    WHERE user_id = $1
    ORDER BY created_at DESC
"#;

const OWNER_BY_EMAIL: &str = r#"SELECT id FROM users WHERE email = $1"#;

#[async_trait]
pub trait DbConnection: Send + Sync {
    async fn fetch_accounts(&self, user_id: &str) -> Result<Vec<AccountRow>, sqlx::Error>;
    async fn fetch_user_id_by_email(&self, email: &str) -> Result<Option<String>, sqlx::Error>;
}

#[async_trait]
impl DbConnection for sqlx::PgPool {
    async fn fetch_accounts(&self, user_id: &str) -> Result<Vec<AccountRow>, sqlx::Error> {
        sqlx::query_as::<_, AccountRow>(ACCOUNTS_BY_OWNER)
            .bind(user_id)
            .fetch_all(self)
            .await
    }

    async fn fetch_user_id_by_email(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(OWNER_BY_EMAIL)
            .bind(email)
            .fetch_optional(self)
            .await?;
        Ok(row.map(|(id,)| id))
    }
}

#[cfg(feature = "test-sqlite")]
#[async_trait]
impl DbConnection for sqlx::SqlitePool {
    async fn fetch_accounts(&self, user_id: &str) -> Result<Vec<AccountRow>, sqlx::Error> {
        sqlx::query_as::<_, AccountRow>(ACCOUNTS_BY_OWNER)
            .bind(user_id)
            .fetch_all(self)
            .await
    }

    async fn fetch_user_id_by_email(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(OWNER_BY_EMAIL)
            .bind(email)
            .fetch_optional(self)
            .await?;
        Ok(row.map(|(id,)| id))
    }
}

/// Read side of the account store as the resolver sees it.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_accounts(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<TradingAccount>, FetchFailure>;
}

pub struct AccountRepository<DB: DbConnection> {
    db: DB,
}

impl<DB: DbConnection> AccountRepository<DB> {
    pub fn new(db: DB) -> Self {
        AccountRepository { db }
    }

    async fn canonical_owner(&self, identity: &Identity) -> Result<Option<String>, FetchFailure> {
        if identity.is_canonical() {
            return Ok(Some(identity.id.clone()));
        }
        let Some(email) = identity.email.as_deref() else {
            warn!(identity = %identity.id, "legacy identity without email, no accounts");
            return Ok(None);
        };
        let owner = self
            .db
            .fetch_user_id_by_email(email)
            .await
            .map_err(|e| {
                error!(identity = %identity.id, op = "owner_by_email", "query failed: {}", e);
                FetchFailure::DBQueryError(e)
            })?;
        match &owner {
            Some(id) => debug!(identity = %identity.id, owner = %id, "legacy identity mapped"),
            None => warn!(identity = %identity.id, "no user matches legacy identity email"),
        }
        Ok(owner)
    }
}

#[async_trait]
impl<DB: DbConnection> AccountSource for AccountRepository<DB> {
    async fn fetch_accounts(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<TradingAccount>, FetchFailure> {
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };
        let Some(owner) = self.canonical_owner(identity).await? else {
            return Ok(Vec::new());
        };

        let rows = self.db.fetch_accounts(&owner).await.map_err(|e| {
            error!(identity = %identity.id, op = "accounts_by_owner", "query failed: {}", e);
            FetchFailure::DBQueryError(e)
        })?;
        debug!(identity = %identity.id, count = rows.len(), "accounts fetched");

        rows.into_iter()
            .map(TradingAccount::try_from)
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| error!(identity = %identity.id, "account row rejected: {}", e))
    }
}
