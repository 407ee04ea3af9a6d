use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchFailure;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl FromStr for AccountStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, ()> {
        match value.to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "suspended" => Ok(AccountStatus::Suspended),
            "pending" => Ok(AccountStatus::Pending),
            _ => Err(()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Real,
    Standard,
    Premium,
    Vip,
    Demo,
    DemoStandard,
    DemoPremium,
}

impl AccountType {
    pub fn is_demo(self) -> bool {
        matches!(
            self,
            AccountType::Demo | AccountType::DemoStandard | AccountType::DemoPremium
        )
    }
}

impl FromStr for AccountType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, ()> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "real" => Ok(AccountType::Real),
            "standard" => Ok(AccountType::Standard),
            "premium" => Ok(AccountType::Premium),
            "vip" => Ok(AccountType::Vip),
            "demo" => Ok(AccountType::Demo),
            "demo_standard" => Ok(AccountType::DemoStandard),
            "demo_premium" => Ok(AccountType::DemoPremium),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Real => "Real",
            AccountType::Standard => "Standard",
            AccountType::Premium => "Premium",
            AccountType::Vip => "VIP",
            AccountType::Demo => "Demo",
            AccountType::DemoStandard => "Demo Standard",
            AccountType::DemoPremium => "Demo Premium",
        };
        f.write_str(label)
    }
}

/// Authenticated user reference scoping account ownership.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Canonical ids are the UUIDs issued by the user store. Anything else is a
    /// legacy session identifier that must be mapped through the e-mail.
    pub fn is_canonical(&self) -> bool {
        uuid::Uuid::parse_str(&self.id).is_ok()
    }
}

/// One brokerage account. Money fields are minor units of `currency`.
///
/// `equity` and `free_margin` are stored values, not derived from `balance`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TradingAccount {
    pub account_id: String,
    pub user_id: String,
    pub balance: i64,
    pub currency: String,
    pub equity: i64,
    pub margin: i64,
    pub free_margin: i64,
    pub leverage: i32,
    pub status: AccountStatus,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
    pub watchlist: Option<Vec<String>>,
}

/// Raw `trading_accounts` row before enum and watchlist decoding.
#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: String,
    pub user_id: String,
    pub balance: i64,
    pub currency: String,
    pub equity: i64,
    pub margin: i64,
    pub free_margin: i64,
    pub leverage: i32,
    pub status: String,
    pub account_type: String,
    pub created_at: DateTime<Utc>,
    pub watchlist: Option<String>,
}

impl TryFrom<AccountRow> for TradingAccount {
    type Error = FetchFailure;

    fn try_from(row: AccountRow) -> Result<Self, FetchFailure> {
        let decode = |field: &'static str, value: &str| FetchFailure::Decode {
            account_id: row.account_id.clone(),
            field,
            value: value.to_string(),
        };
        let status = row
            .status
            .parse::<AccountStatus>()
            .map_err(|_| decode("status", &row.status))?;
        let account_type = row
            .account_type
            .parse::<AccountType>()
            .map_err(|_| decode("account_type", &row.account_type))?;
        let watchlist = match row.watchlist.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                serde_json::from_str::<Vec<String>>(raw).map_err(|_| decode("watchlist", raw))?,
            ),
        };

        Ok(TradingAccount {
            account_id: row.account_id,
            user_id: row.user_id,
            balance: row.balance,
            currency: row.currency,
            equity: row.equity,
            margin: row.margin,
            free_margin: row.free_margin,
            leverage: row.leverage,
            status,
            account_type,
            created_at: row.created_at,
            watchlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(status: &str, account_type: &str, watchlist: Option<&str>) -> AccountRow {
        AccountRow {
            account_id: "acc-1".to_string(),
            user_id: "u1".to_string(),
            balance: 100_000,
            currency: "USD".to_string(),
            equity: 95_000,
            margin: 10_000,
            free_margin: 85_000,
            leverage: 100,
            status: status.to_string(),
            account_type: account_type.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            watchlist: watchlist.map(str::to_string),
        }
    }

    #[test]
    fn row_decodes_into_account() {
        let account =
            TradingAccount::try_from(row("Active", "demo-premium", Some(r#"["EURUSD","XAUUSD"]"#)))
                .unwrap();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.account_type, AccountType::DemoPremium);
        assert!(account.account_type.is_demo());
        assert_eq!(
            account.watchlist,
            Some(vec!["EURUSD".to_string(), "XAUUSD".to_string()])
        );
        assert_ne!(account.equity, account.balance);
    }

    #[test]
    fn unknown_status_is_a_decode_failure() {
        let err = TradingAccount::try_from(row("frozen", "real", None)).unwrap_err();
        assert!(matches!(err, FetchFailure::Decode { field: "status", .. }));
    }

    #[test]
    fn malformed_watchlist_is_a_decode_failure() {
        let err = TradingAccount::try_from(row("active", "vip", Some("EURUSD"))).unwrap_err();
        assert!(matches!(err, FetchFailure::Decode { field: "watchlist", .. }));
    }

    #[test]
    fn canonical_identity_is_a_uuid() {
        let canonical = Identity::new("7d1b0c1e-9d2a-4c55-8f0e-1f6f3b9c2a11", None);
        let legacy = Identity::new("session_8812", Some("jane@example.com".to_string()));
        assert!(canonical.is_canonical());
        assert!(!legacy.is_canonical());
    }
}
