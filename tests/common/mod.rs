use brokerage_dashboard::account::model::{AccountStatus, AccountType};
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use sqlx::SqlitePool;

pub async fn setup_test_db() -> SqlitePool {
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let db_name = format!("test_{}", suffix);
    let database_url = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to create in-memory SQLite DB");

    for ddl in [
        "CREATE TABLE users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL
        );",
        "CREATE TABLE trading_accounts (
            account_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            balance BIGINT NOT NULL,
            currency TEXT NOT NULL,
            equity BIGINT NOT NULL,
            margin BIGINT NOT NULL,
            free_margin BIGINT NOT NULL,
            leverage INTEGER NOT NULL,
            status TEXT NOT NULL,
            account_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            watchlist TEXT
        );",
    ] {
        sqlx::query(ddl)
            .execute(&pool)
            .await
            .expect("Failed to create test table");
    }

    pool
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub async fn insert_user(pool: &SqlitePool, id: &str, email: &str) {
    sqlx::query("INSERT INTO users (id, email) VALUES (?, ?);")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .expect("Failed to insert test user");
}

pub async fn insert_account(
    pool: &SqlitePool,
    account_id: &str,
    user_id: &str,
    created_at: DateTime<Utc>,
    status: AccountStatus,
    account_type: AccountType,
) {
    let status = serde_json::to_value(status).unwrap();
    let account_type = serde_json::to_value(account_type).unwrap();
    sqlx::query(
        "INSERT INTO trading_accounts
            (account_id, user_id, balance, currency, equity, margin, free_margin,
             leverage, status, account_type, created_at, watchlist)
         VALUES (?, ?, 1000000, 'USD', 1000000, 0, 1000000, 100, ?, ?, ?, '[\"EURUSD\"]');",
    )
    .bind(account_id)
    .bind(user_id)
    .bind(status.as_str().unwrap())
    .bind(account_type.as_str().unwrap())
    .bind(created_at)
    .execute(pool)
    .await
    .expect("Failed to insert test account");
}
