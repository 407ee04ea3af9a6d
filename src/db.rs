use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{config::Config, error::CustomError};

pub struct Database;

impl Database {
    pub async fn new_pool(config: &Config) -> Result<PgPool, CustomError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await
            .map_err(CustomError::DBConnectionError)?;
        tracing::info!(
            size = pool.size(),
            idle = pool.num_idle(),
            "database pool ready"
        );
        Ok(pool)
    }
}
