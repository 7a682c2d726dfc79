//! Database connection management.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use picsync_config::DbCredentials;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::instrument;

// One query, run once. A pool of one is plenty.
const MAX_CONNECTIONS: u32 = 1;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to the activity-log database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Connect to the database described by `credentials`.
    #[instrument(skip(credentials), fields(host = %credentials.host, dbname = %credentials.dbname))]
    pub async fn connect(credentials: &DbCredentials) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(Self::options(credentials))
            .await
            .or_raise(|| ErrorKind::Connect)?;
        Ok(Self { pool })
    }

    fn options(credentials: &DbCredentials) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.username)
            .password(&credentials.password)
            .database(&credentials.dbname)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close the connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
