//! OpenSearch client pool.

use bb8::{ManageConnection, Pool, PooledConnection, RunError};
use std::ops::Deref;
use trawl_log::info;

use crate::{
    client::OpenSearchClient,
    config::{PoolConfig, SearchConfig},
    error::{Result, SearchError},
};

/// Creates and checks [`OpenSearchClient`]s for the pool.
#[derive(Debug, Clone)]
pub struct ClientManager {
    config: SearchConfig,
}

impl ClientManager {
    /// Create a manager for clients built from `config`.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

impl ManageConnection for ClientManager {
    type Connection = OpenSearchClient;
    type Error = SearchError;

    async fn connect(&self) -> Result<OpenSearchClient> {
        OpenSearchClient::new(self.config.clone())
    }

    async fn is_valid(&self, conn: &mut OpenSearchClient) -> Result<()> {
        if conn.ping().await? {
            Ok(())
        } else {
            Err(SearchError::Transport("ping failed".to_string()))
        }
    }

    fn has_broken(&self, _conn: &mut OpenSearchClient) -> bool {
        false
    }
}

/// A client checked out of a [`ClientPool`], returned on drop.
pub struct PooledClient<'a> {
    conn: PooledConnection<'a, ClientManager>,
}

impl Deref for PooledClient<'_> {
    type Target = OpenSearchClient;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

/// Pool of OpenSearch clients.
///
/// Cheap to clone; clones share the same clients.
#[derive(Clone)]
pub struct ClientPool {
    pool: Pool<ClientManager>,
}

impl ClientPool {
    /// Build the pool, opening `min_idle` clients up front.
    pub async fn new(config: SearchConfig, pool_config: PoolConfig) -> Result<Self> {
        let urls = config.urls.clone();
        let pool = Pool::builder()
            .max_size(pool_config.max_size)
            .min_idle(pool_config.min_idle)
            .connection_timeout(pool_config.connection_timeout)
            .test_on_check_out(pool_config.test_on_check_out)
            .build(ClientManager::new(config))
            .await?;

        info!(
            "OpenSearch client pool created for {:?} (max {})",
            urls, pool_config.max_size
        );

        Ok(Self { pool })
    }

    /// Check out a client.
    pub async fn get(&self) -> Result<PooledClient<'_>> {
        let conn = self.pool.get().await.map_err(checkout_error)?;
        Ok(PooledClient { conn })
    }

    /// Check out a client not tied to the pool handle's lifetime.
    pub async fn get_owned(&self) -> Result<PooledClient<'static>> {
        let conn = self.pool.get_owned().await.map_err(checkout_error)?;
        Ok(PooledClient { conn })
    }

    /// Open and idle client counts.
    pub fn state(&self) -> (u32, u32) {
        let state = self.pool.state();
        (state.connections, state.idle_connections)
    }
}

fn checkout_error(err: RunError<SearchError>) -> SearchError {
    match err {
        RunError::User(e) => e,
        RunError::TimedOut => SearchError::Pool("timed out waiting for a client".to_string()),
    }
}
