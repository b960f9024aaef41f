//! Named connection registry with a TTL schema cache.
//!
//! The manager owns every registered connection, hands out shared handles,
//! and serves extracted schemas from a cache keyed by connection name. No
//! lock is held while an engine call is in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_lock::RwLock;

use crate::cipher::CredentialCipher;
use crate::config::ConnectorSettings;
use crate::drivers::ConnectionFactory;
use crate::error::{ConnectorError, Result};
use crate::traits::{
    BoxedConnection, ConnectionInfo, Credentials, NormalizedSchema, QueryResult, SharedConnection,
    Value,
};

#[derive(Debug, Clone)]
struct CachedSchema {
    schema: NormalizedSchema,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CachedSchema {
    fn new(schema: NormalizedSchema, now: Instant, ttl: Duration) -> Self {
        Self {
            schema,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Registry of named connections.
///
/// Cloning the manager shares the same registry and cache.
#[derive(Clone)]
pub struct ConnectionManager {
    cipher: Arc<CredentialCipher>,
    schema_ttl: Duration,
    connections: Arc<RwLock<HashMap<String, SharedConnection>>>,
    schemas: Arc<RwLock<HashMap<String, CachedSchema>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("schema_ttl", &self.schema_ttl)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager from settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the settings carry a malformed cipher key.
    pub fn new(settings: ConnectorSettings) -> Result<Self> {
        let cipher = CredentialCipher::new(&settings.fernet_key)?;
        Ok(Self {
            cipher: Arc::new(cipher),
            schema_ttl: settings.schema_ttl,
            connections: Arc::new(RwLock::new(HashMap::new())),
            schemas: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn schema_ttl(&self) -> Duration {
        self.schema_ttl
    }

    /// Encrypt a credential map with the manager's key.
    pub fn encrypt_credentials(&self, credentials: &Credentials) -> Result<String> {
        self.cipher.encrypt(credentials)
    }

    /// Decrypt a token produced by `encrypt_credentials`.
    pub fn decrypt_credentials(&self, token: &str) -> Result<Credentials> {
        self.cipher.decrypt(token)
    }

    /// Build an unconnected, unregistered connection.
    pub fn create_connection(
        &self,
        provider: &str,
        name: &str,
        config: &Credentials,
    ) -> Result<BoxedConnection> {
        ConnectionFactory::from_map(provider, name, config)
    }

    /// Register `connection` under `name`.
    ///
    /// A different connection already registered under the name is
    /// disconnected and its cached schema dropped.
    pub async fn register(&self, name: &str, connection: impl Into<SharedConnection>) {
        let connection = connection.into();
        let previous = self
            .connections
            .write()
            .await
            .insert(name.to_string(), connection.clone());

        let Some(previous) = previous else {
            tracing::debug!(connection = %name, provider = %connection.provider(), "registered");
            return;
        };
        if Arc::ptr_eq(&previous, &connection) {
            return;
        }

        self.invalidate_schema(name).await;
        if let Err(e) = previous.disconnect().await {
            tracing::warn!(
                connection = %name,
                provider = %previous.provider(),
                error = %e,
                "failed to disconnect replaced connection"
            );
        }
        tracing::info!(connection = %name, provider = %connection.provider(), "replaced connection");
    }

    /// Look up a registered connection.
    pub async fn get(&self, name: &str) -> Option<SharedConnection> {
        self.connections.read().await.get(name).cloned()
    }

    /// Disconnect and forget a connection. Unknown names are ignored.
    pub async fn disconnect(&self, name: &str) -> Result<()> {
        let Some(connection) = self.get(name).await else {
            return Ok(());
        };

        let result = connection.disconnect().await;

        {
            let mut connections = self.connections.write().await;
            // Only remove the entry if it was not replaced meanwhile
            if connections
                .get(name)
                .is_some_and(|current| Arc::ptr_eq(current, &connection))
            {
                connections.remove(name);
            }
        }
        self.invalidate_schema(name).await;
        result
    }

    /// Whether `name` is registered and currently connected.
    pub async fn health_check(&self, name: &str) -> bool {
        match self.get(name).await {
            Some(connection) => connection.is_connected().await,
            None => false,
        }
    }

    /// The normalized schema of `name`, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` on a cache miss for an unknown name, or the
    /// connection's extraction error.
    pub async fn schema_for(&self, name: &str) -> Result<NormalizedSchema> {
        if let Some(cached) = self.schemas.read().await.get(name) {
            if cached.is_fresh(Instant::now()) {
                tracing::debug!(connection = %name, "schema cache hit");
                return Ok(cached.schema.clone());
            }
        }

        tracing::debug!(connection = %name, "schema cache miss");
        let connection = self
            .get(name)
            .await
            .ok_or_else(|| ConnectorError::NotRegistered(name.to_string()))?;

        let schema = connection.get_schema().await?;
        let entry = CachedSchema::new(schema.clone(), Instant::now(), self.schema_ttl);
        self.schemas.write().await.insert(name.to_string(), entry);
        Ok(schema)
    }

    /// Drop the cached schema of `name`, if any.
    pub async fn invalidate_schema(&self, name: &str) {
        self.schemas.write().await.remove(name);
    }

    /// Decrypt credentials, then create, connect and register a connection.
    ///
    /// The plaintext credentials live only for the duration of this call.
    pub async fn open_encrypted(
        &self,
        provider: &str,
        name: &str,
        token: &str,
    ) -> Result<SharedConnection> {
        let connection: SharedConnection = {
            let credentials = self.decrypt_credentials(token)?;
            self.create_connection(provider, name, &credentials)?.into()
        };

        connection.connect().await?;
        self.register(name, connection.clone()).await;
        Ok(connection)
    }

    /// Execute a statement on a registered connection.
    pub async fn execute(&self, name: &str, sql: &str, args: &[Value]) -> Result<QueryResult> {
        let connection = self
            .get(name)
            .await
            .ok_or_else(|| ConnectorError::NotRegistered(name.to_string()))?;
        connection.execute(sql, args).await
    }

    /// Metadata for a registered connection.
    pub async fn connection_info(&self, name: &str) -> Option<ConnectionInfo> {
        match self.get(name).await {
            Some(connection) => Some(connection.info().await),
            None => None,
        }
    }

    /// Registered names, sorted.
    pub async fn connection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Disconnect and forget every registered connection.
    ///
    /// Every connection is attempted; the first failure is returned.
    pub async fn shutdown(&self) -> Result<()> {
        let mut first_error = None;
        for name in self.connection_names().await {
            if let Err(e) = self.disconnect(&name).await {
                tracing::warn!(connection = %name, error = %e, "disconnect failed during shutdown");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
