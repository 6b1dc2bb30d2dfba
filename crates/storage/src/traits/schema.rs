use async_trait::async_trait;

use crate::error::StorageError;

#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Create missing tables, indexes, trigger and access policies.
    ///
    /// Idempotent. Fails with [`StorageError::SchemaDrift`] when an existing
    /// structure does not match the expected shape; nothing is altered then.
    async fn ensure_schema(&self) -> Result<(), StorageError>;
}
