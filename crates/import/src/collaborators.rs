//! External collaborator interfaces.
//!
//! The pipeline treats authorization, key management, audit persistence,
//! cache invalidation/change notification, and derived-aggregate
//! recomputation as external services behind traits. The default
//! implementations log and succeed (or report "no key"), so the pipeline
//! runs standalone in tests and internal tooling.
//!
//! Audit, cache, and aggregate collaborators are best-effort: their
//! failures are logged by the orchestrators and never gate an import.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use ledgerly_core::error::CoreError;
use ledgerly_core::pii::TenantKey;
use ledgerly_core::types::EntityId;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The acting principal returned by a successful authorization check.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: EntityId,
    pub role: String,
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorize `action` for the tenant, requiring at least
    /// `required_role`. Errors are fatal to the import.
    async fn authorize(
        &self,
        action: &str,
        required_role: &str,
        tenant_id: EntityId,
    ) -> Result<Actor, CoreError>;
}

#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Fetch the tenant's data-encryption key. An error means "no key
    /// available"; PII-bearing imports then proceed unencrypted with a
    /// logged warning rather than failing.
    async fn tenant_key(&self, tenant_id: EntityId) -> Result<TenantKey, CoreError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        action: &str,
        entity_kind: &str,
        tenant_id: EntityId,
        details: serde_json::Value,
    ) -> Result<(), CoreError>;
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, tag: &str) -> Result<(), CoreError>;

    async fn notify(&self, tenant_id: EntityId, entity_kind: &str) -> Result<(), CoreError>;
}

#[async_trait]
pub trait AggregateResync: Send + Sync {
    /// Recompute the daily aggregate report for one affected date.
    async fn resync_daily(&self, date: NaiveDate, tenant_id: EntityId) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Default implementations
// ---------------------------------------------------------------------------

/// Grants every request. Used by trusted internal callers and tests; a
/// deployment wires the real authorization service here.
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(
        &self,
        action: &str,
        required_role: &str,
        tenant_id: EntityId,
    ) -> Result<Actor, CoreError> {
        tracing::debug!(action, required_role, tenant_id = %tenant_id, "Authorization bypassed (allow-all)");
        Ok(Actor {
            id: EntityId::nil(),
            role: required_role.to_string(),
        })
    }
}

/// Reports that no key management is configured; imports store PII
/// unencrypted and warn.
pub struct NoKeyProvider;

#[async_trait]
impl KeyProvider for NoKeyProvider {
    async fn tenant_key(&self, _tenant_id: EntityId) -> Result<TenantKey, CoreError> {
        Err(CoreError::Internal(
            "No key management collaborator configured".to_string(),
        ))
    }
}

/// Serves one fixed key for every tenant. Test and single-box deployments.
pub struct StaticKeyProvider(pub TenantKey);

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn tenant_key(&self, _tenant_id: EntityId) -> Result<TenantKey, CoreError> {
        Ok(self.0.clone())
    }
}

/// Logs audit records instead of persisting them.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(
        &self,
        action: &str,
        entity_kind: &str,
        tenant_id: EntityId,
        details: serde_json::Value,
    ) -> Result<(), CoreError> {
        tracing::info!(action, entity_kind, tenant_id = %tenant_id, %details, "audit");
        Ok(())
    }
}

/// Logs invalidations and notifications instead of dispatching them.
pub struct LogCacheInvalidator;

#[async_trait]
impl CacheInvalidator for LogCacheInvalidator {
    async fn invalidate(&self, tag: &str) -> Result<(), CoreError> {
        tracing::debug!(tag, "cache invalidate");
        Ok(())
    }

    async fn notify(&self, tenant_id: EntityId, entity_kind: &str) -> Result<(), CoreError> {
        tracing::debug!(tenant_id = %tenant_id, entity_kind, "change notification");
        Ok(())
    }
}

/// Logs aggregate resync requests instead of recomputing.
pub struct LogAggregateResync;

#[async_trait]
impl AggregateResync for LogAggregateResync {
    async fn resync_daily(&self, date: NaiveDate, tenant_id: EntityId) -> Result<(), CoreError> {
        tracing::debug!(%date, tenant_id = %tenant_id, "daily aggregate resync");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Bundle of collaborator handles passed into every orchestrator run.
#[derive(Clone)]
pub struct Collaborators {
    pub authorizer: Arc<dyn Authorizer>,
    pub keys: Arc<dyn KeyProvider>,
    pub audit: Arc<dyn AuditSink>,
    pub cache: Arc<dyn CacheInvalidator>,
    pub aggregates: Arc<dyn AggregateResync>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            authorizer: Arc::new(AllowAllAuthorizer),
            keys: Arc::new(NoKeyProvider),
            audit: Arc::new(LogAuditSink),
            cache: Arc::new(LogCacheInvalidator),
            aggregates: Arc::new(LogAggregateResync),
        }
    }
}
