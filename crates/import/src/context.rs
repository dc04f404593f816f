//! Shared dependencies for one import invocation.

use std::time::Duration;

use ledgerly_core::config::ImportConfig;
use ledgerly_db::bulk::BulkUpsertExecutor;
use ledgerly_db::catalog::SchemaCatalog;
use ledgerly_db::DbPool;

use crate::collaborators::Collaborators;

/// Everything an orchestrator needs: the pool, the injected schema
/// catalog, configuration, and the external collaborators.
#[derive(Clone)]
pub struct ImportContext {
    pub pool: DbPool,
    pub catalog: SchemaCatalog,
    pub config: ImportConfig,
    pub collaborators: Collaborators,
    /// Trusted internal callers (seeders, migrations tooling) skip the
    /// authorization collaborator.
    pub trusted: bool,
}

impl ImportContext {
    pub fn new(pool: DbPool, config: ImportConfig) -> Self {
        let catalog = SchemaCatalog::new(
            pool.clone(),
            Duration::from_secs(config.schema_cache_ttl_secs),
        );
        Self {
            pool,
            catalog,
            config,
            collaborators: Collaborators::default(),
            trusted: false,
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Mark this context as a trusted internal caller.
    pub fn into_trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub(crate) fn executor(&self) -> BulkUpsertExecutor {
        BulkUpsertExecutor::new(self.pool.clone(), self.config.bulk_chunk_size)
    }
}
