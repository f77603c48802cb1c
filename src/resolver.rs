//! Polymorphic document reference resolution
//!
//! Ledger rows carry (reference_type, reference_id) with no schema-level
//! foreign key, because the originating documents live in many producer
//! tables. Each document kind registers a `DocumentResolver`; the orphan
//! auditor resolves through the registry. A kind with no registered
//! resolver is *unknown*, which is not the same as orphaned.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::contracts::posting_event_v1::DocKind;

/// Capability interface: can this document id still be found?
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    async fn resolve(&self, pool: &PgPool, id: &str) -> Result<bool, sqlx::Error>;
}

/// Resolver backed by an id-existence check on a single table
///
/// The table name is fixed at registration time, never taken from data.
pub struct TableResolver {
    table: &'static str,
}

impl TableResolver {
    pub fn new(table: &'static str) -> Self {
        TableResolver { table }
    }
}

#[async_trait]
impl DocumentResolver for TableResolver {
    async fn resolve(&self, pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id::text = $1)",
            self.table
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(pool)
            .await
    }
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Exists,
    Missing,
    /// No resolver registered for the kind; skip and report, never delete
    UnknownKind,
}

/// Lookup table from document kind to its resolver
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<DocKind, Box<dyn DocumentResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: DocKind, resolver: Box<dyn DocumentResolver>) -> &mut Self {
        self.resolvers.insert(kind, resolver);
        self
    }

    /// Resolve a raw (reference_type, reference_id) pair.
    ///
    /// Ledger-internal kinds (opening balance, balance adjustment, reversal)
    /// have no backing document and always resolve as present. A tag that
    /// does not parse to a known `DocKind`, or a kind with no resolver,
    /// is `UnknownKind`.
    pub async fn resolve(
        &self,
        pool: &PgPool,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Resolution, sqlx::Error> {
        let Some(kind) = DocKind::from_str_tag(reference_type) else {
            return Ok(Resolution::UnknownKind);
        };

        if kind.is_internal() {
            return Ok(Resolution::Exists);
        }

        match self.resolvers.get(&kind) {
            Some(resolver) => {
                if resolver.resolve(pool, reference_id).await? {
                    Ok(Resolution::Exists)
                } else {
                    Ok(Resolution::Missing)
                }
            }
            None => Ok(Resolution::UnknownKind),
        }
    }

    pub fn is_registered(&self, kind: DocKind) -> bool {
        self.resolvers.contains_key(&kind)
    }
}
