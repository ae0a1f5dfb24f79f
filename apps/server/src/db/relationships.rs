//! Relationship resolution for fetched records

use futures::future::join_all;
use molstore_query::{Record, RelationshipDescriptor};
use serde_json::Value as JsonValue;

use super::executor::Executor;

/// Attach every relationship in `relationships` to a copy of `root`.
///
/// Lookups run concurrently. A relationship whose key is missing or null on
/// the root resolves to its empty value without touching the database; one
/// whose statement fails is logged and also resolves to its empty value, so
/// the root is always returned.
pub async fn resolve_relationships(
    executor: &dyn Executor,
    root: &Record,
    relationships: &[RelationshipDescriptor],
) -> Record {
    let lookups = relationships
        .iter()
        .map(|relationship| resolve_one(executor, root, relationship));
    let resolved = join_all(lookups).await;

    let mut enriched = root.clone();
    for (relationship, value) in relationships.iter().zip(resolved) {
        enriched.insert(relationship.result_key().to_string(), value);
    }
    enriched
}

async fn resolve_one(
    executor: &dyn Executor,
    root: &Record,
    relationship: &RelationshipDescriptor,
) -> JsonValue {
    let Some(lookup) = relationship.lookup_value(root) else {
        return relationship.empty_value();
    };

    match executor
        .execute(&relationship.query_sql(), std::slice::from_ref(&lookup))
        .await
    {
        Ok(rows) => relationship.shape(rows),
        Err(e) => {
            crate::metrics::RELATIONSHIP_FAILURES_TOTAL
                .with_label_values(&[relationship.target(), relationship.result_key()])
                .inc();
            tracing::warn!(
                relationship = relationship.result_key(),
                target = relationship.target(),
                key = %lookup,
                error = %e,
                "Relationship lookup failed, returning empty value"
            );
            relationship.empty_value()
        }
    }
}
