//! Relationship descriptors used to enrich a fetched record.

use serde_json::Value as JsonValue;

use crate::value::{Record, Scalar};

/// How to fetch rows associated with a root record.
///
/// Each variant carries only the keys its join needs. Every descriptor turns
/// into exactly one statement with a single `$1` parameter: the root's
/// value for [`source_key`](Self::source_key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipDescriptor {
    /// `target.foreign_key = root.local_key`, many rows ordered by
    /// `target_key`.
    HasMany {
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        foreign_key: &'static str,
        local_key: &'static str,
    },
    /// `target.target_key = root.foreign_key`, at most one row.
    BelongsTo {
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        foreign_key: &'static str,
    },
    /// Target rows linked through a junction table.
    ManyToMany {
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        junction: &'static str,
        junction_local_key: &'static str,
        junction_target_key: &'static str,
        local_key: &'static str,
    },
}

impl RelationshipDescriptor {
    pub const fn has_many(
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self::HasMany {
            result_key,
            target,
            target_key,
            foreign_key,
            local_key,
        }
    }

    pub const fn belongs_to(
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self::BelongsTo {
            result_key,
            target,
            target_key,
            foreign_key,
        }
    }

    pub const fn many_to_many(
        result_key: &'static str,
        target: &'static str,
        target_key: &'static str,
        junction: &'static str,
        junction_local_key: &'static str,
        junction_target_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self::ManyToMany {
            result_key,
            target,
            target_key,
            junction,
            junction_local_key,
            junction_target_key,
            local_key,
        }
    }

    /// Key the resolved value is attached under.
    pub fn result_key(&self) -> &'static str {
        match *self {
            Self::HasMany { result_key, .. }
            | Self::BelongsTo { result_key, .. }
            | Self::ManyToMany { result_key, .. } => result_key,
        }
    }

    pub fn target(&self) -> &'static str {
        match *self {
            Self::HasMany { target, .. }
            | Self::BelongsTo { target, .. }
            | Self::ManyToMany { target, .. } => target,
        }
    }

    /// Column of the root record whose value drives the lookup.
    pub fn source_key(&self) -> &'static str {
        match *self {
            Self::HasMany { local_key, .. } | Self::ManyToMany { local_key, .. } => local_key,
            Self::BelongsTo { foreign_key, .. } => foreign_key,
        }
    }

    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::BelongsTo { .. })
    }

    /// `[]` for collections, `null` for belongs-to.
    pub fn empty_value(&self) -> JsonValue {
        if self.is_collection() {
            JsonValue::Array(Vec::new())
        } else {
            JsonValue::Null
        }
    }

    /// Lookup value taken from the root record.
    ///
    /// `None` when the key is absent, null, or not a scalar; there is
    /// nothing to join on in that case.
    pub fn lookup_value(&self, root: &Record) -> Option<Scalar> {
        root.get(self.source_key())
            .and_then(Scalar::from_json)
            .filter(|v| !v.is_null())
    }

    /// Statement for this relationship; binds the lookup value as `$1`.
    pub fn query_sql(&self) -> String {
        match *self {
            Self::HasMany {
                target,
                target_key,
                foreign_key,
                ..
            } => format!(
                "SELECT to_jsonb(t) AS record FROM {target} t WHERE t.{foreign_key} = $1 \
                 ORDER BY t.{target_key}"
            ),
            Self::BelongsTo {
                target, target_key, ..
            } => format!(
                "SELECT to_jsonb(t) AS record FROM {target} t WHERE t.{target_key} = $1 LIMIT 1"
            ),
            Self::ManyToMany {
                target,
                target_key,
                junction,
                junction_local_key,
                junction_target_key,
                ..
            } => format!(
                "SELECT DISTINCT ON (t.{target_key}) to_jsonb(t) AS record \
                 FROM {target} t \
                 INNER JOIN {junction} j ON j.{junction_target_key} = t.{target_key} \
                 WHERE j.{junction_local_key} = $1 \
                 ORDER BY t.{target_key}"
            ),
        }
    }

    /// Shape fetched rows into the attached value.
    pub fn shape(&self, mut rows: Vec<Record>) -> JsonValue {
        if self.is_collection() {
            JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect())
        } else if rows.is_empty() {
            JsonValue::Null
        } else {
            JsonValue::Object(rows.swap_remove(0))
        }
    }
}
