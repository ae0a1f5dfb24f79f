//! Schema-agnostic query building for PostgreSQL record stores.
//!
//! This crate turns declarative search requests into parameterized SQL:
//! - [`SearchPredicate`]: flat AND/OR trees of field comparisons over an allow-listed column set
//! - [`compile`]: recursive predicate compilation into a [`CompiledClause`] with `$n` placeholders
//! - [`Pagination`] / [`SortSpec`]: validated paging windows and ORDER BY clauses
//! - [`RelationshipDescriptor`]: has-many / belongs-to / many-to-many lookups for record enrichment
//!
//! Nothing here performs I/O. Column identifiers only ever reach SQL through
//! [`Column::name`], so callers cannot smuggle free text into a statement.

mod column;
mod compile;
mod error;
mod fields;
mod pagination;
mod predicate;
mod relationship;
mod request;
mod sort;
mod value;

pub use column::Column;
pub use compile::{compile, escape_like, text_search_clause, Binds, CompiledClause};
pub use error::{QueryError, Result};
pub use fields::{field_set_from_json, FieldSet};
pub use pagination::{total_pages, PageInfo, PageRequest, Pagination, RecordEnvelope};
pub use predicate::{
    Comparison, FieldPredicate, FieldTest, Operand, Operator, PredicateInput, SearchPredicate,
};
pub use relationship::RelationshipDescriptor;
pub use request::{SearchRequest, TextSearch};
pub use sort::{SortDirection, SortSpec};
pub use value::{ColumnKind, Record, Scalar};
