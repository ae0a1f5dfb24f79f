use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use crate::column::Column;
use crate::error::Result;
use crate::value::Scalar;

/// Column values of a create or update, keyed by allow-listed column.
///
/// Ordered by column declaration so generated INSERT/UPDATE statements are
/// deterministic.
pub type FieldSet<C> = BTreeMap<C, Scalar>;

/// Build a [`FieldSet`] from a JSON object, coercing each value by column kind.
///
/// Keys outside the allow-list of `C` are rejected.
pub fn field_set_from_json<C: Column>(object: &Map<String, JsonValue>) -> Result<FieldSet<C>> {
    object
        .iter()
        .map(|(key, value)| {
            let column = C::resolve(key)?;
            let scalar = column.kind().coerce_json(column.name(), value)?;
            Ok((column, scalar))
        })
        .collect()
}
