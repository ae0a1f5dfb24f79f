use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{QueryError, Result};
use crate::value::ColumnKind;

/// Allow-listed column of one table.
///
/// Implemented by a closed enum per table (see [`columns!`](crate::columns)).
/// The predicate compiler, sort builder and write paths only accept values of
/// this type, so an identifier that is not in the allow-list cannot be
/// expressed.
pub trait Column: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Table the columns belong to.
    const TABLE: &'static str;

    /// SQL identifier of the column.
    fn name(&self) -> &'static str;

    /// Storage class used to coerce raw input.
    fn kind(&self) -> ColumnKind;

    /// Every allow-listed column, in declaration order.
    fn all() -> &'static [Self];

    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.name() == name)
    }

    fn resolve(name: &str) -> Result<Self> {
        Self::parse(name).ok_or_else(|| QueryError::UnknownColumn {
            table: Self::TABLE,
            column: name.to_string(),
        })
    }
}

/// Declare the allow-listed column enum of a table.
///
/// ```
/// molstore_query::columns! {
///     pub enum UserColumn in "users" {
///         Id => "id": Integer,
///         Name => "name": Text,
///     }
/// }
///
/// use molstore_query::Column;
/// assert_eq!(UserColumn::parse("name"), Some(UserColumn::Name));
/// assert_eq!(UserColumn::TABLE, "users");
/// ```
#[macro_export]
macro_rules! columns {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident in $table:literal {
            $( $variant:ident => $column:literal : $kind:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $( $variant ),+
        }

        impl $crate::Column for $name {
            const TABLE: &'static str = $table;

            fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $column ),+
                }
            }

            fn kind(&self) -> $crate::ColumnKind {
                match self {
                    $( Self::$variant => $crate::ColumnKind::$kind ),+
                }
            }

            fn all() -> &'static [Self] {
                &[ $( Self::$variant ),+ ]
            }
        }
    };
}
