use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::Column;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// ORDER BY over one allow-listed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<C: Column> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: Column> SortSpec<C> {
    pub fn new(column: C, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    pub fn asc(column: C) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: C) -> Self {
        Self::new(column, SortDirection::Desc)
    }

    /// Resolve a requested sort against the sortable allow-list.
    ///
    /// A leading `-` on `field` means descending unless `direction` says
    /// otherwise. A missing field, or one outside `sortable`, falls back to
    /// `default.column`; an unparseable direction falls back to
    /// `default.direction` (or to the `-` prefix when present).
    pub fn resolve(
        field: Option<&str>,
        direction: Option<&str>,
        sortable: &[C],
        default: Self,
    ) -> Self {
        let field = field.map(str::trim).filter(|f| !f.is_empty());
        let (name, prefixed_desc) = match field {
            Some(f) => match f.strip_prefix('-') {
                Some(rest) => (Some(rest), true),
                None => (Some(f), false),
            },
            None => (None, false),
        };

        let column = name
            .and_then(C::parse)
            .filter(|c| sortable.contains(c))
            .unwrap_or(default.column);

        let direction = direction
            .and_then(SortDirection::parse)
            .unwrap_or(if prefixed_desc {
                SortDirection::Desc
            } else if name.is_some() {
                SortDirection::Asc
            } else {
                default.direction
            });

        Self { column, direction }
    }

    /// ` ORDER BY` clause with `tie_breaker` appended for a stable page order.
    pub fn order_by_sql(&self, tie_breaker: C) -> String {
        let dir = self.direction.as_sql();
        if self.column == tie_breaker {
            format!(" ORDER BY {} {dir} NULLS LAST", self.column.name())
        } else {
            format!(
                " ORDER BY {} {dir} NULLS LAST, {} {dir}",
                self.column.name(),
                tie_breaker.name()
            )
        }
    }
}
