//! Query-string parameters
//!
//! Grammar for list endpoints:
//!
//! - `page`, `limit`, `offset`: paging window (`offset` selects offset paging)
//! - `sort`, `direction`: order column (`-col` means descending) and direction
//! - `q`: free text over the entity's text columns
//! - `<column>=<value>` or `<column>[<op>]=<value>`: one filter leaf, all
//!   leaves combined with AND; `in` takes a comma separated list and `like`
//!   is a literal substring match
//!
//! Every other key must name an allow-listed column.

use molstore_query::{
    Column, ColumnKind, Operand, Operator, PageRequest, Pagination, QueryError, Scalar,
    SearchPredicate, SearchRequest, SortSpec, TextSearch,
};
use std::fmt::Display;
use std::str::FromStr;
use url::form_urlencoded;

use crate::config::SearchConfig;
use crate::db::EntityStore;
use crate::{Error, Result};

const RESERVED: &[&str] = &["page", "limit", "offset", "sort", "direction", "q"];

/// Decoded query-string pairs, in request order.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|raw| form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// First non-blank value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim())
    }

    /// `key` parsed as `T`; a value that does not parse is a validation error.
    pub fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    Error::Validation(format!("Invalid value '{raw}' for '{key}': {e}"))
                })
            })
            .transpose()
    }

    /// `key` as a finite float; `NaN` and infinities are validation errors.
    pub fn float(&self, key: &'static str) -> Result<Option<f64>> {
        self.get(key)
            .map(|raw| match ColumnKind::Float.parse_text(key, raw)? {
                Scalar::Float(value) => Ok(value),
                other => Err(Error::Internal(format!("float parse of '{key}' gave {other:?}"))),
            })
            .transpose()
    }

    pub fn page_request(&self) -> Result<PageRequest> {
        Ok(PageRequest {
            page: self.parsed("page")?,
            limit: self.parsed("limit")?,
            offset: self.parsed("offset")?,
        })
    }

    pub fn pagination(&self, config: &SearchConfig) -> Result<Pagination> {
        Ok(self
            .page_request()?
            .resolve(config.default_limit, config.max_limit))
    }

    /// Full list request for entity `E`.
    pub fn search_request<E: EntityStore>(
        &self,
        config: &SearchConfig,
    ) -> Result<SearchRequest<E::Column>> {
        let sort = SortSpec::resolve(
            self.get("sort"),
            self.get("direction"),
            E::SORTABLE,
            E::DEFAULT_SORT,
        );
        let mut request = SearchRequest::new(self.pagination(config)?, sort);

        let leaves = self
            .pairs
            .iter()
            .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
            .map(|(key, value)| filter_leaf::<E::Column>(key, value))
            .collect::<Result<Vec<_>>>()?;
        if !leaves.is_empty() {
            let predicate = E::normalize_predicate(SearchPredicate::and(leaves))?;
            request = request.with_predicate(predicate);
        }

        if let Some(term) = self.get("q") {
            request = request.with_text(TextSearch::new(term, E::TEXT_COLUMNS));
        }

        Ok(request)
    }
}

/// One `column[op]=value` pair as a predicate leaf.
fn filter_leaf<C: Column>(key: &str, raw: &str) -> Result<SearchPredicate<C>> {
    let (name, operator) = match key.split_once('[') {
        Some((name, rest)) => {
            let op = rest.strip_suffix(']').ok_or_else(|| {
                QueryError::InvalidPredicate(format!("malformed filter key '{key}'"))
            })?;
            (name, Operator::parse(op)?)
        }
        None => (key, Operator::Eq),
    };

    let column = C::resolve(name)?;
    let parse = |value: &str| column.kind().parse_text(column.name(), value.trim());

    let predicate = match operator {
        Operator::In => {
            let values = raw
                .split(',')
                .filter(|v| !v.trim().is_empty())
                .map(parse)
                .collect::<molstore_query::Result<Vec<Scalar>>>()?;
            SearchPredicate::field(column, Operator::In, Operand::List(values))?
        }
        Operator::Like => SearchPredicate::contains(column, raw)?,
        operator => SearchPredicate::compare(column, operator, parse(raw)?)?,
    };
    Ok(predicate)
}
