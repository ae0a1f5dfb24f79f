use crate::column::Column;
use crate::compile::{text_search_clause, Binds};
use crate::pagination::Pagination;
use crate::predicate::SearchPredicate;
use crate::sort::SortSpec;

/// Free-text term matched with ILIKE across a fixed set of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch<C: Column> {
    pub term: String,
    pub columns: Vec<C>,
}

impl<C: Column> TextSearch<C> {
    pub fn new(term: impl Into<String>, columns: &[C]) -> Self {
        Self {
            term: term.into(),
            columns: columns.to_vec(),
        }
    }
}

/// Everything `search` needs: filter, optional free text, window and order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest<C: Column> {
    pub predicate: Option<SearchPredicate<C>>,
    pub text: Option<TextSearch<C>>,
    pub pagination: Pagination,
    pub sort: SortSpec<C>,
}

impl<C: Column> SearchRequest<C> {
    pub fn new(pagination: Pagination, sort: SortSpec<C>) -> Self {
        Self {
            predicate: None,
            text: None,
            pagination,
            sort,
        }
    }

    pub fn with_predicate(mut self, predicate: SearchPredicate<C>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_text(mut self, text: TextSearch<C>) -> Self {
        self.text = Some(text);
        self
    }

    /// Push the filter's parameters and return ` WHERE ...` (or `""`).
    ///
    /// The predicate and the free-text clause are combined with AND.
    pub fn where_clause(&self, binds: &mut Binds) -> String {
        let mut parts = Vec::with_capacity(2);

        let predicate = binds.push_predicate(self.predicate.as_ref());
        if !predicate.is_empty() {
            parts.push(predicate);
        }
        if let Some(text) = &self.text {
            let clause = text_search_clause(&text.columns, &text.term, binds);
            if !clause.is_empty() {
                parts.push(clause);
            }
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::tests::Person;
    use crate::value::Scalar;

    #[test]
    fn no_filter_means_no_where() {
        let request = SearchRequest::new(Pagination::page(1, 10), SortSpec::asc(Person::Id));
        let mut binds = Binds::new();
        assert_eq!(request.where_clause(&mut binds), "");
        assert!(binds.is_empty());
    }

    #[test]
    fn predicate_and_text_share_numbering() {
        let request = SearchRequest::new(Pagination::page(1, 10), SortSpec::asc(Person::Id))
            .with_predicate(SearchPredicate::eq(Person::Status, "active").unwrap())
            .with_text(TextSearch::new("ann", &[Person::Name, Person::Status]));

        let mut binds = Binds::new();
        let sql = request.where_clause(&mut binds);
        assert_eq!(
            sql,
            " WHERE status = $1 AND (name ILIKE $2 OR status ILIKE $2)"
        );
        assert_eq!(
            binds.values(),
            &[
                Scalar::Text("active".to_string()),
                Scalar::Text("%ann%".to_string())
            ]
        );
    }

    #[test]
    fn blank_text_is_ignored() {
        let request = SearchRequest::new(Pagination::page(1, 10), SortSpec::asc(Person::Id))
            .with_text(TextSearch::new("  ", &[Person::Name]));
        let mut binds = Binds::new();
        assert_eq!(request.where_clause(&mut binds), "");
    }
}
