//! Predicate compilation into SQL fragments with positional parameters.

use crate::column::Column;
use crate::predicate::{FieldPredicate, FieldTest, SearchPredicate};
use crate::value::{ColumnKind, Scalar};

/// Output of [`compile`]: a WHERE fragment (possibly empty) and the values
/// bound to its placeholders, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledClause {
    pub sql: String,
    pub params: Vec<Scalar>,
}

impl CompiledClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// ` WHERE <sql>` or the empty string.
    pub fn where_clause(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Positional parameter list for one statement.
///
/// `push` returns the `$n` index assigned to the value. A list created with
/// [`Binds::starting_at`] numbers from that offset so a fragment can be
/// spliced after placeholders bound elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Binds {
    first: usize,
    values: Vec<Scalar>,
}

impl Binds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_placeholder: usize) -> Self {
        Self {
            first: first_placeholder.max(1),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: impl Into<Scalar>) -> usize {
        self.values.push(value.into());
        self.first + self.values.len() - 1
    }

    /// Push a value and return its `$n` placeholder text.
    pub fn placeholder(&mut self, value: impl Into<Scalar>) -> String {
        format!("${}", self.push(value))
    }

    /// Index the next pushed value will receive.
    pub fn next_index(&self) -> usize {
        self.first + self.values.len()
    }

    /// Compile `predicate` at the current position and keep its parameters.
    pub fn push_predicate<C: Column>(&mut self, predicate: Option<&SearchPredicate<C>>) -> String {
        match predicate {
            Some(node) => compile_node(node, self),
            None => String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Scalar> {
        self.values
    }
}

impl Default for Binds {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a predicate into a WHERE fragment.
///
/// Placeholders are numbered contiguously from `first_placeholder`. A missing
/// predicate, or one whose groups are all empty, compiles to an empty
/// fragment with no parameters; the caller omits `WHERE` in that case.
pub fn compile<C: Column>(
    predicate: Option<&SearchPredicate<C>>,
    first_placeholder: usize,
) -> CompiledClause {
    let mut binds = Binds::starting_at(first_placeholder);
    let sql = binds.push_predicate(predicate);
    CompiledClause {
        sql,
        params: binds.into_values(),
    }
}

fn compile_node<C: Column>(node: &SearchPredicate<C>, binds: &mut Binds) -> String {
    match node {
        SearchPredicate::And(children) => compile_group(children, " AND ", binds),
        SearchPredicate::Or(children) => compile_group(children, " OR ", binds),
        SearchPredicate::Field(field) => compile_field(field, binds),
    }
}

fn compile_group<C: Column>(
    children: &[SearchPredicate<C>],
    separator: &str,
    binds: &mut Binds,
) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|child| compile_node(child, binds))
        .filter(|sql| !sql.is_empty())
        .collect();

    if parts.is_empty() {
        return String::new();
    }
    format!("({})", parts.join(separator))
}

fn compile_field<C: Column>(field: &FieldPredicate<C>, binds: &mut Binds) -> String {
    let column = field.column().name();

    match field.test() {
        FieldTest::In(values) => {
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| binds.placeholder(v.clone()))
                .collect();
            format!("{column} IN ({})", placeholders.join(", "))
        }
        FieldTest::Compare(comparison, value) => {
            let idx = binds.push(value.clone());
            format!("{column} {} ${idx}", comparison.sql())
        }
    }
}

/// Escape `LIKE` wildcards so `term` matches literally (backslash escape).
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Free-text search across a fixed set of text columns.
///
/// Produces `(a ILIKE $n OR b ILIKE $n ...)` sharing one bound `%term%`
/// parameter. Non-text columns are skipped; a blank term or no text columns
/// yields an empty fragment and binds nothing.
pub fn text_search_clause<C: Column>(columns: &[C], term: &str, binds: &mut Binds) -> String {
    let term = term.trim();
    let text_columns: Vec<&'static str> = columns
        .iter()
        .filter(|c| c.kind() == ColumnKind::Text)
        .map(|c| c.name())
        .collect();
    if term.is_empty() || text_columns.is_empty() {
        return String::new();
    }

    let idx = binds.push(format!("%{}%", escape_like(term)));
    let parts: Vec<String> = text_columns
        .iter()
        .map(|name| format!("{name} ILIKE ${idx}"))
        .collect();
    format!("({})", parts.join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::tests::Person;
    use crate::predicate::Operator;

    fn gte(column: Person, value: i64) -> SearchPredicate<Person> {
        SearchPredicate::compare(column, Operator::Gte, value).unwrap()
    }

    #[test]
    fn compiles_nested_and_or_tree() {
        let predicate = SearchPredicate::and([
            SearchPredicate::eq(Person::Status, "active").unwrap(),
            SearchPredicate::or([
                gte(Person::Age, 18),
                SearchPredicate::eq(Person::GuardianConsent, true).unwrap(),
            ]),
        ]);

        let clause = compile(Some(&predicate), 1);
        assert_eq!(
            clause.sql,
            "(status = $1 AND (age >= $2 OR guardian_consent = $3))"
        );
        assert_eq!(
            clause.params,
            vec![
                Scalar::Text("active".to_string()),
                Scalar::Int(18),
                Scalar::Bool(true)
            ]
        );
    }

    #[test]
    fn missing_or_empty_predicate_compiles_to_nothing() {
        assert_eq!(compile::<Person>(None, 1), CompiledClause::default());

        let empty = SearchPredicate::<Person>::and([
            SearchPredicate::Or(vec![]),
            SearchPredicate::And(vec![SearchPredicate::Or(vec![])]),
        ]);
        let clause = compile(Some(&empty), 1);
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
        assert_eq!(clause.where_clause(), "");
    }

    #[test]
    fn empty_children_are_dropped_from_groups() {
        let predicate = SearchPredicate::or([
            SearchPredicate::And(vec![]),
            SearchPredicate::eq(Person::Name, "Ada").unwrap(),
        ]);
        let clause = compile(Some(&predicate), 1);
        assert_eq!(clause.sql, "(name = $1)");
        assert_eq!(clause.where_clause(), " WHERE (name = $1)");
    }

    #[test]
    fn in_allocates_one_placeholder_per_element() {
        let predicate = SearchPredicate::and([
            SearchPredicate::eq(Person::Status, "active").unwrap(),
            SearchPredicate::is_in(
                Person::Id,
                vec![Scalar::Int(3), Scalar::Int(5), Scalar::Int(8)],
            )
            .unwrap(),
            SearchPredicate::compare(Person::Name, Operator::Ne, "Bob").unwrap(),
        ]);

        let clause = compile(Some(&predicate), 1);
        assert_eq!(
            clause.sql,
            "(status = $1 AND id IN ($2, $3, $4) AND name != $5)"
        );
        assert_eq!(clause.params.len(), 5);
    }

    #[test]
    fn param_count_matches_leaves_for_flat_and() {
        let leaves = [
            SearchPredicate::eq(Person::Status, "a").unwrap(),
            gte(Person::Age, 1),
            SearchPredicate::compare(Person::Score, Operator::Lt, 9.5).unwrap(),
            SearchPredicate::compare(Person::Name, Operator::Like, "%x%").unwrap(),
            SearchPredicate::is_in(Person::Id, vec![Scalar::Int(1), Scalar::Int(2)]).unwrap(),
        ];
        let predicate = SearchPredicate::and(leaves);
        let clause = compile(Some(&predicate), 1);

        // four scalar leaves plus one `in` leaf of two elements
        assert_eq!(clause.params.len(), predicate.leaf_count() - 1 + 2);
        let placeholders = clause.sql.matches('$').count();
        assert_eq!(placeholders, clause.params.len());
    }

    #[test]
    fn numbering_starts_at_offset() {
        let predicate = SearchPredicate::and([
            SearchPredicate::eq(Person::Name, "Ada").unwrap(),
            SearchPredicate::compare(Person::Score, Operator::Lte, 2.5).unwrap(),
        ]);
        let clause = compile(Some(&predicate), 3);
        assert_eq!(clause.sql, "(name = $3 AND score <= $4)");
    }

    #[test]
    fn operators_render_expected_sql() {
        let cases = [
            (Operator::Eq, "age = $1"),
            (Operator::Ne, "age != $1"),
            (Operator::Gt, "age > $1"),
            (Operator::Gte, "age >= $1"),
            (Operator::Lt, "age < $1"),
            (Operator::Lte, "age <= $1"),
        ];
        for (operator, expected) in cases {
            let p = SearchPredicate::compare(Person::Age, operator, 1).unwrap();
            assert_eq!(compile(Some(&p), 1).sql, expected);
        }

        let like = SearchPredicate::compare(Person::Name, Operator::Like, "%an%").unwrap();
        assert_eq!(compile(Some(&like), 1).sql, "name ILIKE $1");
    }

    #[test]
    fn binds_continue_after_existing_values() {
        let mut binds = Binds::new();
        assert_eq!(binds.placeholder("1ABC"), "$1");
        let sql = binds.push_predicate(Some(&SearchPredicate::eq(Person::Age, 3).unwrap()));
        assert_eq!(sql, "age = $2");
        assert_eq!(binds.next_index(), 3);
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        let p = SearchPredicate::contains(Person::Name, "a_b").unwrap();
        let clause = compile(Some(&p), 1);
        assert_eq!(clause.params, vec![Scalar::Text("%a\\_b%".to_string())]);
    }

    #[test]
    fn text_search_shares_one_parameter() {
        let mut binds = Binds::new();
        let sql = text_search_clause(
            &[Person::Name, Person::Status, Person::Age],
            " kinase ",
            &mut binds,
        );
        assert_eq!(sql, "(name ILIKE $1 OR status ILIKE $1)");
        assert_eq!(binds.values(), &[Scalar::Text("%kinase%".to_string())]);

        let mut untouched = Binds::new();
        assert_eq!(text_search_clause(&[Person::Name], "   ", &mut untouched), "");
        assert!(untouched.is_empty());
    }
}
