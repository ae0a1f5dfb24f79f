//! Search predicate tree.
//!
//! A predicate is a flat AND/OR tree whose leaves compare one allow-listed
//! column with a value. There is deliberately no negation, no nested
//! functions and no sub-queries; anything beyond this shape is written by
//! hand in the entity stores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::column::Column;
use crate::compile::escape_like;
use crate::error::{QueryError, Result};
use crate::value::{ColumnKind, Scalar};

/// Comparison operator of a field leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

impl Operator {
    /// Parse an operator name (case-insensitive).
    ///
    /// Unknown names are rejected instead of being treated as `eq`.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" | "ge" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" | "le" => Ok(Self::Lte),
            "like" => Ok(Self::Like),
            "in" => Ok(Self::In),
            _ => Err(QueryError::UnknownOperator(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::In => "in",
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a field leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(Scalar),
    List(Vec<Scalar>),
}

/// Single-value comparison of a field leaf; `in` is not one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl Comparison {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "ILIKE",
        }
    }

    pub fn operator(self) -> Operator {
        match self {
            Self::Eq => Operator::Eq,
            Self::Ne => Operator::Ne,
            Self::Gt => Operator::Gt,
            Self::Gte => Operator::Gte,
            Self::Lt => Operator::Lt,
            Self::Lte => Operator::Lte,
            Self::Like => Operator::Like,
        }
    }
}

/// What a validated leaf tests its column against.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTest {
    Compare(Comparison, Scalar),
    /// Never empty; no element is null.
    In(Vec<Scalar>),
}

/// A validated `column <op> value` leaf.
///
/// Construction goes through [`FieldPredicate::new`], which enforces that
/// `in` carries a non-empty list, every other operator a single non-null
/// scalar, and `like` a text pattern on a text column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate<C: Column> {
    column: C,
    test: FieldTest,
}

impl<C: Column> FieldPredicate<C> {
    pub fn new(column: C, operator: Operator, operand: Operand) -> Result<Self> {
        let invalid = |expected: &'static str| QueryError::InvalidOperand {
            column: column.name(),
            operator: operator.as_str(),
            expected,
        };

        let comparison = match operator {
            Operator::In => {
                return match operand {
                    Operand::List(values) if values.is_empty() => {
                        Err(invalid("a non-empty list of values"))
                    }
                    Operand::List(values) if values.iter().any(Scalar::is_null) => {
                        Err(invalid("non-null list elements"))
                    }
                    Operand::List(values) => Ok(Self {
                        column,
                        test: FieldTest::In(values),
                    }),
                    Operand::Single(_) => Err(invalid("a list of values")),
                };
            }
            Operator::Eq => Comparison::Eq,
            Operator::Ne => Comparison::Ne,
            Operator::Gt => Comparison::Gt,
            Operator::Gte => Comparison::Gte,
            Operator::Lt => Comparison::Lt,
            Operator::Lte => Comparison::Lte,
            Operator::Like => Comparison::Like,
        };

        let value = match operand {
            Operand::List(_) => return Err(invalid("a single value")),
            Operand::Single(Scalar::Null) => return Err(invalid("a non-null value")),
            Operand::Single(value) => value,
        };
        if comparison == Comparison::Like
            && !(matches!(value, Scalar::Text(_)) && column.kind() == ColumnKind::Text)
        {
            return Err(invalid("a text pattern on a text column"));
        }

        Ok(Self {
            column,
            test: FieldTest::Compare(comparison, value),
        })
    }

    pub fn column(&self) -> C {
        self.column
    }

    pub fn operator(&self) -> Operator {
        match &self.test {
            FieldTest::Compare(comparison, _) => comparison.operator(),
            FieldTest::In(_) => Operator::In,
        }
    }

    pub fn test(&self) -> &FieldTest {
        &self.test
    }
}

/// Recursive search predicate over the columns `C` of one table.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPredicate<C: Column> {
    And(Vec<SearchPredicate<C>>),
    Or(Vec<SearchPredicate<C>>),
    Field(FieldPredicate<C>),
}

impl<C: Column> SearchPredicate<C> {
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    pub fn field(column: C, operator: Operator, operand: Operand) -> Result<Self> {
        FieldPredicate::new(column, operator, operand).map(Self::Field)
    }

    /// Single-value comparison (`eq`, `ne`, `gt`, `gte`, `lt`, `lte`, `like`).
    pub fn compare(column: C, operator: Operator, value: impl Into<Scalar>) -> Result<Self> {
        Self::field(column, operator, Operand::Single(value.into()))
    }

    pub fn eq(column: C, value: impl Into<Scalar>) -> Result<Self> {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn is_in(column: C, values: impl IntoIterator<Item = Scalar>) -> Result<Self> {
        Self::field(
            column,
            Operator::In,
            Operand::List(values.into_iter().collect()),
        )
    }

    /// Case-insensitive substring match; wildcards in `term` match literally.
    pub fn contains(column: C, term: &str) -> Result<Self> {
        Self::compare(column, Operator::Like, format!("%{}%", escape_like(term)))
    }

    /// Inclusive range; `None` bounds are left open.
    ///
    /// Returns `None` when both bounds are open.
    pub fn between(column: C, min: Option<Scalar>, max: Option<Scalar>) -> Result<Option<Self>> {
        let mut bounds = Vec::with_capacity(2);
        if let Some(min) = min {
            bounds.push(Self::compare(column, Operator::Gte, min)?);
        }
        if let Some(max) = max {
            bounds.push(Self::compare(column, Operator::Lte, max)?);
        }
        Ok(match bounds.len() {
            0 => None,
            1 => bounds.pop(),
            _ => Some(Self::And(bounds)),
        })
    }

    /// Rewrite the compared values of every leaf, re-validating each one.
    ///
    /// `like` patterns are left alone; `f` sees plain values only.
    pub fn try_map_values<E, F>(self, f: &mut F) -> std::result::Result<Self, E>
    where
        E: From<QueryError>,
        F: FnMut(C, Scalar) -> std::result::Result<Scalar, E>,
    {
        match self {
            Self::And(children) => Ok(Self::And(
                children
                    .into_iter()
                    .map(|child| child.try_map_values(f))
                    .collect::<std::result::Result<_, E>>()?,
            )),
            Self::Or(children) => Ok(Self::Or(
                children
                    .into_iter()
                    .map(|child| child.try_map_values(f))
                    .collect::<std::result::Result<_, E>>()?,
            )),
            Self::Field(leaf) => {
                let column = leaf.column;
                let (operator, operand) = match leaf.test {
                    FieldTest::Compare(Comparison::Like, _) => return Ok(Self::Field(leaf)),
                    FieldTest::Compare(comparison, value) => {
                        (comparison.operator(), Operand::Single(f(column, value)?))
                    }
                    FieldTest::In(values) => (
                        Operator::In,
                        Operand::List(
                            values
                                .into_iter()
                                .map(|value| f(column, value))
                                .collect::<std::result::Result<_, E>>()?,
                        ),
                    ),
                };
                Ok(Self::field(column, operator, operand)?)
            }
        }
    }

    /// Number of field leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                children.iter().map(Self::leaf_count).sum()
            }
            Self::Field(_) => 1,
        }
    }
}

/// Untyped predicate as received in a request body.
///
/// ```json
/// {"and": [
///   {"field": "status", "op": "eq", "value": "active"},
///   {"or": [
///     {"field": "age", "op": "gte", "value": 18},
///     {"field": "guardian_consent", "value": true}
///   ]}
/// ]}
/// ```
///
/// `op` defaults to `eq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateInput {
    And {
        and: Vec<PredicateInput>,
    },
    Or {
        or: Vec<PredicateInput>,
    },
    Field {
        field: String,
        #[serde(default = "default_operator", alias = "operator")]
        op: String,
        value: JsonValue,
    },
}

fn default_operator() -> String {
    "eq".to_string()
}

impl PredicateInput {
    /// Resolve against the allow-list of `C`, coercing values by column kind.
    pub fn resolve<C: Column>(&self) -> Result<SearchPredicate<C>> {
        match self {
            Self::And { and } => Ok(SearchPredicate::And(
                and.iter().map(Self::resolve).collect::<Result<_>>()?,
            )),
            Self::Or { or } => Ok(SearchPredicate::Or(
                or.iter().map(Self::resolve).collect::<Result<_>>()?,
            )),
            Self::Field { field, op, value } => {
                let column = C::resolve(field)?;
                let operator = Operator::parse(op)?;
                let coerce = |v: &JsonValue| column.kind().coerce_json(column.name(), v);

                let operand = match (operator, value) {
                    (Operator::In, JsonValue::Array(items)) => {
                        Operand::List(items.iter().map(coerce).collect::<Result<_>>()?)
                    }
                    (Operator::Like, JsonValue::String(pattern)) => {
                        Operand::Single(Scalar::Text(pattern.clone()))
                    }
                    (_, JsonValue::Array(_)) => {
                        return Err(QueryError::InvalidOperand {
                            column: column.name(),
                            operator: operator.as_str(),
                            expected: "a single value",
                        })
                    }
                    (Operator::In, _) => {
                        return Err(QueryError::InvalidOperand {
                            column: column.name(),
                            operator: operator.as_str(),
                            expected: "a list of values",
                        })
                    }
                    (_, v) => Operand::Single(coerce(v)?),
                };

                SearchPredicate::field(column, operator, operand)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::tests::Person;
    use serde_json::json;

    #[test]
    fn operator_parse_is_closed() {
        assert_eq!(Operator::parse("GTE").unwrap(), Operator::Gte);
        assert_eq!("le".parse::<Operator>().unwrap(), Operator::Lte);
        assert_eq!(
            Operator::parse("regex").unwrap_err(),
            QueryError::UnknownOperator("regex".to_string())
        );
    }

    #[test]
    fn in_requires_non_empty_list() {
        assert!(SearchPredicate::is_in(Person::Id, vec![]).is_err());
        assert!(SearchPredicate::is_in(Person::Id, vec![Scalar::Int(1)]).is_ok());
        assert!(
            SearchPredicate::field(Person::Id, Operator::In, Operand::Single(Scalar::Int(1)))
                .is_err()
        );
    }

    #[test]
    fn map_values_rewrites_comparisons_but_not_patterns() {
        let predicate = SearchPredicate::and([
            SearchPredicate::eq(Person::Name, "ada").unwrap(),
            SearchPredicate::or([
                SearchPredicate::is_in(Person::Status, vec!["a".into(), "b".into()]).unwrap(),
                SearchPredicate::contains(Person::Name, "lov").unwrap(),
            ]),
        ]);

        let mut seen = Vec::new();
        let mapped = predicate
            .try_map_values(&mut |column, value| {
                seen.push(column);
                Ok::<_, QueryError>(match value {
                    Scalar::Text(s) => Scalar::Text(s.to_uppercase()),
                    other => other,
                })
            })
            .unwrap();

        assert_eq!(seen, vec![Person::Name, Person::Status, Person::Status]);
        assert_eq!(
            mapped,
            SearchPredicate::and([
                SearchPredicate::eq(Person::Name, "ADA").unwrap(),
                SearchPredicate::or([
                    SearchPredicate::is_in(Person::Status, vec!["A".into(), "B".into()]).unwrap(),
                    SearchPredicate::contains(Person::Name, "lov").unwrap(),
                ]),
            ])
        );

        let nulled = SearchPredicate::eq(Person::Age, 3)
            .unwrap()
            .try_map_values(&mut |_, _| Ok::<_, QueryError>(Scalar::Null));
        assert!(nulled.is_err());
    }

    #[test]
    fn leaves_carry_their_shape() {
        let leaf = SearchPredicate::compare(Person::Age, Operator::Lte, 40).unwrap();
        match leaf {
            SearchPredicate::Field(f) => {
                assert_eq!(f.operator(), Operator::Lte);
                assert_eq!(f.test(), &FieldTest::Compare(Comparison::Lte, Scalar::Int(40)));
            }
            other => panic!("expected field leaf, got {other:?}"),
        }

        let leaf = SearchPredicate::is_in(Person::Id, vec![Scalar::Int(1)]).unwrap();
        match leaf {
            SearchPredicate::Field(f) => assert_eq!(f.operator(), Operator::In),
            other => panic!("expected field leaf, got {other:?}"),
        }
    }

    #[test]
    fn scalar_operators_reject_lists() {
        let err = SearchPredicate::field(
            Person::Age,
            Operator::Gt,
            Operand::List(vec![Scalar::Int(1), Scalar::Int(2)]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("single value"));
    }

    #[test]
    fn null_operands_are_rejected() {
        assert!(SearchPredicate::compare(Person::Age, Operator::Gt, Scalar::Null).is_err());
        assert!(SearchPredicate::eq(Person::Name, Scalar::Null).is_err());
        assert!(SearchPredicate::eq(Person::Name, None::<String>).is_err());
        assert!(SearchPredicate::is_in(Person::Id, vec![Scalar::Int(1), Scalar::Null]).is_err());
    }

    #[test]
    fn like_requires_text_column() {
        assert!(SearchPredicate::compare(Person::Name, Operator::Like, "%ann%").is_ok());
        assert!(SearchPredicate::compare(Person::Age, Operator::Like, "%1%").is_err());
        assert!(SearchPredicate::compare(Person::Name, Operator::Like, 3).is_err());
    }

    #[test]
    fn between_leaves_open_bounds_out() {
        assert_eq!(SearchPredicate::<Person>::between(Person::Score, None, None).unwrap(), None);

        let one = SearchPredicate::between(Person::Score, Some(1.5.into()), None)
            .unwrap()
            .unwrap();
        assert_eq!(one.leaf_count(), 1);

        let both = SearchPredicate::between(Person::Score, Some(1.0.into()), Some(2.0.into()))
            .unwrap()
            .unwrap();
        assert!(matches!(both, SearchPredicate::And(ref c) if c.len() == 2));
    }

    #[test]
    fn input_resolves_nested_tree() {
        let input: PredicateInput = serde_json::from_value(json!({
            "and": [
                {"field": "status", "op": "eq", "value": "active"},
                {"or": [
                    {"field": "age", "op": "gte", "value": 18},
                    {"field": "guardian_consent", "value": true}
                ]}
            ]
        }))
        .unwrap();

        let predicate: SearchPredicate<Person> = input.resolve().unwrap();
        let expected = SearchPredicate::and([
            SearchPredicate::eq(Person::Status, "active").unwrap(),
            SearchPredicate::or([
                SearchPredicate::compare(Person::Age, Operator::Gte, 18).unwrap(),
                SearchPredicate::eq(Person::GuardianConsent, true).unwrap(),
            ]),
        ]);
        assert_eq!(predicate, expected);
        assert_eq!(predicate.leaf_count(), 3);
    }

    #[test]
    fn input_rejects_unknown_column_and_operator() {
        let unknown_column: PredicateInput =
            serde_json::from_value(json!({"field": "password", "value": "x"})).unwrap();
        assert!(matches!(
            unknown_column.resolve::<Person>(),
            Err(QueryError::UnknownColumn { .. })
        ));

        let unknown_op: PredicateInput =
            serde_json::from_value(json!({"field": "age", "op": "between", "value": 1}))
                .unwrap();
        assert!(matches!(
            unknown_op.resolve::<Person>(),
            Err(QueryError::UnknownOperator(_))
        ));
    }

    #[test]
    fn input_coerces_in_lists_by_column_kind() {
        let input: PredicateInput =
            serde_json::from_value(json!({"field": "born", "op": "in", "value": ["2000-01-01", "2001-01-01"]}))
                .unwrap();
        let predicate: SearchPredicate<Person> = input.resolve().unwrap();
        match predicate {
            SearchPredicate::Field(f) => match f.test() {
                FieldTest::In(values) => {
                    assert_eq!(values.len(), 2);
                    assert!(matches!(values[0], Scalar::Date(_)));
                }
                other => panic!("expected an in-list test, got {other:?}"),
            },
            other => panic!("expected field leaf, got {other:?}"),
        }
    }
}
