//! Filter expressions and query construction for gateway reads and writes.
//!
//! Every operation that selects documents takes an [`Expr`]. Reads that need ordering
//! or windowing take a [`Query`], which wraps a filter with sort, limit and offset.
//!
//! ```ignore
//! use podstore::query::{Query, Filter, SortDirection};
//!
//! let longest_first = Query::builder()
//!     .filter(Filter::gt("duration", 22))
//!     .sort("duration", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! Expressions are not checked when built. Backends validate them when an operation
//! runs, so a malformed predicate surfaces as [`DocumentStoreError::Query`] at call time.

use bson::{Bson, oid::ObjectId};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::ID_FIELD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Single-key ordering.
///
/// Ordering among documents with equal keys is decided by the store and is not stable.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Comparison applied by an [`Expr::Field`].
///
/// Ordering operators compare numbers, strings, dates and identities within their
/// own type; a value of another type never satisfies them. On array fields the
/// comparison is tried against each element.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// See [`Filter::contains`].
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// The field equals one of the listed values.
    AnyOf,
    NoneOf,
}

/// Predicate over a single document. An empty `And` matches everything.
///
/// ```ignore
/// use podstore::query::Filter;
///
/// let expr = Filter::and(vec![
///     Filter::eq("author", "Nic Raboy"),
///     Filter::contains("tags", "coding"),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    /// Must hold at least one branch to be valid.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `true` requires the field to be present, `false` requires it to be absent.
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Conjunction that flattens into an existing `And`.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Disjunction that flattens into an existing `Or`.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Returns `true` if this expression matches every document.
    pub fn matches_all(&self) -> bool {
        matches!(self, Expr::And(list) if list.is_empty())
    }

    /// Checks that this expression can be executed by a store.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Query`] for empty or operator-like field names,
    /// string operators with non-string operands, and set operators with non-array operands.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        ExprValidator.visit_expr(self)
    }
}

impl Default for Expr {
    fn default() -> Self {
        Filter::all()
    }
}

/// A structured read: filter plus optional ordering and windowing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// `None` matches every document.
    pub filter: Option<Expr>,
    /// Upper bound on returned documents. `Some(0)` is treated as no bound.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Query {
            filter: None,
            limit: None,
            offset: None,
            sort: None,
        }
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Creates a query that only filters.
    pub fn filtered(filter: Expr) -> Self {
        Query::builder().filter(filter).build()
    }

    /// Checks the filter and sort specification.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Query`] if the filter is malformed or the sort key is empty.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        if let Some(sort) = &self.sort {
            check_field_name(&sort.field)?;
        }

        Ok(())
    }
}

/// Shorthand for building [`Expr`] trees.
///
/// ```
/// use podstore_core::query::Filter;
///
/// let short_graphql = Filter::and([
///     Filter::contains("title", "GraphQL"),
///     Filter::lt("duration", 30),
/// ]);
/// ```
pub struct Filter;

impl Filter {
    /// Empty conjunction, which every document satisfies.
    pub fn all() -> Expr {
        Expr::And(Vec::new())
    }

    pub fn id(id: ObjectId) -> Expr {
        Filter::eq(ID_FIELD, id)
    }

    /// On an array field this matches when any element equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Case-sensitive prefix match. `value` must be a string.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    /// Case-sensitive suffix match. `value` must be a string.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// What "contains" means depends on `value`:
    ///
    /// - a string is a substring test, applied to each element of an array field;
    /// - an array requires every listed value to be present (an empty array matches nothing);
    /// - anything else is plain equality.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    /// Negation of [`Filter::contains`]. Documents without the field match.
    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// At least one branch is required; an empty `or` fails validation.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// `value` must be an array.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// `value` must be an array. Documents without the field match.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

/// Fluent construction of a [`Query`]. Unset parts stay `None`.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Single-key ordering. Calling it again replaces the earlier key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

fn check_field_name(field: &str) -> DocumentStoreResult<()> {
    if field.is_empty() {
        return Err(DocumentStoreError::Query("field name must not be empty".to_string()));
    }
    if field.starts_with('$') {
        return Err(DocumentStoreError::Query(format!("field name {field} must not start with '$'")));
    }

    Ok(())
}

struct ExprValidator;

impl QueryVisitor for ExprValidator {
    type Output = ();
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        exprs.iter().try_for_each(|expr| self.visit_expr(expr))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Err(DocumentStoreError::Query("OR requires at least one expression".to_string()));
        }

        exprs.iter().try_for_each(|expr| self.visit_expr(expr))
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        self.visit_expr(expr)
    }

    fn visit_exists(&mut self, field: &str, _should_exist: bool) -> Result<Self::Output, Self::Error> {
        check_field_name(field)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        check_field_name(field)?;

        match (op, value) {
            (FieldOp::StartsWith | FieldOp::EndsWith, Bson::String(_)) => Ok(()),
            (FieldOp::StartsWith | FieldOp::EndsWith, _) => Err(DocumentStoreError::Query(
                format!("{op:?} on {field} requires a string value"),
            )),
            (FieldOp::AnyOf | FieldOp::NoneOf, Bson::Array(_)) => Ok(()),
            (FieldOp::AnyOf | FieldOp::NoneOf, _) => Err(DocumentStoreError::Query(
                format!("{op:?} on {field} requires an array value"),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn chained_and_flattens_into_one_list() {
        let expr = Filter::eq("title", "a")
            .and(Filter::gt("duration", 1))
            .and(Filter::exists("tags"));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_matches_all() {
        assert!(Filter::all().matches_all());
        assert!(!Filter::eq("title", "a").matches_all());
        assert!(Filter::all().validate().is_ok());
    }

    #[rstest]
    #[case(Filter::eq("", 1))]
    #[case(Filter::eq("$where", "1 == 1"))]
    #[case(Filter::starts_with("title", 5))]
    #[case(Filter::any_of("duration", 25))]
    #[case(Filter::or(Vec::new()))]
    #[case(Filter::not_exists("").not())]
    fn malformed_filters_are_query_errors(#[case] expr: Expr) {
        assert!(matches!(expr.validate(), Err(DocumentStoreError::Query(_))));
    }

    #[rstest]
    #[case(Filter::eq("duration", 25))]
    #[case(Filter::gt("duration", 22).and(Filter::lt("duration", 40)))]
    #[case(Filter::any_of("tags", vec!["coding", "development"]))]
    #[case(Filter::id(ObjectId::new()))]
    fn well_formed_filters_pass(#[case] expr: Expr) {
        assert!(expr.validate().is_ok());
    }

    #[test]
    fn empty_sort_key_is_rejected() {
        let query = Query::builder().sort("", SortDirection::Asc).build();

        assert!(matches!(query.validate(), Err(DocumentStoreError::Query(_))));
    }
}
