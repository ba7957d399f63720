//! Filter evaluation for in-memory document matching.
//!
//! Matching follows MongoDB's behaviour closely enough for the bundled operators:
//! equality on an array field matches any element, and negative operators
//! (`Ne`, `NotContains`, `NoneOf`) match documents where the field is missing.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use podstore_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64. Values of types without a meaningful
/// comparison become `Other`, which is never equal to anything.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Other,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Sort key for a possibly missing field. Missing fields sort like null.
    pub(crate) fn sort_key(value: Option<&'a Bson>) -> Self {
        value
            .map(Comparable::from)
            .unwrap_or(Comparable::Null)
    }

    /// Total order used for sorting: values are grouped by type first, then compared.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }

    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Other => 8,
        }
    }

    /// Equality, where an array also matches a value equal to one of its elements.
    fn matches(&self, value: &Comparable<'_>) -> bool {
        if self == value {
            return true;
        }

        match self {
            Comparable::Array(items) => items.iter().any(|item| item == value),
            _ => false,
        }
    }
}

impl<'a, 'b> PartialEq<Comparable<'b>> for Comparable<'a> {
    fn eq(&self, other: &Comparable<'b>) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            },
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| x == y))
            },
            _ => false,
        }
    }
}

impl<'a, 'b> PartialOrd<Comparable<'b>> for Comparable<'a> {
    fn partial_cmp(&self, other: &Comparable<'b>) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` if `document` satisfies `expr`.
    pub fn matches(document: &'a Document, expr: &Expr) -> DocumentStoreResult<bool> {
        DocumentEvaluator::new(document).evaluate(expr)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::matches(document, expr)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        let Some(field_value) = self.document.get(field) else {
            return Ok(match op {
                FieldOp::Eq => expected == Comparable::Null,
                FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf => true,
                _ => false,
            });
        };
        let actual = Comparable::from(field_value);

        match op {
            FieldOp::Eq => Ok(actual.matches(&expected)),
            FieldOp::Ne => Ok(!actual.matches(&expected)),
            FieldOp::Gt => Ok(compares(&actual, &expected, &|ordering| ordering == Ordering::Greater)),
            FieldOp::Gte => Ok(compares(&actual, &expected, &|ordering| ordering != Ordering::Less)),
            FieldOp::Lt => Ok(compares(&actual, &expected, &|ordering| ordering == Ordering::Less)),
            FieldOp::Lte => Ok(compares(&actual, &expected, &|ordering| ordering != Ordering::Greater)),
            FieldOp::Contains => Ok(contains(&actual, &expected)),
            FieldOp::NotContains => Ok(!contains(&actual, &expected)),
            FieldOp::StartsWith => Ok(matches_text(&actual, &expected, &|text, pattern| text.starts_with(pattern))),
            FieldOp::EndsWith => Ok(matches_text(&actual, &expected, &|text, pattern| text.ends_with(pattern))),
            FieldOp::AnyOf => Ok(any_of(&actual, &expected)),
            FieldOp::NoneOf => Ok(!any_of(&actual, &expected)),
        }
    }
}

/// Ordering test against a value. An array field passes if any element does.
fn compares(actual: &Comparable<'_>, expected: &Comparable<'_>, accept: &dyn Fn(Ordering) -> bool) -> bool {
    match actual {
        Comparable::Array(items) => items.iter().any(|item| compares(item, expected, accept)),
        scalar => scalar.partial_cmp(expected).is_some_and(accept),
    }
}

/// Text test against a string pattern. An array field passes if any string element does.
fn matches_text(actual: &Comparable<'_>, expected: &Comparable<'_>, test: &dyn Fn(&str, &str) -> bool) -> bool {
    let Comparable::String(pattern) = expected else {
        return false;
    };

    match actual {
        Comparable::String(text) => test(*text, *pattern),
        Comparable::Array(items) => items.iter().any(|item| matches_text(item, expected, test)),
        _ => false,
    }
}

fn contains(actual: &Comparable<'_>, expected: &Comparable<'_>) -> bool {
    match expected {
        Comparable::String(_) => matches_text(actual, expected, &|text, pattern| text.contains(pattern)),
        // Every listed value must be present. An empty list matches nothing.
        Comparable::Array(values) => {
            !values.is_empty() && values.iter().all(|value| actual.matches(value))
        },
        value => actual.matches(value),
    }
}

fn any_of(actual: &Comparable<'_>, expected: &Comparable<'_>) -> bool {
    match expected {
        Comparable::Array(values) => values.iter().any(|value| actual.matches(value)),
        single_value => actual.matches(single_value),
    }
}
