//! Query translation from podstore filter expressions to MongoDB query syntax.
//!
//! String operators become anchored, escaped regular expressions, so the pattern
//! characters in a search term are matched literally. Matching is case-sensitive.

use bson::{Document, Bson, doc};

use podstore_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Translates podstore query expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Validates `expr` and translates it into a filter document.
    pub fn translate(expr: &Expr) -> DocumentStoreResult<Document> {
        expr.validate()?;

        MongoQueryTranslator.visit_expr(expr)
    }

    /// Translates an optional filter. No filter matches every document.
    pub fn translate_optional(expr: Option<&Expr>) -> DocumentStoreResult<Document> {
        match expr {
            Some(expr) => Self::translate(expr),
            None => Ok(doc! {}),
        }
    }

    pub fn translate_sort(sort: &Sort) -> Document {
        doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty $and.
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // $not only applies to operator expressions, $nor negates whole filters.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$eq": other },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                    Bson::Array(arr) => doc! { "$not": { "$all": arr } },
                    other => doc! { "$ne": other },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(s)) },
                    _ => return Err(DocumentStoreError::Query(format!("StartsWith on {field} requires a string value"))),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(s)) },
                    _ => return Err(DocumentStoreError::Query(format!("EndsWith on {field} requires a string value"))),
                },
                FieldOp::AnyOf => doc! { "$in": value },
                FieldOp::NoneOf => doc! { "$nin": value },
            }
        })
    }
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        if matches!(c, '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use podstore_core::query::Filter;
    use rstest::rstest;

    #[rstest]
    #[case(Filter::eq("duration", 25), doc! { "duration": { "$eq": 25 } })]
    #[case(Filter::gt("duration", 22), doc! { "duration": { "$gt": 22 } })]
    #[case(Filter::contains("title", "C++"), doc! { "title": { "$regex": "C\\+\\+" } })]
    #[case(Filter::starts_with("title", "The"), doc! { "title": { "$regex": "^The" } })]
    #[case(Filter::ends_with("title", "show."), doc! { "title": { "$regex": "show\\.$" } })]
    #[case(Filter::contains("tags", vec!["api"]), doc! { "tags": { "$all": ["api"] } })]
    #[case(Filter::any_of("duration", vec![25, 32]), doc! { "duration": { "$in": [25, 32] } })]
    #[case(Filter::exists("tags"), doc! { "tags": { "$exists": true } })]
    #[case(Filter::eq("duration", 25).not(), doc! { "$nor": [{ "duration": { "$eq": 25 } }] })]
    #[case(Filter::all(), doc! {})]
    fn translates_filters(#[case] expr: Expr, #[case] expected: Document) {
        assert_eq!(MongoQueryTranslator::translate(&expr).unwrap(), expected);
    }

    #[test]
    fn translates_conjunctions() {
        let id = ObjectId::new();
        let expr = Filter::id(id).and(Filter::eq("title", "Episode 1"));

        assert_eq!(
            MongoQueryTranslator::translate(&expr).unwrap(),
            doc! { "$and": [{ "_id": { "$eq": id } }, { "title": { "$eq": "Episode 1" } }] },
        );
    }

    #[test]
    fn rejects_operator_field_names() {
        let result = MongoQueryTranslator::translate(&Filter::eq("$where", "sleep(1000)"));

        assert!(matches!(result, Err(DocumentStoreError::Query(_))));
    }

    #[test]
    fn translates_sort_direction() {
        let sort = Sort { field: "duration".to_string(), direction: SortDirection::Desc };

        assert_eq!(MongoQueryTranslator::translate_sort(&sort), doc! { "duration": -1 });
    }
}
