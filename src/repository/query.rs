//! Filters, sort and projection for document queries

use serde_json::{Map, Value};

/// Conjunction of field-equality predicates.
///
/// A predicate on an array-valued field matches when the array contains the
/// value, so `genre = X` selects every book listing genre X.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<(String, String)>,
}

impl Filter {
    /// Filter matching every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl ToString) -> Self {
        self.predicates.push((field.to_string(), value.to_string()));
        self
    }

    pub fn predicates(&self) -> &[(String, String)] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|(field, expected)| match document.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Array(values)) => values
                .iter()
                .any(|v| v.as_str() == Some(expected.as_str())),
            _ => false,
        })
    }
}

/// A find-many request: filter, optional ascending sort field, optional projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<String>,
    pub projection: Option<Vec<String>>,
}

impl FindQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, field: &str) -> Self {
        self.sort = Some(field.to_string());
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Restrict a document to the projected fields. `id` is always kept.
    pub fn project(&self, document: Value) -> Value {
        let Some(fields) = &self.projection else {
            return document;
        };
        match document {
            Value::Object(mut body) => {
                let mut projected = Map::new();
                if let Some(id) = body.remove("id") {
                    projected.insert("id".to_string(), id);
                }
                for field in fields {
                    if let Some(value) = body.remove(field) {
                        projected.insert(field.clone(), value);
                    }
                }
                Value::Object(projected)
            }
            other => other,
        }
    }
}

/// Sort key of a document for a field: strings compare as-is, anything else
/// by its JSON text, missing fields first.
pub fn sort_key(document: &Value, field: &str) -> String {
    match document.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_scalar_and_array_fields() {
        let book = json!({ "id": "b1", "author": "a1", "genre": ["g1", "g2"] });

        assert!(Filter::all().matches(&book));
        assert!(Filter::all().eq("author", "a1").matches(&book));
        assert!(Filter::all().eq("genre", "g2").matches(&book));
        assert!(!Filter::all().eq("genre", "g3").matches(&book));
        assert!(!Filter::all().eq("author", "a1").eq("genre", "g3").matches(&book));
        assert!(!Filter::all().eq("missing", "x").matches(&book));
    }

    #[test]
    fn test_projection_keeps_id() {
        let query = FindQuery::all().select(&["title"]);
        let projected = query.project(json!({ "id": "b1", "title": "Dune", "summary": "Spice" }));
        assert_eq!(projected, json!({ "id": "b1", "title": "Dune" }));
    }

    #[test]
    fn test_sort_key_missing_field_sorts_first() {
        assert_eq!(sort_key(&json!({}), "name"), "");
        assert_eq!(sort_key(&json!({ "name": "Poetry" }), "name"), "Poetry");
    }
}
