//! Provider payload normalization.
//!
//! Providers answer list endpoints either with a bare JSON array or with an
//! envelope object holding the array under a well-known field. Each body is
//! classified once into [`Envelope`] and reduced to a typed [`Page`]; nothing
//! downstream ever looks at the raw shape again.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{CatalogError, CatalogResult};

/// Envelope fields holding component records.
pub const RECORD_FIELDS: &[&str] = &["components", "data"];
/// Envelope fields holding categories.
pub const CATEGORY_FIELDS: &[&str] = &["categories", "data"];
/// Envelope fields holding suppliers.
pub const SUPPLIER_FIELDS: &[&str] = &["suppliers", "data"];
/// Envelope fields holding relationships.
pub const RELATIONSHIP_FIELDS: &[&str] = &["relationships", "data"];

/// Page position reported by a paginated list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    /// 1-based index of this page.
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
}

impl Pagination {
    /// Whether another page follows this one.
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// One normalized list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items, in provider order.
    pub items: Vec<T>,
    /// Pagination info when the provider sent it.
    pub pagination: Option<Pagination>,
}

/// The recognized body shapes.
#[derive(Debug)]
enum Envelope {
    /// `[ ... ]`
    Bare(Vec<Value>),
    /// `{ "<field>": [ ... ], "pagination": { ... }? }`
    Wrapped {
        items: Vec<Value>,
        pagination: Option<Pagination>,
    },
    /// `{ "success": false, "error": "..." }`
    Failure(String),
}

impl Envelope {
    fn classify(body: Value, fields: &[&str]) -> CatalogResult<Self> {
        match body {
            Value::Array(items) => Ok(Self::Bare(items)),
            Value::Object(map) => Self::classify_object(map, fields),
            other => Err(CatalogError::malformed(format!(
                "expected a JSON array or object, found {}",
                kind_of(&other)
            ))),
        }
    }

    fn classify_object(mut map: Map<String, Value>, fields: &[&str]) -> CatalogResult<Self> {
        if map.get("success") == Some(&Value::Bool(false)) {
            let message = map
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("provider reported failure")
                .to_string();
            return Ok(Self::Failure(message));
        }

        let pagination = map
            .get("pagination")
            .and_then(|value| Pagination::deserialize(value).ok());

        for field in fields {
            match map.remove(*field) {
                Some(Value::Array(items)) => return Ok(Self::Wrapped { items, pagination }),
                Some(other) => {
                    return Err(CatalogError::malformed(format!(
                        "field `{field}` must be an array, found {}",
                        kind_of(&other)
                    )));
                }
                None => {}
            }
        }

        Err(CatalogError::malformed(format!(
            "expected an array or an object with one of the fields {}",
            fields
                .iter()
                .map(|f| format!("`{f}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize a successful (`2xx`) response body into a typed page.
///
/// `status` is the HTTP status the body arrived with; it is reported when the
/// envelope itself signals failure.
pub fn normalize<T: DeserializeOwned>(
    body: Value,
    fields: &[&str],
    status: u16,
) -> CatalogResult<Page<T>> {
    let (items, pagination) = match Envelope::classify(body, fields)? {
        Envelope::Bare(items) => (items, None),
        Envelope::Wrapped { items, pagination } => (items, pagination),
        Envelope::Failure(message) => {
            return Err(CatalogError::ProviderError { status, message });
        }
    };

    let items = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| CatalogError::malformed(format!("item {index}: {e}")))
        })
        .collect::<CatalogResult<Vec<T>>>()?;

    Ok(Page { items, pagination })
}

#[cfg(test)]
mod tests {
    use super::*;
    use partscope_core::{Category, Record, RecordId};
    use serde_json::json;

    #[test]
    fn test_bare_array() {
        let page: Page<Record> = normalize(
            json!([{"id": 1, "part_name": "Rotor"}, {"id": 2, "part_name": "Pad"}]),
            RECORD_FIELDS,
            200,
        )
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].id, RecordId::Int(2));
        assert!(page.pagination.is_none());
    }

    #[test]
    fn test_components_envelope_with_pagination() {
        let page: Page<Record> = normalize(
            json!({
                "success": true,
                "components": [{"id": 7, "part_name": "Hub"}],
                "pagination": {"page": 1, "limit": 200, "total": 250, "pages": 2}
            }),
            RECORD_FIELDS,
            200,
        )
        .unwrap();

        assert_eq!(page.items[0].part_name.as_deref(), Some("Hub"));
        assert_eq!(page.pagination, Some(Pagination { page: 1, pages: 2 }));
        assert!(page.pagination.unwrap().has_next());
    }

    #[test]
    fn test_data_envelope() {
        let page: Page<Category> = normalize(
            json!({"data": [{"id": 3, "name": "Brakes", "component_count": 12}]}),
            CATEGORY_FIELDS,
            200,
        )
        .unwrap();
        assert_eq!(page.items[0].name, "Brakes");
    }

    #[test]
    fn test_failure_envelope() {
        let err = normalize::<Record>(
            json!({"success": false, "error": "Failed to fetch components"}),
            RECORD_FIELDS,
            200,
        )
        .unwrap_err();

        assert_eq!(
            err,
            CatalogError::ProviderError {
                status: 200,
                message: "Failed to fetch components".into()
            }
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        let err = normalize::<Record>(json!({"items": []}), RECORD_FIELDS, 200).unwrap_err();
        assert!(err.to_string().contains("`components`, `data`"));

        let err = normalize::<Record>(json!("oops"), RECORD_FIELDS, 200).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse { .. }));

        let err = normalize::<Record>(json!({"components": {"id": 1}}), RECORD_FIELDS, 200)
            .unwrap_err();
        assert!(err.to_string().contains("must be an array"));
    }

    #[test]
    fn test_bad_item_is_malformed() {
        let err = normalize::<Record>(json!([{"part_name": "no id"}]), RECORD_FIELDS, 200)
            .unwrap_err();
        assert!(err.to_string().contains("item 0"));
    }
}
