//! Catalog record model.
//!
//! Records arrive from the catalog provider and are immutable from then on.
//! A [`RecordSet`] is a shared, immutable sequence: replacing the data means
//! building a new set, never mutating one in place, so consumers can detect
//! changes with [`RecordSet::ptr_eq`].

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable identifier of a catalog entity.
///
/// Providers emit either integer or string identifiers; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier (database primary key).
    Int(i64),
    /// Opaque string identifier.
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Accept prices as JSON numbers or numeric strings (decimal columns are
/// often serialized as strings).
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Number::Float(value)) => Ok(Some(value)),
        Some(Number::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Number::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// One catalog component as rendered by the views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier.
    pub id: RecordId,
    /// Display name.
    #[serde(default)]
    pub part_name: Option<String>,
    /// Identifier code (part number).
    #[serde(default)]
    pub part_number: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Subcategory name.
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Name of the supplier of origin.
    #[serde(default, alias = "supplier_name")]
    pub original_supplier: Option<String>,
    /// Country of the supplier of origin.
    #[serde(default)]
    pub supplier_country: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Lower bound of the price range.
    #[serde(default, deserialize_with = "lenient_number")]
    pub price_min: Option<f64>,
    /// Upper bound of the price range.
    #[serde(default, deserialize_with = "lenient_number")]
    pub price_max: Option<f64>,
    /// ISO currency code of the price range.
    #[serde(default)]
    pub currency: Option<String>,
    /// Any additional attributes the provider sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Create a record with only an identifier and a display name.
    pub fn new(id: impl Into<RecordId>, part_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            part_name: Some(part_name.into()),
            part_number: None,
            category_name: None,
            subcategory: None,
            original_supplier: None,
            supplier_country: None,
            description: None,
            price_min: None,
            price_max: None,
            currency: None,
            extra: Map::new(),
        }
    }

    /// Set the part number.
    pub fn with_part_number(mut self, part_number: impl Into<String>) -> Self {
        self.part_number = Some(part_number.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_name = Some(category.into());
        self
    }

    /// Set the supplier of origin and its country.
    pub fn with_supplier(mut self, supplier: impl Into<String>, country: impl Into<String>) -> Self {
        self.original_supplier = Some(supplier.into());
        self.supplier_country = Some(country.into());
        self
    }

    /// Set the price range.
    pub fn with_price_range(mut self, min: f64, max: f64, currency: impl Into<String>) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self.currency = Some(currency.into());
        self
    }

    /// Name shown in views; falls back to the identifier.
    pub fn display_name(&self) -> String {
        match &self.part_name {
            Some(name) => name.clone(),
            None => format!("#{}", self.id),
        }
    }

    /// The fields free-text search looks at, in a fixed order.
    ///
    /// Missing fields are `None` and simply never match.
    pub fn searchable_fields(&self) -> [Option<&str>; 6] {
        [
            self.part_name.as_deref(),
            self.part_number.as_deref(),
            self.category_name.as_deref(),
            self.subcategory.as_deref(),
            self.original_supplier.as_deref(),
            self.supplier_country.as_deref(),
        ]
    }

    /// The price range, when both bounds are known.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        Some((self.price_min?, self.price_max?))
    }
}

/// An ordered, immutable, cheaply clonable sequence of records.
///
/// Insertion order is display order.
#[derive(Clone, PartialEq)]
pub struct RecordSet(Arc<[Record]>);

impl RecordSet {
    /// Wrap a list of records.
    pub fn new(records: Vec<Record>) -> Self {
        Self(Arc::from(records))
    }

    /// An empty set.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Whether both handles point at the same underlying allocation.
    ///
    /// This is the change-detection primitive: a replaced set is never
    /// `ptr_eq` to its predecessor.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Index of the record with the given identifier.
    pub fn position_of(&self, id: &RecordId) -> Option<usize> {
        self.0.iter().position(|record| &record.id == id)
    }

    /// Find a record by identifier.
    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.0.iter().find(|record| &record.id == id)
    }

    /// Whether a record with the given identifier is present.
    pub fn contains_id(&self, id: &RecordId) -> bool {
        self.position_of(id).is_some()
    }

    /// Borrow the records as a slice.
    pub fn as_slice(&self) -> &[Record] {
        &self.0
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for RecordSet {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("len", &self.0.len())
            .finish()
    }
}

/// A category as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Identifier.
    pub id: RecordId,
    /// Category name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Number of active components in the category.
    #[serde(default)]
    pub component_count: Option<u64>,
}

/// A supplier as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    /// Identifier.
    pub id: RecordId,
    /// Supplier name.
    pub name: String,
    /// Country of the supplier.
    #[serde(default)]
    pub country: Option<String>,
    /// Supplier website.
    #[serde(default)]
    pub website: Option<String>,
    /// Number of active components from this supplier.
    #[serde(default)]
    pub component_count: Option<u64>,
}

/// A directed supply-chain relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Identifier of the relationship itself.
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Entity kind of the source (`component`, `supplier`, ...).
    pub source_type: String,
    /// Identifier of the source entity.
    pub source_id: RecordId,
    /// Entity kind of the target.
    pub target_type: String,
    /// Identifier of the target entity.
    pub target_id: RecordId,
    /// Relationship kind.
    #[serde(default)]
    pub relationship_type: Option<String>,
    /// Relationship weight.
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

impl Relationship {
    /// If `(kind, id)` is one end of this relationship, return the other end.
    pub fn other_end(&self, kind: &str, id: &RecordId) -> Option<(&str, &RecordId)> {
        if self.source_type == kind && &self.source_id == id {
            Some((&self.target_type, &self.target_id))
        } else if self.target_type == kind && &self.target_id == id {
            Some((&self.source_type, &self.source_id))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_ids_accept_numbers_and_strings() {
        let numeric: Record = serde_json::from_value(json!({"id": 42, "part_name": "Rotor"})).unwrap();
        let textual: Record =
            serde_json::from_value(json!({"id": "BRK-7", "part_name": "Pad"})).unwrap();

        assert_eq!(numeric.id, RecordId::Int(42));
        assert_eq!(textual.id, RecordId::Text("BRK-7".to_string()));
        assert_eq!(numeric.id.to_string(), "42");
    }

    #[test]
    fn test_record_deserialization_details() {
        let record: Record = serde_json::from_value(json!({
            "id": 7,
            "part_name": "Brake Caliper Assembly",
            "part_number": "BC-100",
            "supplier_name": "Brembo",
            "price_min": "120.50",
            "price_max": 180,
            "specifications": {"pistons": 4}
        }))
        .unwrap();

        assert_eq!(record.original_supplier.as_deref(), Some("Brembo"));
        assert_eq!(record.price_range(), Some((120.5, 180.0)));
        assert_eq!(record.extra["specifications"]["pistons"], 4);
        assert!(record.category_name.is_none());
    }

    #[test]
    fn test_searchable_fields_skip_missing() {
        let record = Record::new(1, "Throttle Body").with_category("Engine");
        let present: Vec<&str> = record.searchable_fields().into_iter().flatten().collect();
        assert_eq!(present, vec!["Throttle Body", "Engine"]);
    }

    #[test]
    fn test_display_name_fallback() {
        let mut record = Record::new(9, "Hub");
        record.part_name = None;
        assert_eq!(record.display_name(), "#9");
    }

    #[test]
    fn test_record_set_identity_and_lookup() {
        let set = RecordSet::new(vec![Record::new(1, "A"), Record::new(2, "B")]);
        let clone = set.clone();
        let rebuilt = RecordSet::new(set.to_vec());

        assert!(set.ptr_eq(&clone));
        assert!(!set.ptr_eq(&rebuilt));
        assert_eq!(set, rebuilt);

        assert_eq!(set.position_of(&RecordId::Int(2)), Some(1));
        assert!(set.find(&RecordId::Int(3)).is_none());
        assert!(set.contains_id(&1.into()));
    }

    #[test]
    fn test_relationship_other_end() {
        let rel: Relationship = serde_json::from_value(json!({
            "id": 1,
            "source_type": "supplier",
            "source_id": 3,
            "target_type": "component",
            "target_id": 42,
            "value": 1.0
        }))
        .unwrap();

        let component = RecordId::Int(42);
        assert_eq!(rel.other_end("component", &component), Some(("supplier", &RecordId::Int(3))));
        assert!(rel.other_end("supplier", &component).is_none());
    }
}
