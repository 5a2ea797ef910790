//! Record queries and cache keys.

use std::fmt;

/// Server-side filter parameters for a record listing.
///
/// The default query lists every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordQuery {
    /// Free-text search.
    pub search: Option<String>,
    /// Category name filter.
    pub category: Option<String>,
    /// Supplier name filter.
    pub supplier: Option<String>,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() { None } else { Some(value) }
}

impl RecordQuery {
    /// The unfiltered listing.
    pub fn all() -> Self {
        Self::default()
    }

    /// A free-text search.
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: non_empty(term),
            ..Self::default()
        }
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_empty(category);
        self
    }

    /// Restrict to a supplier.
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = non_empty(supplier);
        self
    }

    /// Whether this is the unfiltered listing.
    pub fn is_all(&self) -> bool {
        self.search.is_none() && self.category.is_none() && self.supplier.is_none()
    }

    /// Query-string pairs for the non-empty parameters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        [
            ("search", &self.search),
            ("category", &self.category),
            ("supplier", &self.supplier),
        ]
        .into_iter()
        .filter_map(|(key, value)| Some((key.to_string(), value.clone()?)))
        .collect()
    }
}

impl fmt::Display for RecordQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("all");
        }
        let pairs = self.to_query_pairs();
        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Identifies one cached provider response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A record listing.
    Records(RecordQuery),
    /// The category list.
    Categories,
    /// The supplier list.
    Suppliers,
    /// The relationship list.
    Relationships,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records(query) => write!(f, "records[{query}]"),
            Self::Categories => f.write_str("categories"),
            Self::Suppliers => f.write_str("suppliers"),
            Self::Relationships => f.write_str("relationships"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_non_empty_params() {
        let query = RecordQuery::search("brake").with_category("").with_supplier("Bosch");
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("search".to_string(), "brake".to_string()),
                ("supplier".to_string(), "Bosch".to_string()),
            ]
        );
        assert!(!query.is_all());
        assert_eq!(query.to_string(), "search=brake&supplier=Bosch");
    }

    #[test]
    fn test_blank_search_is_all() {
        assert!(RecordQuery::search("   ").is_all());
        assert_eq!(CacheKey::Records(RecordQuery::all()).to_string(), "records[all]");
    }
}
