use std::collections::HashMap;

/// Known metadata values per attribute, harvested from the deployment's
/// document sources. Used to turn recognized values in a query into equality
/// filters for retrieval.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    values: HashMap<String, Vec<String>>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: impl Into<String>, values: Vec<String>) {
        self.values.insert(attribute.into(), values);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Equality constraints for every catalog value mentioned in the query.
    /// Matching is case-insensitive; the first matching value per attribute
    /// wins. An empty result means "no opinion" — the caller keeps whatever
    /// constraints it already had.
    pub fn constraints_for(&self, query: &str) -> HashMap<String, String> {
        let query = query.to_lowercase();
        let mut constraints = HashMap::new();
        for (attribute, values) in &self.values {
            for value in values {
                if !value.is_empty() && query.contains(&value.to_lowercase()) {
                    constraints.insert(attribute.clone(), value.clone());
                    break;
                }
            }
        }
        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MetadataCatalog {
        let mut catalog = MetadataCatalog::new();
        catalog.insert("department", vec!["Support".into(), "Billing".into()]);
        catalog.insert("region", vec!["Texas".into()]);
        catalog
    }

    #[test]
    fn mentioned_values_become_equality_constraints() {
        let constraints = catalog().constraints_for("what does billing say about refunds in texas?");
        assert_eq!(constraints.get("department").map(String::as_str), Some("Billing"));
        assert_eq!(constraints.get("region").map(String::as_str), Some("Texas"));
    }

    #[test]
    fn unmentioned_attributes_stay_absent() {
        let constraints = catalog().constraints_for("what is the refund policy?");
        assert!(constraints.is_empty());
    }
}
