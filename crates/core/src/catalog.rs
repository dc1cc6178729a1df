//! Capability Catalog and Category Map
//!
//! The catalog is the process-wide table of capability descriptors, built once
//! at startup and injected wherever tools are resolved or dispatched. It never
//! changes at runtime.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;

use crate::intent::RequestCategory;

/// Timeout tier a capability is dispatched under.
///
/// `Enrichment` covers capabilities that depend on slow third-party research
/// work, `Network` covers calls to other external services, and `Standard` is
/// the default for ordinary database-backed capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LatencyClass {
    #[default]
    Standard,
    Network,
    Enrichment,
}

/// One named, schema-described capability the agent may invoke.
#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub latency: LatencyClass,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str, input_schema: Value) -> Self {
        Self { name, description, input_schema, latency: LatencyClass::Standard }
    }

    pub fn with_latency(mut self, latency: LatencyClass) -> Self {
        self.latency = latency;
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),
    #[error("category {category} references unregistered tool {tool}")]
    UnknownCategoryTool { category: RequestCategory, tool: String },
}

/// Immutable capability table plus the category -> default-toolset map.
#[derive(Clone, Debug, Default)]
pub struct ToolCatalog {
    descriptors: BTreeMap<&'static str, ToolDescriptor>,
    categories: BTreeMap<RequestCategory, Vec<&'static str>>,
}

impl ToolCatalog {
    /// Build the catalog, checking referential integrity: every name in any
    /// category set must be a registered descriptor.
    pub fn new(
        descriptors: Vec<ToolDescriptor>,
        categories: Vec<(RequestCategory, Vec<&'static str>)>,
    ) -> Result<Self, CatalogError> {
        let mut table = BTreeMap::new();
        for descriptor in descriptors {
            if table.insert(descriptor.name, descriptor.clone()).is_some() {
                return Err(CatalogError::DuplicateTool(descriptor.name.to_string()));
            }
        }

        let mut category_map = BTreeMap::new();
        for (category, tools) in categories {
            for tool in &tools {
                if !table.contains_key(tool) {
                    return Err(CatalogError::UnknownCategoryTool {
                        category,
                        tool: tool.to_string(),
                    });
                }
            }
            category_map.insert(category, tools);
        }

        Ok(Self { descriptors: table, categories: category_map })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    /// Every registered capability name. Introspection and testing only.
    pub fn all_capabilities(&self) -> BTreeSet<String> {
        self.descriptors.keys().map(|name| name.to_string()).collect()
    }

    pub fn category_defaults(&self, category: RequestCategory) -> BTreeSet<String> {
        self.categories
            .get(&category)
            .map(|tools| tools.iter().map(|name| name.to_string()).collect())
            .unwrap_or_default()
    }

    /// Union of the category's defaults and any caller-supplied extras,
    /// filtered to registered names. Unknown extras are silently dropped:
    /// capability availability is advisory, not a contract violation. Extras
    /// merge, never substitute, so an upstream heuristic cannot starve the
    /// model of the category's baseline toolset.
    pub fn resolve_capabilities(
        &self,
        category: RequestCategory,
        extra: &[String],
    ) -> BTreeSet<String> {
        let mut resolved = self.category_defaults(category);
        for name in extra {
            if self.contains(name) {
                resolved.insert(name.clone());
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CatalogError, LatencyClass, ToolCatalog, ToolDescriptor};
    use crate::intent::RequestCategory;

    fn catalog_fixture() -> ToolCatalog {
        ToolCatalog::new(
            vec![
                ToolDescriptor::new("get_deal", "Fetch one deal", json!({"type": "object"})),
                ToolDescriptor::new("search_deals", "Search deals", json!({"type": "object"})),
                ToolDescriptor::new("research_buyer", "Research a buyer", json!({"type": "object"}))
                    .with_latency(LatencyClass::Enrichment),
            ],
            vec![
                (RequestCategory::DealLookup, vec!["get_deal", "search_deals"]),
                (RequestCategory::BuyerMatching, vec!["research_buyer"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn resolve_returns_category_defaults() {
        let catalog = catalog_fixture();
        let resolved = catalog.resolve_capabilities(RequestCategory::DealLookup, &[]);
        assert!(resolved.contains("get_deal"));
        assert!(resolved.contains("search_deals"));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn extras_merge_and_unknown_extras_are_dropped() {
        let catalog = catalog_fixture();
        let resolved = catalog.resolve_capabilities(
            RequestCategory::DealLookup,
            &["research_buyer".to_string(), "made_up_tool".to_string()],
        );

        let defaults = catalog.resolve_capabilities(RequestCategory::DealLookup, &[]);
        assert!(resolved.is_superset(&defaults), "extras must never shrink the default set");
        assert!(resolved.contains("research_buyer"));
        assert!(!resolved.contains("made_up_tool"));
    }

    #[test]
    fn unmapped_category_resolves_to_extras_only() {
        let catalog = catalog_fixture();
        let resolved = catalog
            .resolve_capabilities(RequestCategory::General, &["get_deal".to_string()]);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains("get_deal"));
    }

    #[test]
    fn construction_rejects_duplicate_tools() {
        let error = ToolCatalog::new(
            vec![
                ToolDescriptor::new("get_deal", "a", json!({})),
                ToolDescriptor::new("get_deal", "b", json!({})),
            ],
            vec![],
        )
        .unwrap_err();
        assert_eq!(error, CatalogError::DuplicateTool("get_deal".to_string()));
    }

    #[test]
    fn construction_rejects_dangling_category_references() {
        let error = ToolCatalog::new(
            vec![ToolDescriptor::new("get_deal", "a", json!({}))],
            vec![(RequestCategory::DealLookup, vec!["get_deal", "missing_tool"])],
        )
        .unwrap_err();
        assert!(matches!(error, CatalogError::UnknownCategoryTool { tool, .. } if tool == "missing_tool"));
    }

    #[test]
    fn default_latency_class_is_standard() {
        let catalog = catalog_fixture();
        assert_eq!(catalog.descriptor("get_deal").unwrap().latency, LatencyClass::Standard);
        assert_eq!(
            catalog.descriptor("research_buyer").unwrap().latency,
            LatencyClass::Enrichment
        );
    }
}
