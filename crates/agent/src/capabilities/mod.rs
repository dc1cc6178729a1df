//! Capability modules and the registry that binds them to the catalog.
//!
//! Each module is a thin bundle of data-access handlers behind the uniform
//! [`ToolModule`] interface; the dispatcher treats them all identically. The
//! registry assembles the process-wide catalog, category map, and
//! confirmation set once at startup.

pub mod actions;
pub mod analytics;
pub mod buyers;
pub mod deals;
pub mod meta;
pub mod transcripts;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use dealdesk_core::catalog::{CatalogError, ToolCatalog, ToolDescriptor};
use dealdesk_core::confirmation::ConfirmationSet;
use dealdesk_core::errors::ToolError;
use dealdesk_core::intent::RequestCategory;

use crate::store::{DealStore, EnrichmentService, TranscriptService};

/// One capability invocation as seen by a module.
#[derive(Clone, Copy, Debug)]
pub struct ToolCall<'a> {
    pub name: &'a str,
    pub args: &'a Value,
    pub caller_id: &'a str,
}

/// Uniform executor interface for a bundle of related capabilities.
#[async_trait]
pub trait ToolModule: Send + Sync {
    fn name(&self) -> &'static str;
    fn tool_names(&self) -> &'static [&'static str];
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    /// Run one owned tool. Failures are returned, never panicked, so the
    /// dispatcher's no-raise contract holds structurally.
    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError>;

    fn owns(&self, tool: &str) -> bool {
        self.tool_names().contains(&tool)
    }
}

/// Ordered, immutable set of modules plus exact-ownership lookup.
#[derive(Clone)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn ToolModule>>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<Arc<dyn ToolModule>>) -> Self {
        Self { modules }
    }

    pub fn owner_of(&self, tool: &str) -> Option<&Arc<dyn ToolModule>> {
        self.modules.iter().find(|module| module.owns(tool))
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.modules.iter().flat_map(|module| module.descriptors()).collect()
    }
}

/// Category map shipped with the standard toolkit. Declared here, next to the
/// modules that own the names, so the referential-integrity check in
/// [`ToolCatalog::new`] covers every entry.
fn category_map() -> Vec<(RequestCategory, Vec<&'static str>)> {
    vec![
        (RequestCategory::DealLookup, vec!["get_deal", "search_deals", "list_deals_by_stage"]),
        (
            RequestCategory::BuyerMatching,
            vec!["get_buyer", "search_buyers", "match_buyers", "research_buyer"],
        ),
        (
            RequestCategory::PipelineAnalytics,
            vec!["pipeline_summary", "list_deals_by_stage", "search_deals"],
        ),
        (
            RequestCategory::TranscriptSearch,
            vec!["search_transcripts", "get_transcript", "get_deal"],
        ),
        (
            RequestCategory::DealActions,
            vec!["get_deal", "update_deal_stage", "assign_deal_owner", "create_task", "log_outreach"],
        ),
        (RequestCategory::General, vec!["list_capabilities", "search_deals", "search_buyers"]),
    ]
}

fn confirmation_names() -> &'static [&'static str] {
    &["update_deal_stage", "assign_deal_owner", "create_task", "log_outreach"]
}

/// The fully assembled, load-once engine configuration: catalog, executors,
/// and the confirmation gate.
pub struct Toolkit {
    pub catalog: Arc<ToolCatalog>,
    pub registry: Arc<ModuleRegistry>,
    pub confirmation: ConfirmationSet,
}

/// Build the standard deal-management toolkit over the given collaborators.
pub fn standard_toolkit(
    store: Arc<dyn DealStore>,
    transcripts: Arc<dyn TranscriptService>,
    enrichment: Arc<dyn EnrichmentService>,
) -> Result<Toolkit, CatalogError> {
    let mut modules: Vec<Arc<dyn ToolModule>> = vec![
        Arc::new(deals::DealsModule::new(Arc::clone(&store))),
        Arc::new(analytics::AnalyticsModule::new(Arc::clone(&store))),
        Arc::new(buyers::BuyersModule::new(Arc::clone(&store), enrichment)),
        Arc::new(transcripts::TranscriptsModule::new(transcripts)),
        Arc::new(actions::ActionsModule::new(store)),
    ];

    let mut summaries: Vec<(String, String)> = modules
        .iter()
        .flat_map(|module| module.descriptors())
        .map(|descriptor| (descriptor.name.to_string(), descriptor.description.to_string()))
        .collect();
    summaries.push((
        meta::LIST_CAPABILITIES.to_string(),
        meta::LIST_CAPABILITIES_DESCRIPTION.to_string(),
    ));
    summaries.sort();
    modules.push(Arc::new(meta::MetaModule::new(summaries)));

    let registry = ModuleRegistry::new(modules);
    let catalog = ToolCatalog::new(registry.descriptors(), category_map())?;

    Ok(Toolkit {
        catalog: Arc::new(catalog),
        registry: Arc::new(registry),
        confirmation: ConfirmationSet::from_names(confirmation_names()),
    })
}

// Argument-bag helpers. Args are caller-supplied untyped maps; nothing may be
// assumed present.

pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required string `{key}`")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|value| !value.trim().is_empty())
}

pub(crate) fn limit_arg(args: &Value, default: usize) -> usize {
    args.get("limit").and_then(Value::as_u64).map(|value| value as usize).unwrap_or(default).max(1)
}

pub(crate) fn unrouted_tool(module: &'static str, tool: &str) -> ToolError {
    ToolError::InvalidArguments(format!("tool `{tool}` is not owned by the {module} module"))
}
