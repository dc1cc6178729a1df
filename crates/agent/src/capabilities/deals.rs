use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::ToolDescriptor;
use dealdesk_core::domain::deal::{DealId, DealStage};
use dealdesk_core::errors::ToolError;

use super::{limit_arg, optional_str, require_str, unrouted_tool, ToolCall, ToolModule};
use crate::store::DealStore;

const TOOLS: &[&str] = &["get_deal", "search_deals", "list_deals_by_stage"];

/// Read-only deal lookups over the deal store.
pub struct DealsModule {
    store: Arc<dyn DealStore>,
}

impl DealsModule {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self { store }
    }

    async fn get_deal(&self, args: &Value) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(args, "deal_id")?.to_string());
        let deal = self.store.get_deal(&deal_id).await?;
        Ok(json!({ "deal": deal }))
    }

    async fn search_deals(&self, args: &Value) -> Result<Value, ToolError> {
        let query = optional_str(args, "query").unwrap_or("");
        let deals = self.store.search_deals(query, limit_arg(args, 20)).await?;
        let total = deals.len();
        Ok(json!({ "deals": deals, "total": total }))
    }

    async fn list_deals_by_stage(&self, args: &Value) -> Result<Value, ToolError> {
        let label = require_str(args, "stage")?;
        let stage = DealStage::parse_label(label).ok_or_else(|| {
            ToolError::InvalidArguments(format!("unknown deal stage `{label}`"))
        })?;
        let deals = self.store.deals_by_stage(stage).await?;
        let total = deals.len();
        Ok(json!({ "stage": stage.as_str(), "deals": deals, "total": total }))
    }
}

#[async_trait]
impl ToolModule for DealsModule {
    fn name(&self) -> &'static str {
        "deals"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "get_deal",
                "Fetch one deal by id, including stage, owner, and value",
                json!({
                    "type": "object",
                    "properties": { "deal_id": { "type": "string" } },
                    "required": ["deal_id"],
                }),
            ),
            ToolDescriptor::new(
                "search_deals",
                "Search deals by name keywords",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "limit": { "type": "integer", "default": 20 },
                    },
                }),
            ),
            ToolDescriptor::new(
                "list_deals_by_stage",
                "List every deal currently in a pipeline stage",
                json!({
                    "type": "object",
                    "properties": { "stage": { "type": "string" } },
                    "required": ["stage"],
                }),
            ),
        ]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            "get_deal" => self.get_deal(call.args).await,
            "search_deals" => self.search_deals(call.args).await,
            "list_deals_by_stage" => self.list_deals_by_stage(call.args).await,
            other => Err(unrouted_tool("deals", other)),
        }
    }
}
