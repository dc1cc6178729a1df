use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::ToolDescriptor;
use dealdesk_core::domain::deal::DealStage;
use dealdesk_core::errors::ToolError;

use super::{unrouted_tool, ToolCall, ToolModule};
use crate::store::DealStore;

const TOOLS: &[&str] = &["pipeline_summary"];

/// Pipeline rollups over the deal store.
pub struct AnalyticsModule {
    store: Arc<dyn DealStore>,
}

impl AnalyticsModule {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self { store }
    }

    async fn pipeline_summary(&self) -> Result<Value, ToolError> {
        let deals = self.store.all_deals().await?;

        let mut stages = Vec::with_capacity(DealStage::ALL.len());
        for stage in DealStage::ALL {
            let in_stage: Vec<_> = deals.iter().filter(|deal| deal.stage == stage).collect();
            let value_cents: i64 = in_stage.iter().map(|deal| deal.value_cents).sum();
            stages.push(json!({
                "stage": stage.as_str(),
                "count": in_stage.len(),
                "value_cents": value_cents,
            }));
        }

        let open_value_cents: i64 = deals
            .iter()
            .filter(|deal| !matches!(deal.stage, DealStage::Closed | DealStage::Lost))
            .map(|deal| deal.value_cents)
            .sum();
        let total_value_cents: i64 = deals.iter().map(|deal| deal.value_cents).sum();

        Ok(json!({
            "stages": stages,
            "total_deals": deals.len(),
            "total_value_cents": total_value_cents,
            "open_value_cents": open_value_cents,
        }))
    }
}

#[async_trait]
impl ToolModule for AnalyticsModule {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            "pipeline_summary",
            "Roll up the pipeline: deal counts and value per stage",
            json!({ "type": "object", "properties": {} }),
        )]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            "pipeline_summary" => self.pipeline_summary().await,
            other => Err(unrouted_tool("analytics", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{AnalyticsModule, ToolCall, ToolModule};
    use crate::store::InMemoryDealStore;

    #[tokio::test]
    async fn summary_counts_every_stage_in_fixed_order() {
        let module = AnalyticsModule::new(Arc::new(InMemoryDealStore::with_fixtures()));
        let args = json!({});
        let data = module
            .run(ToolCall { name: "pipeline_summary", args: &args, caller_id: "u1" })
            .await
            .unwrap();

        let stages = data["stages"].as_array().unwrap();
        assert_eq!(stages.len(), 6);
        assert_eq!(stages[0]["stage"], "sourced");
        assert_eq!(stages[0]["count"], 1);
        assert_eq!(data["total_deals"], 4);
        assert_eq!(data["open_value_cents"], 1_550_000_000i64);
    }
}
