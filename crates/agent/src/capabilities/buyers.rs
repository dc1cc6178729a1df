use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::{LatencyClass, ToolDescriptor};
use dealdesk_core::domain::buyer::{Buyer, BuyerId};
use dealdesk_core::domain::deal::{Deal, DealId};
use dealdesk_core::errors::ToolError;

use super::{limit_arg, optional_str, require_str, unrouted_tool, ToolCall, ToolModule};
use crate::store::{DealStore, EnrichmentService};

const TOOLS: &[&str] = &["get_buyer", "search_buyers", "match_buyers", "research_buyer"];

/// Buyer lookups, deterministic fit scoring, and third-party research.
pub struct BuyersModule {
    store: Arc<dyn DealStore>,
    enrichment: Arc<dyn EnrichmentService>,
}

impl BuyersModule {
    pub fn new(store: Arc<dyn DealStore>, enrichment: Arc<dyn EnrichmentService>) -> Self {
        Self { store, enrichment }
    }

    async fn get_buyer(&self, args: &Value) -> Result<Value, ToolError> {
        let buyer_id = BuyerId(require_str(args, "buyer_id")?.to_string());
        let buyer = self.store.get_buyer(&buyer_id).await?;
        Ok(json!({ "buyer": buyer }))
    }

    async fn search_buyers(&self, args: &Value) -> Result<Value, ToolError> {
        let query = optional_str(args, "query").unwrap_or("");
        let buyers = self.store.search_buyers(query, limit_arg(args, 20)).await?;
        let total = buyers.len();
        Ok(json!({ "buyers": buyers, "total": total }))
    }

    async fn match_buyers(&self, args: &Value) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(args, "deal_id")?.to_string());
        let deal = self.store.get_deal(&deal_id).await?;
        let buyers = self.store.all_buyers().await?;
        let limit = limit_arg(args, 10);

        let mut matches: Vec<Value> = buyers
            .iter()
            .map(|buyer| {
                let score = fit_score(&deal, buyer);
                json!({ "buyer": buyer, "fit_score": score })
            })
            .collect();
        matches.sort_by_key(|entry| {
            std::cmp::Reverse(entry["fit_score"].as_u64().unwrap_or(0))
        });
        matches.truncate(limit);

        Ok(json!({ "deal_id": deal_id.0, "matches": matches }))
    }

    async fn research_buyer(&self, args: &Value) -> Result<Value, ToolError> {
        let buyer_id = BuyerId(require_str(args, "buyer_id")?.to_string());
        let buyer = self.store.get_buyer(&buyer_id).await?;
        let profile = self.enrichment.research_buyer(&buyer).await?;
        Ok(json!({ "buyer_id": buyer_id.0, "profile": profile }))
    }
}

/// Deterministic 0..=100 fit score. Purely a ranking heuristic; ties resolve
/// by store iteration order, which the fixtures keep stable.
fn fit_score(deal: &Deal, buyer: &Buyer) -> u64 {
    let mut score = 0u64;
    if buyer.active {
        score += 40;
    }
    // Check size can comfortably absorb the deal.
    if buyer.aum_cents >= deal.value_cents.saturating_mul(10) {
        score += 30;
    } else if buyer.aum_cents >= deal.value_cents {
        score += 15;
    }
    let deal_name = deal.name.to_ascii_lowercase();
    if deal_name.contains(&buyer.sector.to_ascii_lowercase()) {
        score += 30;
    }
    score.min(100)
}

#[async_trait]
impl ToolModule for BuyersModule {
    fn name(&self) -> &'static str {
        "buyers"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "get_buyer",
                "Fetch one buyer profile by id",
                json!({
                    "type": "object",
                    "properties": { "buyer_id": { "type": "string" } },
                    "required": ["buyer_id"],
                }),
            ),
            ToolDescriptor::new(
                "search_buyers",
                "Search buyers by name or sector keywords",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "limit": { "type": "integer", "default": 20 },
                    },
                }),
            ),
            ToolDescriptor::new(
                "match_buyers",
                "Rank buyers by fit score against one deal",
                json!({
                    "type": "object",
                    "properties": {
                        "deal_id": { "type": "string" },
                        "limit": { "type": "integer", "default": 10 },
                    },
                    "required": ["deal_id"],
                }),
            ),
            ToolDescriptor::new(
                "research_buyer",
                "Pull a third-party research profile for a buyer (slow)",
                json!({
                    "type": "object",
                    "properties": { "buyer_id": { "type": "string" } },
                    "required": ["buyer_id"],
                }),
            )
            .with_latency(LatencyClass::Enrichment),
        ]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            "get_buyer" => self.get_buyer(call.args).await,
            "search_buyers" => self.search_buyers(call.args).await,
            "match_buyers" => self.match_buyers(call.args).await,
            "research_buyer" => self.research_buyer(call.args).await,
            other => Err(unrouted_tool("buyers", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{BuyersModule, ToolCall, ToolModule};
    use crate::store::{InMemoryDealStore, StaticEnrichmentService};

    fn module() -> BuyersModule {
        BuyersModule::new(
            Arc::new(InMemoryDealStore::with_fixtures()),
            Arc::new(StaticEnrichmentService),
        )
    }

    #[tokio::test]
    async fn matching_ranks_the_sector_fit_first() {
        // Harbor Logistics should rank the logistics-sector buyer highest.
        let args = json!({"deal_id": "D-100"});
        let data = module()
            .run(ToolCall { name: "match_buyers", args: &args, caller_id: "u1" })
            .await
            .unwrap();

        let matches = data["matches"].as_array().unwrap();
        assert_eq!(matches[0]["buyer"]["name"], "Granite Peak Capital");
        assert!(matches[0]["fit_score"].as_u64().unwrap() > matches[1]["fit_score"].as_u64().unwrap());
    }

    #[tokio::test]
    async fn research_wraps_the_enrichment_profile() {
        let args = json!({"buyer_id": "B-2"});
        let data = module()
            .run(ToolCall { name: "research_buyer", args: &args, caller_id: "u1" })
            .await
            .unwrap();
        assert_eq!(data["buyer_id"], "B-2");
        assert!(data["profile"]["summary"].as_str().unwrap().contains("Bluewater"));
    }

    #[tokio::test]
    async fn unknown_buyer_is_a_not_found_error() {
        let args = json!({"buyer_id": "B-404"});
        let error = module()
            .run(ToolCall { name: "get_buyer", args: &args, caller_id: "u1" })
            .await
            .unwrap_err();
        assert!(error.to_string().contains("not found"));
    }
}
