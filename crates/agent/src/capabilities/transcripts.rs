use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::{LatencyClass, ToolDescriptor};
use dealdesk_core::domain::deal::DealId;
use dealdesk_core::domain::transcript::TranscriptId;
use dealdesk_core::errors::ToolError;

use super::{limit_arg, optional_str, require_str, unrouted_tool, ToolCall, ToolModule};
use crate::store::TranscriptService;

const TOOLS: &[&str] = &["search_transcripts", "get_transcript"];

/// Call-transcript search over the external recording service.
pub struct TranscriptsModule {
    service: Arc<dyn TranscriptService>,
}

impl TranscriptsModule {
    pub fn new(service: Arc<dyn TranscriptService>) -> Self {
        Self { service }
    }

    async fn search_transcripts(&self, args: &Value) -> Result<Value, ToolError> {
        let query = optional_str(args, "query").unwrap_or("");
        let deal_id = optional_str(args, "deal_id").map(|id| DealId(id.to_string()));
        let hits =
            self.service.search(query, deal_id.as_ref(), limit_arg(args, 10)).await?;
        let total = hits.len();
        Ok(json!({ "transcripts": hits, "total": total }))
    }

    async fn get_transcript(&self, args: &Value) -> Result<Value, ToolError> {
        let id = TranscriptId(require_str(args, "transcript_id")?.to_string());
        let hit = self.service.fetch(&id).await?;
        Ok(json!({ "transcript": hit }))
    }
}

#[async_trait]
impl ToolModule for TranscriptsModule {
    fn name(&self) -> &'static str {
        "transcripts"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "search_transcripts",
                "Search call transcripts by keyword, optionally scoped to a deal",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "deal_id": { "type": "string" },
                        "limit": { "type": "integer", "default": 10 },
                    },
                }),
            )
            .with_latency(LatencyClass::Network),
            ToolDescriptor::new(
                "get_transcript",
                "Fetch one call transcript by id",
                json!({
                    "type": "object",
                    "properties": { "transcript_id": { "type": "string" } },
                    "required": ["transcript_id"],
                }),
            )
            .with_latency(LatencyClass::Network),
        ]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            "search_transcripts" => self.search_transcripts(call.args).await,
            "get_transcript" => self.get_transcript(call.args).await,
            other => Err(unrouted_tool("transcripts", other)),
        }
    }
}
