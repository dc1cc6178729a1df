use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::ToolDescriptor;
use dealdesk_core::errors::ToolError;

use super::{unrouted_tool, ToolCall, ToolModule};

pub const LIST_CAPABILITIES: &str = "list_capabilities";
pub const LIST_CAPABILITIES_DESCRIPTION: &str =
    "List every available tool with a one-line description";

const TOOLS: &[&str] = &[LIST_CAPABILITIES];

/// Introspection over the assembled toolkit. `list_capabilities` is the safe,
/// read-only tool the router falls back to when classification degrades.
pub struct MetaModule {
    summaries: Vec<(String, String)>,
}

impl MetaModule {
    pub fn new(summaries: Vec<(String, String)>) -> Self {
        Self { summaries }
    }
}

#[async_trait]
impl ToolModule for MetaModule {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            LIST_CAPABILITIES,
            LIST_CAPABILITIES_DESCRIPTION,
            json!({ "type": "object", "properties": {} }),
        )]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            LIST_CAPABILITIES => {
                let tools: Vec<Value> = self
                    .summaries
                    .iter()
                    .map(|(name, description)| {
                        json!({ "name": name, "description": description })
                    })
                    .collect();
                Ok(json!({ "tools": tools, "total": self.summaries.len() }))
            }
            other => Err(unrouted_tool("meta", other)),
        }
    }
}
