//! Mutating deal actions. Every tool here is in the confirmation set and must
//! be approved by the user before the calling layer dispatches it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_core::catalog::ToolDescriptor;
use dealdesk_core::domain::buyer::BuyerId;
use dealdesk_core::domain::deal::{DealId, DealStage};
use dealdesk_core::errors::ToolError;

use super::{optional_str, require_str, unrouted_tool, ToolCall, ToolModule};
use crate::store::DealStore;

const TOOLS: &[&str] = &["update_deal_stage", "assign_deal_owner", "create_task", "log_outreach"];

pub struct ActionsModule {
    store: Arc<dyn DealStore>,
}

impl ActionsModule {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self { store }
    }

    async fn update_deal_stage(&self, args: &Value) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(args, "deal_id")?.to_string());
        let label = require_str(args, "stage")?;
        let stage = DealStage::parse_label(label).ok_or_else(|| {
            ToolError::InvalidArguments(format!("unknown deal stage `{label}`"))
        })?;
        let deal = self.store.update_deal_stage(&deal_id, stage).await?;
        Ok(json!({ "deal": deal }))
    }

    async fn assign_deal_owner(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(call.args, "deal_id")?.to_string());
        // Sentinel resolution happens in the dispatcher; by the time this
        // runs, owner_id is a concrete user id.
        let owner_id = require_str(call.args, "owner_id")?;
        let deal = self.store.assign_deal_owner(&deal_id, owner_id).await?;
        Ok(json!({ "deal": deal }))
    }

    async fn create_task(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(call.args, "deal_id")?.to_string());
        let title = require_str(call.args, "title")?;
        let assignee_id = optional_str(call.args, "assignee_id").unwrap_or(call.caller_id);
        let task_id = self.store.create_task(&deal_id, title, assignee_id).await?;
        Ok(json!({ "task_id": task_id, "deal_id": deal_id.0, "assignee_id": assignee_id }))
    }

    async fn log_outreach(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        let deal_id = DealId(require_str(call.args, "deal_id")?.to_string());
        let buyer_id = BuyerId(require_str(call.args, "buyer_id")?.to_string());
        let channel = optional_str(call.args, "channel").unwrap_or("email");
        let note = optional_str(call.args, "note").unwrap_or("");
        let outreach_id =
            self.store.log_outreach(&deal_id, &buyer_id, channel, note, call.caller_id).await?;
        Ok(json!({ "outreach_id": outreach_id, "deal_id": deal_id.0, "buyer_id": buyer_id.0 }))
    }
}

#[async_trait]
impl ToolModule for ActionsModule {
    fn name(&self) -> &'static str {
        "actions"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        TOOLS
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "update_deal_stage",
                "Move a deal to a different pipeline stage (requires confirmation)",
                json!({
                    "type": "object",
                    "properties": {
                        "deal_id": { "type": "string" },
                        "stage": { "type": "string" },
                    },
                    "required": ["deal_id", "stage"],
                }),
            ),
            ToolDescriptor::new(
                "assign_deal_owner",
                "Assign a deal owner; pass CURRENT_USER to self-assign (requires confirmation)",
                json!({
                    "type": "object",
                    "properties": {
                        "deal_id": { "type": "string" },
                        "owner_id": { "type": "string" },
                    },
                    "required": ["deal_id", "owner_id"],
                }),
            ),
            ToolDescriptor::new(
                "create_task",
                "Create a follow-up task on a deal (requires confirmation)",
                json!({
                    "type": "object",
                    "properties": {
                        "deal_id": { "type": "string" },
                        "title": { "type": "string" },
                        "assignee_id": { "type": "string" },
                    },
                    "required": ["deal_id", "title"],
                }),
            ),
            ToolDescriptor::new(
                "log_outreach",
                "Record an outreach touch between a deal and a buyer (requires confirmation)",
                json!({
                    "type": "object",
                    "properties": {
                        "deal_id": { "type": "string" },
                        "buyer_id": { "type": "string" },
                        "channel": { "type": "string" },
                        "note": { "type": "string" },
                    },
                    "required": ["deal_id", "buyer_id"],
                }),
            ),
        ]
    }

    async fn run(&self, call: ToolCall<'_>) -> Result<Value, ToolError> {
        match call.name {
            "update_deal_stage" => self.update_deal_stage(call.args).await,
            "assign_deal_owner" => self.assign_deal_owner(call).await,
            "create_task" => self.create_task(call).await,
            "log_outreach" => self.log_outreach(call).await,
            other => Err(unrouted_tool("actions", other)),
        }
    }
}
