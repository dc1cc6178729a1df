//! Tool Dispatcher
//!
//! Resolves sentinel arguments, finds the owning module, and races the
//! handler against its timeout tier. Always settles to a [`ToolOutcome`];
//! nothing above the dispatcher ever sees a raised error from capability
//! execution. Stateless and reentrant, so concurrent invocations from one
//! conversational turn do not interfere.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dealdesk_core::catalog::ToolCatalog;
use dealdesk_core::config::DispatchConfig;
use dealdesk_core::outcome::ToolOutcome;

use crate::aliases::AliasTable;
use crate::capabilities::{ModuleRegistry, ToolCall};

/// Placeholder the model may pass for identity-valued arguments; the
/// dispatcher substitutes the caller's id so the model never needs to know it.
pub const CALLER_SENTINEL: &str = "CURRENT_USER";

/// Replace every top-level string argument equal to [`CALLER_SENTINEL`] with
/// the caller's id. Resolution is shallow and idempotent.
pub fn resolve_sentinel_args(mut args: Value, caller_id: &str) -> Value {
    if let Some(map) = args.as_object_mut() {
        for value in map.values_mut() {
            if value.as_str() == Some(CALLER_SENTINEL) {
                *value = Value::String(caller_id.to_string());
            }
        }
    }
    args
}

pub struct ToolDispatcher {
    catalog: Arc<ToolCatalog>,
    registry: Arc<ModuleRegistry>,
    aliases: AliasTable,
    config: DispatchConfig,
}

impl ToolDispatcher {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        registry: Arc<ModuleRegistry>,
        aliases: AliasTable,
        config: DispatchConfig,
    ) -> Self {
        Self { catalog, registry, aliases, config }
    }

    /// Execute one capability invocation. Lookup order is canonical catalog
    /// names first, then the alias table, then an unknown-tool error.
    pub async fn execute(&self, name: &str, args: Value, caller_id: &str) -> ToolOutcome {
        let invocation_id = Uuid::new_v4();
        let args = resolve_sentinel_args(args, caller_id);

        let (descriptor, args) = if let Some(descriptor) = self.catalog.descriptor(name) {
            (descriptor, args)
        } else {
            let Some((target, rewritten)) = self.aliases.rewrite(name, args) else {
                warn!(
                    event_name = "dispatch.tool.unknown",
                    tool_name = name,
                    correlation_id = %invocation_id,
                    "unknown tool requested"
                );
                return ToolOutcome::unknown_tool(name);
            };
            let Some(descriptor) = self.catalog.descriptor(target) else {
                // An alias pointing outside the catalog is a deployment bug;
                // surface it as unknown rather than guessing.
                warn!(
                    event_name = "dispatch.alias.dangling",
                    alias = name,
                    target,
                    correlation_id = %invocation_id,
                    "alias target is not a registered tool"
                );
                return ToolOutcome::unknown_tool(name);
            };
            (descriptor, rewritten)
        };

        let Some(module) = self.registry.owner_of(descriptor.name) else {
            return ToolOutcome::failure(format!("no module owns tool `{}`", descriptor.name));
        };

        let deadline_secs = self.config.deadline_secs(descriptor.latency);
        let started = Instant::now();
        debug!(
            event_name = "dispatch.tool.start",
            tool_name = descriptor.name,
            module = module.name(),
            caller_id,
            deadline_secs,
            correlation_id = %invocation_id,
            "dispatching tool"
        );

        let call = ToolCall { name: descriptor.name, args: &args, caller_id };
        let raced = tokio::time::timeout(self.config.deadline(descriptor.latency), module.run(call));
        let outcome = match raced.await {
            Ok(Ok(data)) => ToolOutcome::success(data),
            Ok(Err(error)) => ToolOutcome::failure(error.to_string()),
            // The abandoned handler future is dropped; the underlying I/O has
            // no cancellation hook, so the caller gets a timely partial result
            // while any in-flight work runs out on its own.
            Err(_elapsed) => {
                warn!(
                    event_name = "dispatch.tool.timeout",
                    tool_name = descriptor.name,
                    deadline_secs,
                    correlation_id = %invocation_id,
                    "tool exceeded its deadline"
                );
                ToolOutcome::timed_out(deadline_secs)
            }
        };

        info!(
            event_name = "dispatch.tool.end",
            tool_name = descriptor.name,
            duration_ms = started.elapsed().as_millis() as u64,
            success = outcome.is_success(),
            partial = outcome.is_partial(),
            correlation_id = %invocation_id,
            "tool dispatch settled"
        );
        outcome
    }
}
