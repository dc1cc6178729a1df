//! Tool Orchestration Engine - intent routing and bounded tool execution
//!
//! This crate is the control plane between a conversational LLM agent and the
//! deal-management capabilities it may invoke:
//! 1. **Intent Routing** (`router`) - classify NL requests into a category and
//!    a bounded capability set, via deterministic bypass rules or an
//!    LLM-backed fallback classifier
//! 2. **Dispatch** (`dispatcher`) - run a named capability under a per-tier
//!    deadline and return a uniform result envelope, never an error
//! 3. **Compatibility** (`aliases`) - keep retired tool names working after
//!    renames and merges
//! 4. **Capability Modules** (`capabilities`) - thin data-access handlers over
//!    the store/transcript/enrichment collaborator traits
//!
//! # Safety Principle
//!
//! The LLM only selects capabilities. Mutations are gated behind the
//! confirmation set, which the calling layer consults before dispatch; the
//! dispatcher itself never executes an unconfirmed mutating tool because the
//! caller never hands one to it.

pub mod aliases;
pub mod capabilities;
pub mod dispatcher;
pub mod llm;
pub mod router;
pub mod store;

pub use aliases::AliasTable;
pub use capabilities::{standard_toolkit, ModuleRegistry, ToolCall, ToolModule, Toolkit};
pub use dispatcher::{resolve_sentinel_args, ToolDispatcher, CALLER_SENTINEL};
pub use llm::{HttpLlmClient, LlmClient, LlmError};
pub use router::{BypassRule, IntentRouter};
pub use store::{
    DealStore, EnrichmentService, InMemoryDealStore, InMemoryTranscriptService,
    StaticEnrichmentService, TranscriptService,
};
