//! End-to-end contract tests over the assembled engine: router verdicts feed
//! the dispatcher, and every dispatch settles to the uniform outcome envelope.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use dealdesk_agent::capabilities::{ToolCall, ToolModule};
use dealdesk_agent::{
    standard_toolkit, AliasTable, IntentRouter, LlmClient, LlmError, ToolDispatcher, Toolkit,
    CALLER_SENTINEL,
};
use dealdesk_core::catalog::{LatencyClass, ToolCatalog, ToolDescriptor};
use dealdesk_core::config::{DispatchConfig, RouterConfig};
use dealdesk_core::errors::ToolError;
use dealdesk_core::intent::RequestCategory;
use dealdesk_core::outcome::ToolOutcome;

use dealdesk_agent::{InMemoryDealStore, InMemoryTranscriptService, StaticEnrichmentService};

fn toolkit() -> Toolkit {
    standard_toolkit(
        Arc::new(InMemoryDealStore::with_fixtures()),
        Arc::new(InMemoryTranscriptService::with_fixtures()),
        Arc::new(StaticEnrichmentService),
    )
    .expect("standard toolkit must assemble")
}

fn dispatch_config() -> DispatchConfig {
    DispatchConfig {
        standard_timeout_secs: 10,
        network_timeout_secs: 30,
        enrichment_timeout_secs: 120,
    }
}

fn dispatcher(toolkit: &Toolkit) -> ToolDispatcher {
    ToolDispatcher::new(
        Arc::clone(&toolkit.catalog),
        Arc::clone(&toolkit.registry),
        AliasTable::standard(),
        dispatch_config(),
    )
}

#[tokio::test]
async fn successful_dispatch_returns_data_without_error_fields() -> anyhow::Result<()> {
    let toolkit = toolkit();
    let outcome = dispatcher(&toolkit)
        .execute("get_deal", json!({"deal_id": "D-100"}), "u-ava")
        .await;

    assert!(outcome.is_success());
    assert!(outcome.error.is_none());
    assert!(outcome.partial.is_none());
    let data = outcome.data.context("success carries data")?;
    assert_eq!(data["deal"]["name"], "Harbor Logistics");
    Ok(())
}

#[tokio::test]
async fn unknown_tool_yields_the_exact_error_envelope() {
    let toolkit = toolkit();
    let outcome = dispatcher(&toolkit).execute("summon_unicorn", json!({}), "u-ava").await;

    assert!(!outcome.is_success());
    assert!(!outcome.is_partial());
    assert_eq!(outcome.error.as_deref(), Some("Unknown tool: summon_unicorn"));
    assert!(outcome.data.is_none());
}

#[tokio::test]
async fn handler_failure_is_enveloped_not_raised() {
    let toolkit = toolkit();
    let outcome = dispatcher(&toolkit)
        .execute("get_deal", json!({"deal_id": "D-404"}), "u-ava")
        .await;

    assert!(!outcome.is_success());
    assert!(!outcome.is_partial());
    assert!(outcome.error.expect("failure carries error").contains("not found"));
}

#[tokio::test]
async fn alias_dispatch_is_indistinguishable_from_canonical_dispatch() {
    let toolkit = toolkit();
    let dispatcher = dispatcher(&toolkit);

    let via_alias = dispatcher
        .execute("search_fireflies", json!({"keyword": "earnout"}), "u-ava")
        .await;
    let via_canonical = dispatcher
        .execute("search_transcripts", json!({"query": "earnout"}), "u-ava")
        .await;

    assert!(via_alias.is_success());
    assert_eq!(via_alias.data, via_canonical.data);
}

#[tokio::test]
async fn merged_stage_report_alias_reaches_the_pipeline_rollup() {
    let toolkit = toolkit();
    let outcome = dispatcher(&toolkit).execute("deal_stage_report", json!({}), "u-ava").await;

    let data = outcome.data.expect("rollup succeeds");
    assert_eq!(data["total_deals"], 4);
    assert_eq!(data["open_value_cents"], 1_550_000_000_i64);
}

#[tokio::test]
async fn caller_sentinel_resolves_before_the_handler_runs() {
    let toolkit = toolkit();
    let outcome = dispatcher(&toolkit)
        .execute(
            "assign_deal_owner",
            json!({"deal_id": "D-102", "owner_id": CALLER_SENTINEL}),
            "u-ben",
        )
        .await;

    let data = outcome.data.expect("assignment succeeds");
    assert_eq!(data["deal"]["owner_id"], "u-ben");
}

#[tokio::test]
async fn confirmation_is_a_caller_side_gate_not_a_dispatcher_one() {
    let toolkit = toolkit();
    // The calling layer checks this set before dispatching; the dispatcher
    // itself runs whatever it is handed.
    assert!(toolkit.confirmation.requires_confirmation("update_deal_stage"));

    let outcome = dispatcher(&toolkit)
        .execute("update_deal_stage", json!({"deal_id": "D-102", "stage": "contacted"}), "u-ava")
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn router_verdict_capabilities_are_all_dispatchable() {
    let toolkit = toolkit();
    let router = IntentRouter::new(
        Arc::clone(&toolkit.catalog),
        Arc::new(RefusingLlm),
        RouterConfig { classifier_timeout_ms: 2_500, fallback_confidence: 0.3 },
    );

    let verdict = router.classify("pipeline summary", None).await;
    assert!(verdict.fast_path_used);
    for name in &verdict.capabilities {
        assert!(toolkit.catalog.contains(name), "verdict offered unregistered tool {name}");
    }

    let outcome = dispatcher(&toolkit).execute("pipeline_summary", json!({}), "u-ava").await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn degraded_router_still_leads_to_a_working_tool() {
    let toolkit = toolkit();
    let router = IntentRouter::new(
        Arc::clone(&toolkit.catalog),
        Arc::new(RefusingLlm),
        RouterConfig { classifier_timeout_ms: 2_500, fallback_confidence: 0.3 },
    );

    let verdict = router.classify("what can you even do", None).await;
    assert_eq!(verdict.category, RequestCategory::General);
    assert!(verdict.capabilities.contains("list_capabilities"));

    let outcome = dispatcher(&toolkit).execute("list_capabilities", json!({}), "u-ava").await;
    let data = outcome.data.expect("introspection succeeds");
    assert!(data["total"].as_u64().unwrap() >= 13);
}

struct RefusingLlm;

#[async_trait]
impl LlmClient for RefusingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Transport("offline".to_string()))
    }
}

// Timeout law. The in-memory modules settle instantly, so the deadline tests
// run against a deliberately stalled module under a paused clock.

struct StalledModule;

#[async_trait]
impl ToolModule for StalledModule {
    fn name(&self) -> &'static str {
        "stalled"
    }

    fn tool_names(&self) -> &'static [&'static str] {
        &["stall_standard", "stall_enrichment"]
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("stall_standard", "Never settles", json!({"type": "object"})),
            ToolDescriptor::new("stall_enrichment", "Never settles", json!({"type": "object"}))
                .with_latency(LatencyClass::Enrichment),
        ]
    }

    async fn run(&self, _call: ToolCall<'_>) -> Result<Value, ToolError> {
        std::future::pending().await
    }
}

fn stalled_dispatcher() -> ToolDispatcher {
    let registry =
        dealdesk_agent::ModuleRegistry::new(vec![Arc::new(StalledModule) as Arc<dyn ToolModule>]);
    let catalog = ToolCatalog::new(registry.descriptors(), vec![])
        .expect("stalled catalog must assemble");
    ToolDispatcher::new(
        Arc::new(catalog),
        Arc::new(registry),
        AliasTable::empty(),
        dispatch_config(),
    )
}

#[tokio::test(start_paused = true)]
async fn standard_tier_times_out_with_the_exact_message() {
    let outcome = stalled_dispatcher().execute("stall_standard", json!({}), "u-ava").await;

    assert_eq!(outcome.error.as_deref(), Some("Tool timeout (10s)"));
    assert_eq!(outcome.partial, Some(true));
    assert!(outcome.data.is_none());
}

#[tokio::test(start_paused = true)]
async fn enrichment_tier_gets_the_long_deadline() {
    let outcome = stalled_dispatcher().execute("stall_enrichment", json!({}), "u-ava").await;

    assert_eq!(outcome.error.as_deref(), Some("Tool timeout (120s)"));
    assert!(outcome.is_partial());
}

#[tokio::test]
async fn concurrent_dispatches_do_not_interfere() {
    let toolkit = toolkit();
    let dispatcher = Arc::new(dispatcher(&toolkit));

    let calls = vec![
        ("get_deal", json!({"deal_id": "D-100"})),
        ("pipeline_summary", json!({})),
        ("search_buyers", json!({"query": "capital"})),
        ("list_capabilities", json!({})),
    ];
    let handles: Vec<_> = calls
        .into_iter()
        .map(|(name, args)| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.execute(name, args, "u-ava").await })
        })
        .collect();

    for handle in handles {
        let outcome: ToolOutcome = handle.await.expect("task completes");
        assert!(outcome.is_success());
    }
}
