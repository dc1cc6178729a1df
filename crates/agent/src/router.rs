//! Intent Router
//!
//! Classifies each incoming request into a category, a response tier, and the
//! capability set the model is offered for that turn. Cheap deterministic
//! bypass rules run first; only when none match does the router spend an LLM
//! call on classification. Classification is advisory and the router never
//! fails: any classifier problem degrades to a safe general verdict.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use dealdesk_core::catalog::ToolCatalog;
use dealdesk_core::config::RouterConfig;
use dealdesk_core::intent::{PageContext, RequestCategory, ResponseTier, RouterVerdict};

use crate::capabilities::meta::LIST_CAPABILITIES;
use crate::llm::LlmClient;

/// One deterministic fast-path rule. `matches` sees the lowercased query and
/// whatever UI context the caller sent; rules that need context return false
/// when it is absent.
pub struct BypassRule {
    pub name: &'static str,
    pub matches: fn(&str, Option<&PageContext>) -> bool,
    pub category: RequestCategory,
    pub tier: ResponseTier,
    pub confidence: f32,
    pub extra_capabilities: &'static [&'static str],
}

/// The production rule set, in priority order. The first match wins, so more
/// specific rules sit above broader keyword rules.
pub fn standard_rules() -> Vec<BypassRule> {
    fn on_page(context: Option<&PageContext>, page: &str) -> bool {
        context.and_then(|ctx| ctx.page.as_deref()) == Some(page)
    }
    fn on_tab(context: Option<&PageContext>, tab: &str) -> bool {
        context.and_then(|ctx| ctx.tab.as_deref()) == Some(tab)
    }
    fn has_entity_id(context: Option<&PageContext>) -> bool {
        context.and_then(|ctx| ctx.entity_id.as_deref()).is_some()
    }

    vec![
        BypassRule {
            name: "pipeline_rollup_keywords",
            matches: |query, _| {
                query.contains("pipeline")
                    && ["summary", "overview", "report"].iter().any(|word| query.contains(word))
            },
            category: RequestCategory::PipelineAnalytics,
            tier: ResponseTier::Quick,
            confidence: 0.9,
            extra_capabilities: &[],
        },
        BypassRule {
            name: "deal_page_transcripts_tab",
            matches: |_, context| on_page(context, "deal") && on_tab(context, "transcripts"),
            category: RequestCategory::TranscriptSearch,
            tier: ResponseTier::Quick,
            confidence: 0.85,
            extra_capabilities: &["get_deal"],
        },
        BypassRule {
            name: "deal_page_with_entity",
            matches: |_, context| on_page(context, "deal") && has_entity_id(context),
            category: RequestCategory::DealLookup,
            tier: ResponseTier::Quick,
            confidence: 0.85,
            extra_capabilities: &[],
        },
        BypassRule {
            name: "buyers_page",
            matches: |_, context| on_page(context, "buyers") || on_tab(context, "buyers"),
            category: RequestCategory::BuyerMatching,
            tier: ResponseTier::Quick,
            confidence: 0.85,
            extra_capabilities: &[],
        },
        BypassRule {
            name: "transcript_keywords",
            matches: |query, _| {
                ["transcript", "call notes", "meeting notes", "fireflies"]
                    .iter()
                    .any(|word| query.contains(word))
            },
            category: RequestCategory::TranscriptSearch,
            tier: ResponseTier::Standard,
            confidence: 0.8,
            extra_capabilities: &[],
        },
        BypassRule {
            name: "action_verbs",
            matches: |query, _| {
                ["move ", "assign ", "mark ", "create a task", "log outreach"]
                    .iter()
                    .any(|verb| query.starts_with(verb))
            },
            category: RequestCategory::DealActions,
            tier: ResponseTier::Standard,
            confidence: 0.8,
            extra_capabilities: &[],
        },
    ]
}

pub struct IntentRouter {
    catalog: Arc<ToolCatalog>,
    llm: Arc<dyn LlmClient>,
    config: RouterConfig,
    rules: Vec<BypassRule>,
}

impl IntentRouter {
    pub fn new(catalog: Arc<ToolCatalog>, llm: Arc<dyn LlmClient>, config: RouterConfig) -> Self {
        Self { catalog, llm, config, rules: standard_rules() }
    }

    pub fn with_rules(mut self, rules: Vec<BypassRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Classify one request. Infallible: every path settles to a verdict, and
    /// the worst case is the general fallback with the introspection tool.
    pub async fn classify(&self, query: &str, context: Option<&PageContext>) -> RouterVerdict {
        let lowered = query.to_lowercase();

        for rule in &self.rules {
            if (rule.matches)(&lowered, context) {
                let extras: Vec<String> =
                    rule.extra_capabilities.iter().map(|name| name.to_string()).collect();
                let verdict = RouterVerdict {
                    category: rule.category,
                    tier: rule.tier,
                    capabilities: self.catalog.resolve_capabilities(rule.category, &extras),
                    confidence: rule.confidence,
                    fast_path_used: true,
                };
                info!(
                    event_name = "router.bypass.hit",
                    rule = rule.name,
                    category = %verdict.category,
                    "fast path classified request"
                );
                return verdict;
            }
        }

        match self.classify_with_llm(query).await {
            Ok(verdict) => verdict,
            Err(reason) => {
                warn!(
                    event_name = "router.fallback",
                    reason,
                    "classifier degraded, using general verdict"
                );
                self.fallback_verdict()
            }
        }
    }

    fn fallback_verdict(&self) -> RouterVerdict {
        RouterVerdict {
            category: RequestCategory::General,
            tier: ResponseTier::Quick,
            capabilities: self
                .catalog
                .resolve_capabilities(RequestCategory::General, &[LIST_CAPABILITIES.to_string()]),
            confidence: self.config.fallback_confidence,
            fast_path_used: false,
        }
    }

    async fn classify_with_llm(&self, query: &str) -> Result<RouterVerdict, &'static str> {
        let prompt = classifier_prompt(query);
        let deadline = Duration::from_millis(self.config.classifier_timeout_ms);

        let reply = match tokio::time::timeout(deadline, self.llm.complete(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => {
                debug!(event_name = "router.classifier.error", error = %error);
                return Err("completion failed");
            }
            Err(_elapsed) => return Err("classifier timed out"),
        };

        let parsed = extract_json_object(&reply).ok_or("no json object in completion")?;
        let category = parsed["category"]
            .as_str()
            .and_then(RequestCategory::parse_label)
            .ok_or("unusable category label")?;
        let tier = parsed["tier"]
            .as_str()
            .and_then(ResponseTier::parse_label)
            .unwrap_or_default();
        let extras: Vec<String> = parsed["tools"]
            .as_array()
            .map(|tools| {
                tools.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default();
        let confidence = parsed["confidence"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0) as f32;

        Ok(RouterVerdict {
            category,
            tier,
            capabilities: self.catalog.resolve_capabilities(category, &extras),
            confidence,
            fast_path_used: false,
        })
    }
}

fn classifier_prompt(query: &str) -> String {
    let labels: Vec<&str> = RequestCategory::ALL.iter().map(RequestCategory::as_str).collect();
    format!(
        "Classify this deal-desk request. Respond with one JSON object only:\n\
         {{\"category\": one of {labels:?}, \"tier\": \"QUICK\"|\"STANDARD\"|\"DEEP\", \
         \"tools\": [tool names], \"confidence\": 0.0-1.0}}\n\nRequest: {query}"
    )
}

/// Pull the first balanced JSON object out of a completion that may wrap it in
/// prose or code fences. Tracks string and escape state so braces inside
/// string values do not unbalance the scan; if a balanced span fails to parse,
/// the scan resumes at the next opening brace.
fn extract_json_object(reply: &str) -> Option<Value> {
    let bytes = reply.as_bytes();
    let mut start = 0;
    while let Some(offset) = reply[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (index, &byte) in bytes.iter().enumerate().skip(open) {
            if escaped {
                escaped = false;
                continue;
            }
            match byte {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        if let Ok(value) = serde_json::from_str(&reply[open..=index]) {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
        start = open + 1;
    }
    None
}
