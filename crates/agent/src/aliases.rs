//! Legacy Alias Table
//!
//! Retired tool names keep working after renames and merges: an alias entry
//! rewrites the old invocation into its replacement tool and argument shape.
//! The dispatcher consults this table only after the catalog lookup fails, so
//! canonical names always win and a rename can never be shadowed by a stale
//! alias.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

/// Pure rewrite from a retired invocation to its canonical replacement.
type AliasRewriteFn = fn(Value) -> (&'static str, Value);

#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    entries: BTreeMap<&'static str, AliasRewriteFn>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Aliases currently carried for compatibility with previously issued or
    /// cached tool names.
    pub fn standard() -> Self {
        let mut entries: BTreeMap<&'static str, AliasRewriteFn> = BTreeMap::new();
        // Transcript search used to go through the Fireflies integration
        // directly; the module absorbed it and renamed `keyword` to `query`.
        entries.insert("search_fireflies", |args| {
            ("search_transcripts", retag(args, "keyword", "query"))
        });
        // Buyer profiles were once served by a company-info tool keyed on
        // `company_id`.
        entries.insert("get_company_info", |args| {
            ("get_buyer", retag(args, "company_id", "buyer_id"))
        });
        // The stage report merged into the pipeline rollup unchanged.
        entries.insert("deal_stage_report", |args| ("pipeline_summary", args));
        Self { entries }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Rewrite a retired invocation. Returns the canonical tool name and the
    /// re-tagged argument bag, or `None` when the name is not an alias.
    pub fn rewrite(&self, name: &str, args: Value) -> Option<(&'static str, Value)> {
        let rewrite = self.entries.get(name)?;
        let (target, rewritten) = rewrite(args);
        debug!(
            event_name = "dispatch.alias.rewrite",
            alias = name,
            target,
            "rewrote retired tool name"
        );
        Some((target, rewritten))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// Move `from` to `to` in a top-level argument map. An existing `to` value is
/// kept so explicitly provided canonical arguments are never clobbered.
fn retag(mut args: Value, from: &str, to: &str) -> Value {
    if let Some(map) = args.as_object_mut() {
        if let Some(value) = map.remove(from) {
            map.entry(to.to_string()).or_insert(value);
        }
    }
    args
}
