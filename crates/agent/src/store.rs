//! Collaborator boundaries for capability modules.
//!
//! The engine never talks to a database or third-party API directly; each
//! capability module is handed one of these traits. The in-memory
//! implementations carry deterministic fixture data for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use dealdesk_core::domain::buyer::{Buyer, BuyerId};
use dealdesk_core::domain::deal::{Deal, DealId, DealStage};
use dealdesk_core::domain::transcript::{TranscriptHit, TranscriptId};
use dealdesk_core::errors::StoreError;

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn get_deal(&self, id: &DealId) -> Result<Deal, StoreError>;
    async fn search_deals(&self, query: &str, limit: usize) -> Result<Vec<Deal>, StoreError>;
    async fn deals_by_stage(&self, stage: DealStage) -> Result<Vec<Deal>, StoreError>;
    async fn all_deals(&self) -> Result<Vec<Deal>, StoreError>;
    async fn get_buyer(&self, id: &BuyerId) -> Result<Buyer, StoreError>;
    async fn search_buyers(&self, query: &str, limit: usize) -> Result<Vec<Buyer>, StoreError>;
    async fn all_buyers(&self) -> Result<Vec<Buyer>, StoreError>;
    async fn update_deal_stage(&self, id: &DealId, stage: DealStage) -> Result<Deal, StoreError>;
    async fn assign_deal_owner(&self, id: &DealId, owner_id: &str) -> Result<Deal, StoreError>;
    async fn create_task(
        &self,
        deal_id: &DealId,
        title: &str,
        assignee_id: &str,
    ) -> Result<String, StoreError>;
    async fn log_outreach(
        &self,
        deal_id: &DealId,
        buyer_id: &BuyerId,
        channel: &str,
        note: &str,
        actor_id: &str,
    ) -> Result<String, StoreError>;
}

/// External call-recording service. Network-bound, hence the network timeout
/// tier on the tools that use it.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        deal_id: Option<&DealId>,
        limit: usize,
    ) -> Result<Vec<TranscriptHit>, StoreError>;
    async fn fetch(&self, id: &TranscriptId) -> Result<TranscriptHit, StoreError>;
}

/// Slow third-party research/enrichment work. Tools depending on this run
/// under the longest dispatch deadline.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn research_buyer(&self, buyer: &Buyer) -> Result<Value, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    deals: BTreeMap<String, Deal>,
    buyers: BTreeMap<String, Buyer>,
    task_sequence: u64,
    outreach_sequence: u64,
}

/// Deterministic in-memory store for tests and local smoke runs.
#[derive(Debug, Default)]
pub struct InMemoryDealStore {
    state: Mutex<StoreState>,
}

impl InMemoryDealStore {
    pub fn new(deals: Vec<Deal>, buyers: Vec<Buyer>) -> Self {
        let state = StoreState {
            deals: deals.into_iter().map(|deal| (deal.id.0.clone(), deal)).collect(),
            buyers: buyers.into_iter().map(|buyer| (buyer.id.0.clone(), buyer)).collect(),
            task_sequence: 0,
            outreach_sequence: 0,
        };
        Self { state: Mutex::new(state) }
    }

    /// A small fixed book of deals and buyers. Values are stable so category
    /// and analytics assertions stay deterministic.
    pub fn with_fixtures() -> Self {
        let updated_at = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let deals = vec![
            Deal {
                id: DealId("D-100".to_string()),
                name: "Harbor Logistics".to_string(),
                stage: DealStage::Diligence,
                owner_id: Some("u-ava".to_string()),
                value_cents: 450_000_000,
                updated_at,
            },
            Deal {
                id: DealId("D-101".to_string()),
                name: "Cobalt Dental Group".to_string(),
                stage: DealStage::Contacted,
                owner_id: None,
                value_cents: 120_000_000,
                updated_at,
            },
            Deal {
                id: DealId("D-102".to_string()),
                name: "Northwind HVAC".to_string(),
                stage: DealStage::Sourced,
                owner_id: None,
                value_cents: 80_000_000,
                updated_at,
            },
            Deal {
                id: DealId("D-103".to_string()),
                name: "Summit Analytics".to_string(),
                stage: DealStage::Loi,
                owner_id: Some("u-ben".to_string()),
                value_cents: 900_000_000,
                updated_at,
            },
        ];
        let buyers = vec![
            Buyer {
                id: BuyerId("B-1".to_string()),
                name: "Granite Peak Capital".to_string(),
                sector: "logistics".to_string(),
                aum_cents: 50_000_000_000,
                active: true,
            },
            Buyer {
                id: BuyerId("B-2".to_string()),
                name: "Bluewater Holdings".to_string(),
                sector: "healthcare".to_string(),
                aum_cents: 20_000_000_000,
                active: true,
            },
            Buyer {
                id: BuyerId("B-3".to_string()),
                name: "Dormant Ventures".to_string(),
                sector: "industrial".to_string(),
                aum_cents: 5_000_000_000,
                active: false,
            },
        ];
        Self::new(deals, buyers)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Query("store lock poisoned".to_string()))
    }
}

fn matches_query(haystack: &str, query: &str) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    let query = query.trim().to_ascii_lowercase();
    query.is_empty() || query.split_whitespace().any(|token| haystack.contains(token))
}

#[async_trait]
impl DealStore for InMemoryDealStore {
    async fn get_deal(&self, id: &DealId) -> Result<Deal, StoreError> {
        self.lock()?
            .deals
            .get(&id.0)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("deal {}", id.0)))
    }

    async fn search_deals(&self, query: &str, limit: usize) -> Result<Vec<Deal>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .deals
            .values()
            .filter(|deal| matches_query(&deal.name, query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn deals_by_stage(&self, stage: DealStage) -> Result<Vec<Deal>, StoreError> {
        let state = self.lock()?;
        Ok(state.deals.values().filter(|deal| deal.stage == stage).cloned().collect())
    }

    async fn all_deals(&self) -> Result<Vec<Deal>, StoreError> {
        Ok(self.lock()?.deals.values().cloned().collect())
    }

    async fn get_buyer(&self, id: &BuyerId) -> Result<Buyer, StoreError> {
        self.lock()?
            .buyers
            .get(&id.0)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("buyer {}", id.0)))
    }

    async fn search_buyers(&self, query: &str, limit: usize) -> Result<Vec<Buyer>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .buyers
            .values()
            .filter(|buyer| {
                matches_query(&buyer.name, query) || matches_query(&buyer.sector, query)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_buyers(&self) -> Result<Vec<Buyer>, StoreError> {
        Ok(self.lock()?.buyers.values().cloned().collect())
    }

    async fn update_deal_stage(&self, id: &DealId, stage: DealStage) -> Result<Deal, StoreError> {
        let mut state = self.lock()?;
        let deal = state
            .deals
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(format!("deal {}", id.0)))?;
        deal.stage = stage;
        deal.updated_at = Utc::now();
        Ok(deal.clone())
    }

    async fn assign_deal_owner(&self, id: &DealId, owner_id: &str) -> Result<Deal, StoreError> {
        let mut state = self.lock()?;
        let deal = state
            .deals
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(format!("deal {}", id.0)))?;
        deal.owner_id = Some(owner_id.to_string());
        deal.updated_at = Utc::now();
        Ok(deal.clone())
    }

    async fn create_task(
        &self,
        deal_id: &DealId,
        _title: &str,
        _assignee_id: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        if !state.deals.contains_key(&deal_id.0) {
            return Err(StoreError::NotFound(format!("deal {}", deal_id.0)));
        }
        state.task_sequence += 1;
        Ok(format!("task-{}", state.task_sequence))
    }

    async fn log_outreach(
        &self,
        deal_id: &DealId,
        buyer_id: &BuyerId,
        _channel: &str,
        _note: &str,
        _actor_id: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        if !state.deals.contains_key(&deal_id.0) {
            return Err(StoreError::NotFound(format!("deal {}", deal_id.0)));
        }
        if !state.buyers.contains_key(&buyer_id.0) {
            return Err(StoreError::NotFound(format!("buyer {}", buyer_id.0)));
        }
        state.outreach_sequence += 1;
        Ok(format!("outreach-{}", state.outreach_sequence))
    }
}

/// Fixture-backed transcript service.
#[derive(Debug, Default)]
pub struct InMemoryTranscriptService {
    hits: Vec<TranscriptHit>,
}

impl InMemoryTranscriptService {
    pub fn new(hits: Vec<TranscriptHit>) -> Self {
        Self { hits }
    }

    pub fn with_fixtures() -> Self {
        let occurred_at = Utc.with_ymd_and_hms(2026, 7, 18, 15, 30, 0).unwrap();
        Self::new(vec![
            TranscriptHit {
                id: TranscriptId("T-1".to_string()),
                deal_id: DealId("D-100".to_string()),
                title: "Harbor Logistics - management call".to_string(),
                snippet: "discussed fleet utilization and driver retention".to_string(),
                occurred_at,
            },
            TranscriptHit {
                id: TranscriptId("T-2".to_string()),
                deal_id: DealId("D-103".to_string()),
                title: "Summit Analytics - LOI walkthrough".to_string(),
                snippet: "earnout structure and retention pool questions".to_string(),
                occurred_at,
            },
        ])
    }
}

#[async_trait]
impl TranscriptService for InMemoryTranscriptService {
    async fn search(
        &self,
        query: &str,
        deal_id: Option<&DealId>,
        limit: usize,
    ) -> Result<Vec<TranscriptHit>, StoreError> {
        Ok(self
            .hits
            .iter()
            .filter(|hit| deal_id.map_or(true, |id| &hit.deal_id == id))
            .filter(|hit| {
                matches_query(&hit.title, query) || matches_query(&hit.snippet, query)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch(&self, id: &TranscriptId) -> Result<TranscriptHit, StoreError> {
        self.hits
            .iter()
            .find(|hit| &hit.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transcript {}", id.0)))
    }
}

/// Canned research profile; stands in for the slow third-party enrichment
/// provider in tests.
#[derive(Debug, Default)]
pub struct StaticEnrichmentService;

#[async_trait]
impl EnrichmentService for StaticEnrichmentService {
    async fn research_buyer(&self, buyer: &Buyer) -> Result<Value, StoreError> {
        Ok(json!({
            "buyer_id": buyer.id.0,
            "summary": format!("{} is an {} acquirer in {}", buyer.name,
                if buyer.active { "active" } else { "inactive" }, buyer.sector),
            "signals": ["platform_fit", "dry_powder"],
        }))
    }
}
