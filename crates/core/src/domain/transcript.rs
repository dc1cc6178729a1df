use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::deal::DealId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(pub String);

/// One call-transcript search hit returned by the transcript service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptHit {
    pub id: TranscriptId,
    pub deal_id: DealId,
    pub title: String,
    pub snippet: String,
    pub occurred_at: DateTime<Utc>,
}
