use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DealId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Sourced,
    Contacted,
    Diligence,
    Loi,
    Closed,
    Lost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        Self::Sourced,
        Self::Contacted,
        Self::Diligence,
        Self::Loi,
        Self::Closed,
        Self::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sourced => "sourced",
            Self::Contacted => "contacted",
            Self::Diligence => "diligence",
            Self::Loi => "loi",
            Self::Closed => "closed",
            Self::Lost => "lost",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|stage| stage.as_str() == normalized)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    pub stage: DealStage,
    pub owner_id: Option<String>,
    pub value_cents: i64,
    pub updated_at: DateTime<Utc>,
}
