use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse intent label used to restrict which capabilities are offered for a
/// given request.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestCategory {
    DealLookup,
    BuyerMatching,
    PipelineAnalytics,
    TranscriptSearch,
    DealActions,
    #[default]
    General,
}

impl RequestCategory {
    pub const ALL: [RequestCategory; 6] = [
        Self::DealLookup,
        Self::BuyerMatching,
        Self::PipelineAnalytics,
        Self::TranscriptSearch,
        Self::DealActions,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DealLookup => "DEAL_LOOKUP",
            Self::BuyerMatching => "BUYER_MATCHING",
            Self::PipelineAnalytics => "PIPELINE_ANALYTICS",
            Self::TranscriptSearch => "TRANSCRIPT_SEARCH",
            Self::DealActions => "DEAL_ACTIONS",
            Self::General => "GENERAL",
        }
    }

    /// Tolerant lookup for classifier output. Unknown labels yield `None` so
    /// the router can fall back instead of guessing.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|category| category.as_str() == normalized)
    }
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected latency/complexity of the chosen capability set. Orthogonal to the
/// dispatcher's execution deadlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseTier {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl ResponseTier {
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "QUICK" => Some(Self::Quick),
            "STANDARD" => Some(Self::Standard),
            "DEEP" => Some(Self::Deep),
            _ => None,
        }
    }
}

/// Caller-supplied UI context. Read-only; every field is optional and the
/// router must not assume any of them is present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
}

/// Classification of one incoming request. Created fresh per request and
/// consumed immediately by the calling layer; never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouterVerdict {
    pub category: RequestCategory,
    pub tier: ResponseTier,
    pub capabilities: BTreeSet<String>,
    pub confidence: f32,
    pub fast_path_used: bool,
}

#[cfg(test)]
mod tests {
    use super::{RequestCategory, ResponseTier};

    #[test]
    fn category_labels_round_trip() {
        for category in RequestCategory::ALL {
            assert_eq!(RequestCategory::parse_label(category.as_str()), Some(category));
        }
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(
            RequestCategory::parse_label("pipeline_analytics"),
            Some(RequestCategory::PipelineAnalytics)
        );
        assert_eq!(RequestCategory::parse_label("made_up_label"), None);
    }

    #[test]
    fn tier_parsing_accepts_classifier_spelling() {
        assert_eq!(ResponseTier::parse_label(" deep "), Some(ResponseTier::Deep));
        assert_eq!(ResponseTier::parse_label("fastest"), None);
    }
}
