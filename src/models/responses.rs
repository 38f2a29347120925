use serde::{Deserialize, Serialize};
use crate::models::domain::{MatchRecord, SkillListing, UserId};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Response for the add skill endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSkillResponse {
    pub skill: SkillListing,
    #[serde(rename = "matchesCreated")]
    pub matches_created: usize,
}

/// A user's skill listings split by direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub offers: Vec<SkillListing>,
    pub wants: Vec<SkillListing>,
}

/// Matches involving a user, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub matches: Vec<MatchRecord>,
    pub total_results: usize,
}

/// Outcome of a matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeResponse {
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "candidatesScanned")]
    pub candidates_scanned: usize,
    #[serde(rename = "matchesCreated")]
    pub matches_created: usize,
    #[serde(rename = "existingPairs")]
    pub existing_pairs: usize,
}
