use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::UserId;

/// Request to register a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 80))]
    pub username: String,
    #[validate(email, length(max = 120))]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Request to add a skill listing
///
/// `skillType` stays a raw string so an unknown direction is reported as a
/// validation failure instead of a JSON payload error.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddSkillRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100))]
    #[serde(alias = "skill_name", rename = "skillName")]
    pub skill_name: String,
    #[serde(alias = "skill_type", rename = "skillType")]
    pub skill_type: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub proficiency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Owner identity for a skill deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSkillQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
}

/// Query parameters for listing a user's matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMatchesQuery {
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Request to re-run matching for a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecomputeRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
}
