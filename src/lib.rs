//! Swapp Match - skill-exchange matching service
//!
//! Users list skills they offer and skills they want. Whenever a user adds an
//! offered skill, the matcher scores them against every other user and stores
//! one match record per compatible pair.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_pair_score, MatchResult, Matcher, PairScore, Store, StoreError};
pub use crate::models::{MatchRecord, SkillDirection, SkillListing, SkillProfile, UserId, UserPair};
