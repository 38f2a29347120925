// Core algorithm exports
pub mod matcher;
pub mod repository;
pub mod scoring;
pub mod snapshot;

pub use matcher::{load_profile, CandidateMatch, MatchResult, Matcher};
pub use repository::{MatchRepository, SkillRepository, Store, StoreError, UserRepository};
pub use scoring::{calculate_pair_score, skill_names_match, PairScore};
pub use snapshot::{SkillSnapshot, DEFAULT_SNAPSHOT_SIZE};
