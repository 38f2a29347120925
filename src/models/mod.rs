// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    InvalidDirection, MatchRecord, MatchingSnapshot, NewMatchRecord, NewSkillListing, NewUser, SkillDirection,
    SkillListing, SkillProfile, User, UserId, UserPair, DEFAULT_MATCH_STATUS,
};
pub use requests::{AddSkillRequest, CreateUserRequest, DeleteSkillQuery, ListMatchesQuery, RecomputeRequest};
pub use responses::{
    AddSkillResponse, ErrorResponse, HealthResponse, MatchesResponse, RecomputeResponse, SkillsResponse,
};
