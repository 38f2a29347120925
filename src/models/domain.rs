use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Numeric identity of a registered user
pub type UserId = i64;

/// Status assigned to every freshly computed match
pub const DEFAULT_MATCH_STATUS: &str = "pending";

/// Registered user, the population the matcher iterates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// User registration payload as handed to a store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
}

/// Whether a listing is something the user teaches or wants to learn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillDirection {
    Offer,
    Want,
}

impl SkillDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillDirection::Offer => "offer",
            SkillDirection::Want => "want",
        }
    }
}

impl fmt::Display for SkillDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a direction string is neither `offer` nor `want`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid skill direction: {0:?} (expected \"offer\" or \"want\")")]
pub struct InvalidDirection(pub String);

impl FromStr for SkillDirection {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SkillDirection::Offer),
            "want" => Ok(SkillDirection::Want),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

/// A skill a user offers or wants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillListing {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "skillName")]
    pub skill_name: String,
    pub direction: SkillDirection,
    #[serde(default)]
    pub proficiency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Listing payload before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewSkillListing {
    pub user_id: UserId,
    pub skill_name: String,
    pub direction: SkillDirection,
    pub proficiency: Option<String>,
    pub description: Option<String>,
}

/// Unordered pair of users, stored smaller id first
///
/// `UserPair::new(a, b) == UserPair::new(b, a)` so a single equality check
/// answers "does a match already exist between these two users".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserPair {
    low: UserId,
    high: UserId,
}

impl UserPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.low == user_id || self.high == user_id
    }
}

/// Persisted compatibility result between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    #[serde(rename = "user1Id")]
    pub user1_id: UserId,
    #[serde(rename = "user2Id")]
    pub user2_id: UserId,
    #[serde(rename = "user1Offers")]
    pub user1_offers: String,
    #[serde(rename = "user1Wants")]
    pub user1_wants: String,
    #[serde(rename = "user2Offers")]
    pub user2_offers: String,
    #[serde(rename = "user2Wants")]
    pub user2_wants: String,
    #[serde(rename = "matchPercentage")]
    pub match_percentage: f64,
    #[serde(rename = "isDoubleSwap")]
    pub is_double_swap: bool,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    pub fn pair(&self) -> UserPair {
        UserPair::new(self.user1_id, self.user2_id)
    }
}

/// Match payload produced by the matcher, before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatchRecord {
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub user1_offers: String,
    pub user1_wants: String,
    pub user2_offers: String,
    pub user2_wants: String,
    pub match_percentage: f64,
    pub is_double_swap: bool,
}

impl NewMatchRecord {
    pub fn pair(&self) -> UserPair {
        UserPair::new(self.user1_id, self.user2_id)
    }
}

/// Both skill lists of one user, in listing order
#[derive(Debug, Clone, Default)]
pub struct SkillProfile {
    pub user_id: UserId,
    pub offers: Vec<SkillListing>,
    pub wants: Vec<SkillListing>,
}

impl SkillProfile {
    pub fn offer_names(&self) -> Vec<&str> {
        self.offers.iter().map(|s| s.skill_name.as_str()).collect()
    }

    pub fn want_names(&self) -> Vec<&str> {
        self.wants.iter().map(|s| s.skill_name.as_str()).collect()
    }
}

/// The triggering user and every other user, read at one point in time
#[derive(Debug, Clone, Default)]
pub struct MatchingSnapshot {
    pub me: SkillProfile,
    pub others: Vec<SkillProfile>,
}

impl MatchingSnapshot {
    /// Group listings by owner into profiles
    ///
    /// `skills` must come in creation order. Users without listings get empty
    /// profiles; listings of unknown users are dropped. Returns `None` when
    /// `user_id` is not among `users`.
    pub fn assemble<I>(user_id: UserId, users: &[UserId], skills: I) -> Option<Self>
    where
        I: IntoIterator<Item = SkillListing>,
    {
        let mut profiles: BTreeMap<UserId, SkillProfile> = users
            .iter()
            .map(|&id| {
                (
                    id,
                    SkillProfile {
                        user_id: id,
                        ..SkillProfile::default()
                    },
                )
            })
            .collect();

        for skill in skills {
            if let Some(profile) = profiles.get_mut(&skill.user_id) {
                match skill.direction {
                    SkillDirection::Offer => profile.offers.push(skill),
                    SkillDirection::Want => profile.wants.push(skill),
                }
            }
        }

        let me = profiles.remove(&user_id)?;
        Some(Self {
            me,
            others: profiles.into_values().collect(),
        })
    }
}
