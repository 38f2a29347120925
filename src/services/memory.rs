use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::core::repository::{MatchRepository, SkillRepository, StoreError, UserRepository};
use crate::models::{
    MatchRecord, MatchingSnapshot, NewMatchRecord, NewSkillListing, NewUser, SkillDirection, SkillListing, User,
    UserId, UserPair, DEFAULT_MATCH_STATUS,
};

/// Process-local store for development and tests
///
/// All state sits behind one lock, so the pair check and the insert in
/// [`MatchRepository::insert`] happen under the same write guard.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    skills: BTreeMap<i64, SkillListing>,
    matches: BTreeMap<i64, MatchRecord>,
    pairs: HashMap<UserPair, i64>,
    next_user_id: i64,
    next_skill_id: i64,
    next_match_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SkillRepository for InMemoryStore {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.users.contains_key(&user_id))
    }

    async fn list_skills(
        &self,
        user_id: UserId,
        direction: SkillDirection,
    ) -> Result<Vec<SkillListing>, StoreError> {
        let inner = self.inner.read().await;
        // Ids grow monotonically, so map order is creation order
        Ok(inner
            .skills
            .values()
            .filter(|s| s.user_id == user_id && s.direction == direction)
            .cloned()
            .collect())
    }

    async fn list_all_users(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.keys().copied().filter(|id| *id != excluding).collect())
    }

    async fn load_snapshot(&self, user_id: UserId) -> Result<Option<MatchingSnapshot>, StoreError> {
        let inner = self.inner.read().await;
        let users: Vec<UserId> = inner.users.keys().copied().collect();

        Ok(MatchingSnapshot::assemble(
            user_id,
            &users,
            inner.skills.values().cloned(),
        ))
    }

    async fn insert_skill(&self, skill: NewSkillListing) -> Result<SkillListing, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&skill.user_id) {
            return Err(StoreError::NotFound(format!("user {}", skill.user_id)));
        }

        let listing = SkillListing {
            id: next_id(&mut inner.next_skill_id),
            user_id: skill.user_id,
            skill_name: skill.skill_name,
            direction: skill.direction,
            proficiency: skill.proficiency,
            description: skill.description,
            created_at: Utc::now(),
        };
        inner.skills.insert(listing.id, listing.clone());

        Ok(listing)
    }

    async fn delete_skill(&self, skill_id: i64, owner: UserId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let skill_owner = inner.skills.get(&skill_id).map(|s| s.user_id);
        match skill_owner {
            None => Ok(false),
            Some(found) if found != owner => Err(StoreError::Conflict(format!(
                "skill {} is not owned by user {}",
                skill_id, owner
            ))),
            Some(_) => {
                inner.skills.remove(&skill_id);
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn find_by_unordered_pair(
        &self,
        pair: UserPair,
    ) -> Result<Option<MatchRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .pairs
            .get(&pair)
            .and_then(|id| inner.matches.get(id))
            .cloned())
    }

    async fn insert(&self, record: NewMatchRecord) -> Result<Option<MatchRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        let pair = record.pair();
        if inner.pairs.contains_key(&pair) {
            return Ok(None);
        }

        let stored = MatchRecord {
            id: next_id(&mut inner.next_match_id),
            user1_id: record.user1_id,
            user2_id: record.user2_id,
            user1_offers: record.user1_offers,
            user1_wants: record.user1_wants,
            user2_offers: record.user2_offers,
            user2_wants: record.user2_wants,
            match_percentage: record.match_percentage,
            is_double_swap: record.is_double_swap,
            status: DEFAULT_MATCH_STATUS.to_string(),
            created_at: Utc::now(),
        };
        inner.pairs.insert(pair, stored.id);
        inner.matches.insert(stored.id, stored.clone());

        Ok(Some(stored))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut records: Vec<MatchRecord> = inner
            .matches
            .values()
            .filter(|m| m.pair().contains(user_id))
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            b.match_percentage
                .partial_cmp(&a.match_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        records.truncate(limit);

        Ok(records)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let taken = inner
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StoreError::Conflict(format!(
                "username {} or email {} already registered",
                user.username, user.email
            )));
        }

        let created = User {
            id: next_id(&mut inner.next_user_id),
            username: user.username,
            email: user.email,
            bio: user.bio,
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
