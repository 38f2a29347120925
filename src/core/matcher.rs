use crate::core::{
    repository::{MatchRepository, SkillRepository, StoreError},
    scoring::{calculate_pair_score, PairScore},
    snapshot::{SkillSnapshot, DEFAULT_SNAPSHOT_SIZE},
};
use crate::models::{MatchRecord, NewMatchRecord, SkillDirection, SkillProfile, UserId, UserPair};

/// Result of one matching run
#[derive(Debug, Default)]
pub struct MatchResult {
    pub created: Vec<MatchRecord>,
    pub candidates_scanned: usize,
    pub existing_pairs: usize,
}

/// A candidate that scored above zero, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub score: PairScore,
    pub record: NewMatchRecord,
}

/// Skill-exchange matching orchestrator
///
/// # Pipeline Stages
/// 1. Load every user's offered and wanted skills in one consistent read
/// 2. Score every other user against the triggering user
/// 3. Skip pairs that already have a record
/// 4. Persist the rest with a snapshot of both sides
///
/// Existing records are never updated. A percentage reflects the skill sets
/// at the time the record was created.
#[derive(Debug, Clone)]
pub struct Matcher {
    snapshot_size: usize,
}

impl Matcher {
    pub fn new(snapshot_size: usize) -> Self {
        Self { snapshot_size }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SNAPSHOT_SIZE)
    }

    pub fn snapshot_size(&self) -> usize {
        self.snapshot_size
    }

    /// Score `them` against `me` and build the record that would be stored
    pub fn evaluate(&self, me: &SkillProfile, them: &SkillProfile) -> Option<CandidateMatch> {
        let (my_offers, my_wants) = (me.offer_names(), me.want_names());
        let (their_offers, their_wants) = (them.offer_names(), them.want_names());
        let score = calculate_pair_score(
            my_offers.as_slice(),
            my_wants.as_slice(),
            their_offers.as_slice(),
            their_wants.as_slice(),
        );
        let percentage = score.match_percentage()?;

        let mine = SkillSnapshot::capture(&me.offers, &me.wants, self.snapshot_size);
        let theirs = SkillSnapshot::capture(&them.offers, &them.wants, self.snapshot_size);

        Some(CandidateMatch {
            score,
            record: NewMatchRecord {
                user1_id: me.user_id,
                user2_id: them.user_id,
                user1_offers: mine.offers,
                user1_wants: mine.wants,
                user2_offers: theirs.offers,
                user2_wants: theirs.wants,
                match_percentage: percentage,
                is_double_swap: score.is_double_swap,
            },
        })
    }

    /// Compute and persist new matches for `user_id` against everyone else
    ///
    /// An unknown user yields an empty result. Store failures are returned
    /// to the caller; records inserted before the failure stay in place.
    pub async fn find_matches_for_user<S, M>(
        &self,
        skills: &S,
        matches: &M,
        user_id: UserId,
    ) -> Result<MatchResult, StoreError>
    where
        S: SkillRepository + ?Sized,
        M: MatchRepository + ?Sized,
    {
        let Some(snapshot) = skills.load_snapshot(user_id).await? else {
            tracing::debug!("Skipping matching for unknown user {}", user_id);
            return Ok(MatchResult::default());
        };

        let mut result = MatchResult {
            candidates_scanned: snapshot.others.len(),
            ..MatchResult::default()
        };

        for them in &snapshot.others {
            let Some(candidate) = self.evaluate(&snapshot.me, them) else {
                continue;
            };

            let pair = UserPair::new(user_id, them.user_id);
            if matches.find_by_unordered_pair(pair).await?.is_some() {
                tracing::debug!("Match already exists for pair {:?}", pair);
                result.existing_pairs += 1;
                continue;
            }

            match matches.insert(candidate.record).await? {
                Some(record) => {
                    tracing::debug!(
                        "Created match {} between {} and {} ({}%, double swap: {})",
                        record.id,
                        record.user1_id,
                        record.user2_id,
                        record.match_percentage,
                        record.is_double_swap
                    );
                    result.created.push(record);
                }
                None => {
                    tracing::debug!("Lost insert race for pair {:?}", pair);
                    result.existing_pairs += 1;
                }
            }
        }

        tracing::info!(
            "Matching for user {} scanned {} candidates, created {} matches",
            user_id,
            result.candidates_scanned,
            result.created.len()
        );

        Ok(result)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Load both skill lists of a user
pub async fn load_profile<S>(skills: &S, user_id: UserId) -> Result<SkillProfile, StoreError>
where
    S: SkillRepository + ?Sized,
{
    let offers = skills.list_skills(user_id, SkillDirection::Offer).await?;
    let wants = skills.list_skills(user_id, SkillDirection::Want).await?;

    Ok(SkillProfile {
        user_id,
        offers,
        wants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::UserRepository;
    use crate::models::{NewSkillListing, NewUser, SkillListing};
    use crate::services::InMemoryStore;
    use std::sync::Arc;

    async fn create_user(store: &InMemoryStore, name: &str) -> UserId {
        store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                bio: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn add_skill(store: &InMemoryStore, user_id: UserId, name: &str, direction: SkillDirection) {
        store
            .insert_skill(NewSkillListing {
                user_id,
                skill_name: name.to_string(),
                direction,
                proficiency: None,
                description: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_offer_trigger_creates_double_swap() {
        let store = InMemoryStore::new();
        let a = create_user(&store, "alice").await;
        let b = create_user(&store, "bob").await;
        add_skill(&store, a, "Guitar", SkillDirection::Want).await;
        add_skill(&store, b, "guitar", SkillDirection::Offer).await;

        let result = Matcher::with_defaults()
            .find_matches_for_user(&store, &store, b)
            .await
            .unwrap();

        assert_eq!(result.candidates_scanned, 1);
        assert_eq!(result.created.len(), 1);
        let record = &result.created[0];
        assert_eq!(record.user1_id, b);
        assert_eq!(record.user2_id, a);
        assert_eq!(record.match_percentage, 100.0);
        assert!(record.is_double_swap);
        assert_eq!(record.user1_offers, "guitar");
        assert_eq!(record.user2_wants, "Guitar");
        assert_eq!(record.status, "pending");
    }

    #[tokio::test]
    async fn test_retrigger_is_idempotent() {
        let store = InMemoryStore::new();
        let a = create_user(&store, "alice").await;
        let b = create_user(&store, "bob").await;
        add_skill(&store, a, "Chess", SkillDirection::Want).await;
        add_skill(&store, b, "Chess", SkillDirection::Offer).await;

        let matcher = Matcher::with_defaults();
        let first = matcher.find_matches_for_user(&store, &store, b).await.unwrap();
        let second = matcher.find_matches_for_user(&store, &store, b).await.unwrap();
        add_skill(&store, a, "Rust", SkillDirection::Offer).await;
        let from_other_side = matcher.find_matches_for_user(&store, &store, a).await.unwrap();

        assert_eq!(first.created.len(), 1);
        assert!(second.created.is_empty());
        assert_eq!(second.existing_pairs, 1);
        assert!(from_other_side.created.is_empty());
        assert_eq!(store.list_for_user(a, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_noop() {
        let store = InMemoryStore::new();
        create_user(&store, "alice").await;

        let result = Matcher::with_defaults()
            .find_matches_for_user(&store, &store, 999)
            .await
            .unwrap();

        assert_eq!(result.candidates_scanned, 0);
        assert!(result.created.is_empty());
    }

    #[tokio::test]
    async fn test_user_without_skills_never_matches() {
        let store = InMemoryStore::new();
        let lonely = create_user(&store, "lonely").await;
        let b = create_user(&store, "bob").await;
        add_skill(&store, b, "Guitar", SkillDirection::Offer).await;
        add_skill(&store, b, "Piano", SkillDirection::Want).await;

        let result = Matcher::with_defaults()
            .find_matches_for_user(&store, &store, lonely)
            .await
            .unwrap();

        assert_eq!(result.candidates_scanned, 1);
        assert!(result.created.is_empty());
        assert_eq!(result.existing_pairs, 0);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_create_single_record() {
        let store = Arc::new(InMemoryStore::new());
        let a = create_user(&store, "alice").await;
        let b = create_user(&store, "bob").await;
        add_skill(&store, a, "Go", SkillDirection::Offer).await;
        add_skill(&store, a, "Rust", SkillDirection::Want).await;
        add_skill(&store, b, "Rust", SkillDirection::Offer).await;
        add_skill(&store, b, "Go", SkillDirection::Want).await;

        let matcher = Matcher::with_defaults();
        let handles: Vec<_> = [a, b, a, b]
            .into_iter()
            .map(|user_id| {
                let store = Arc::clone(&store);
                let matcher = matcher.clone();
                tokio::spawn(async move {
                    matcher
                        .find_matches_for_user(&*store, &*store, user_id)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            created += handle.await.unwrap().created.len();
        }

        assert_eq!(created, 1);
        assert_eq!(store.list_for_user(a, 100).await.unwrap().len(), 1);
    }

    #[test]
    fn test_evaluate_snapshot_respects_size() {
        let matcher = Matcher::new(1);
        let me = SkillProfile {
            user_id: 1,
            offers: vec![],
            wants: vec![
                listing(1, "Guitar", SkillDirection::Want),
                listing(1, "Piano", SkillDirection::Want),
            ],
        };
        let them = SkillProfile {
            user_id: 2,
            offers: vec![listing(2, "piano", SkillDirection::Offer)],
            wants: vec![],
        };

        let candidate = matcher.evaluate(&me, &them).unwrap();

        assert_eq!(candidate.record.user1_wants, "Guitar");
        assert_eq!(candidate.record.user2_offers, "piano");
        assert_eq!(candidate.record.match_percentage, 50.0);
        assert!(!candidate.record.is_double_swap);
    }

    fn listing(user_id: UserId, name: &str, direction: SkillDirection) -> SkillListing {
        SkillListing {
            id: 0,
            user_id,
            skill_name: name.to_string(),
            direction,
            proficiency: None,
            description: None,
            created_at: chrono::Utc::now(),
        }
    }
}
