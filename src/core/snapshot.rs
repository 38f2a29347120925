use crate::models::SkillListing;

/// Number of skill names kept per side when a match is created
pub const DEFAULT_SNAPSHOT_SIZE: usize = 3;

/// Display cache of a user's leading skills, frozen into a match record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkillSnapshot {
    pub offers: String,
    pub wants: String,
}

impl SkillSnapshot {
    /// Take the first `size` offered and wanted names, in listing order
    pub fn capture(offers: &[SkillListing], wants: &[SkillListing], size: usize) -> Self {
        Self {
            offers: join_leading(offers, size),
            wants: join_leading(wants, size),
        }
    }
}

fn join_leading(skills: &[SkillListing], size: usize) -> String {
    skills
        .iter()
        .take(size)
        .map(|s| s.skill_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillDirection;
    use chrono::Utc;

    fn listing(name: &str, direction: SkillDirection) -> SkillListing {
        SkillListing {
            id: 0,
            user_id: 1,
            skill_name: name.to_string(),
            direction,
            proficiency: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_capture_keeps_first_three_in_order() {
        let offers: Vec<_> = ["Rust", "Go", "Chess", "Piano"]
            .iter()
            .map(|n| listing(n, SkillDirection::Offer))
            .collect();
        let wants = vec![listing("Guitar", SkillDirection::Want)];

        let snapshot = SkillSnapshot::capture(&offers, &wants, DEFAULT_SNAPSHOT_SIZE);

        assert_eq!(snapshot.offers, "Rust, Go, Chess");
        assert_eq!(snapshot.wants, "Guitar");
    }

    #[test]
    fn test_capture_empty_lists() {
        let snapshot = SkillSnapshot::capture(&[], &[], DEFAULT_SNAPSHOT_SIZE);
        assert_eq!(snapshot, SkillSnapshot::default());
    }
}
