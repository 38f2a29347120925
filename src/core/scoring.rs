/// Raw counts behind a compatibility score
///
/// Both directions accumulate into a single `match_score` over a
/// `total_possible` that also counts both directions, so the derived
/// percentage is not capped at 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairScore {
    pub match_score: u32,
    pub total_possible: u32,
    pub is_double_swap: bool,
}

impl PairScore {
    /// Percentage rounded to one decimal, or `None` when the pair should be skipped
    pub fn match_percentage(&self) -> Option<f64> {
        if self.match_score == 0 || self.total_possible == 0 {
            return None;
        }

        let ratio = self.match_score as f64 / self.total_possible as f64;
        Some(round_to_one_decimal(ratio * 100.0))
    }
}

/// Score one candidate against the triggering user
///
/// Scoring formula:
/// - every wanted skill of mine adds 1 to `total_possible`, and 1 to
///   `match_score` for *each* of their offers with the same name
/// - every offered skill of mine adds 1 to `total_possible`, and 1 to
///   `match_score` for each of their wants with the same name; any such hit
///   marks the pair as a double swap
///
/// Names compare case-insensitively.
pub fn calculate_pair_score<A, B>(
    my_offers: &[A],
    my_wants: &[A],
    their_offers: &[B],
    their_wants: &[B],
) -> PairScore
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let their_offers = lowercase_all(their_offers);
    let their_wants = lowercase_all(their_wants);

    let mut score = PairScore::default();

    for want in my_wants {
        score.total_possible += 1;
        score.match_score += count_equal(&want.as_ref().to_lowercase(), &their_offers);
    }

    for offer in my_offers {
        score.total_possible += 1;
        let hits = count_equal(&offer.as_ref().to_lowercase(), &their_wants);
        if hits > 0 {
            score.match_score += hits;
            score.is_double_swap = true;
        }
    }

    score
}

/// Case-insensitive skill name equality
#[inline]
pub fn skill_names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[inline]
fn lowercase_all<T: AsRef<str>>(names: &[T]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_lowercase()).collect()
}

#[inline]
fn count_equal(needle: &str, haystack: &[String]) -> u32 {
    haystack.iter().filter(|name| name.as_str() == needle).count() as u32
}

/// Round to one decimal place, ties to even
///
/// Ties are judged on the exact binary value of `value`, so 6.25 rounds to
/// 6.2 while 0.15 (stored slightly below) rounds to 0.1.
#[inline]
fn round_to_one_decimal(value: f64) -> f64 {
    let scaled = value * 10.0;
    // Exact error of the multiplication: value * 10 == scaled + residual
    let residual = value.mul_add(10.0, -scaled);
    let floor = scaled.floor();

    let rounded = if scaled - floor != 0.5 {
        scaled.round()
    } else if residual > 0.0 {
        floor + 1.0
    } else if residual < 0.0 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };

    rounded / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_single_direction_want() {
        let score = calculate_pair_score(&NONE, &["Guitar"], &["guitar"], &NONE);

        assert_eq!(score.match_score, 1);
        assert_eq!(score.total_possible, 1);
        assert!(!score.is_double_swap);
        assert_eq!(score.match_percentage(), Some(100.0));
    }

    #[test]
    fn test_offer_hit_sets_double_swap() {
        let score = calculate_pair_score(&["guitar"], &NONE, &NONE, &["Guitar"]);

        assert_eq!(score.match_score, 1);
        assert!(score.is_double_swap);
        assert_eq!(score.match_percentage(), Some(100.0));
    }

    #[test]
    fn test_many_to_many_count() {
        // One want hits two identically named offers
        let score = calculate_pair_score(&NONE, &["Python"], &["python", "PYTHON"], &NONE);

        assert_eq!(score.match_score, 2);
        assert_eq!(score.total_possible, 1);
        assert_eq!(score.match_percentage(), Some(200.0));
    }

    #[test]
    fn test_partial_overlap_percentage() {
        let score = calculate_pair_score(
            &["Cooking", "Rust"],
            &["Guitar", "Spanish", "Chess"],
            &["guitar"],
            &["rust"],
        );

        assert_eq!(score.match_score, 2);
        assert_eq!(score.total_possible, 5);
        assert!(score.is_double_swap);
        assert_eq!(score.match_percentage(), Some(40.0));
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        let score = calculate_pair_score(&NONE, &["a", "b", "c"], &["A"], &NONE);

        assert_eq!(score.match_percentage(), Some(33.3));
    }

    #[test]
    fn test_exact_ties_round_to_even() {
        let wants: Vec<String> = (0..16).map(|i| format!("s{}", i)).collect();
        let score = calculate_pair_score(&[] as &[String], &wants, &["S0"], &NONE);
        // 1/16 is exactly 6.25%
        assert_eq!(score.match_percentage(), Some(6.2));

        assert_eq!(round_to_one_decimal(1.25), 1.2);
        assert_eq!(round_to_one_decimal(0.25), 0.2);
        assert_eq!(round_to_one_decimal(0.75), 0.8);
        assert_eq!(round_to_one_decimal(18.75), 18.8);
    }

    #[test]
    fn test_near_ties_follow_stored_value() {
        // 0.15 and 0.35 are stored just below the midpoint
        assert_eq!(round_to_one_decimal(0.15), 0.1);
        assert_eq!(round_to_one_decimal(0.35), 0.3);
        assert_eq!(round_to_one_decimal(2.675), 2.7);
    }

    #[test]
    fn test_no_overlap_is_skipped() {
        let score = calculate_pair_score(&["Chess"], &["Guitar"], &["Piano"], &["Go"]);

        assert_eq!(score.match_score, 0);
        assert_eq!(score.total_possible, 2);
        assert_eq!(score.match_percentage(), None);
    }

    #[test]
    fn test_empty_lists_are_skipped() {
        let score = calculate_pair_score(&NONE, &NONE, &["Piano"], &["Go"]);

        assert_eq!(score.total_possible, 0);
        assert_eq!(score.match_percentage(), None);
    }

    #[test]
    fn test_skill_names_match_ignores_case() {
        assert!(skill_names_match("Python", "python"));
        assert!(!skill_names_match("Python", "Python3"));
    }
}
