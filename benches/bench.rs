// Criterion benchmarks for Swapp Match

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use swapp_match::core::{calculate_pair_score, Matcher, SkillRepository, UserRepository};
use swapp_match::models::{NewSkillListing, NewUser, SkillDirection, SkillListing, SkillProfile};
use swapp_match::services::InMemoryStore;

const SKILLS: &[&str] = &[
    "Guitar", "Piano", "Spanish", "French", "Rust", "Python", "Cooking", "Chess",
    "Photography", "Yoga", "Drawing", "Swimming", "Knitting", "Go", "Public Speaking",
];

fn names(offset: usize, count: usize) -> Vec<&'static str> {
    (0..count).map(|i| SKILLS[(offset + i * 3) % SKILLS.len()]).collect()
}

fn listing(user_id: i64, name: &str, direction: SkillDirection) -> SkillListing {
    SkillListing {
        id: 0,
        user_id,
        skill_name: name.to_string(),
        direction,
        proficiency: None,
        description: None,
        created_at: Utc::now(),
    }
}

fn profile(user_id: i64) -> SkillProfile {
    let offset = user_id as usize;
    SkillProfile {
        user_id,
        offers: names(offset, 4)
            .into_iter()
            .map(|n| listing(user_id, n, SkillDirection::Offer))
            .collect(),
        wants: names(offset + 1, 4)
            .into_iter()
            .map(|n| listing(user_id, &n.to_lowercase(), SkillDirection::Want))
            .collect(),
    }
}

fn bench_pair_score(c: &mut Criterion) {
    let my_offers = names(0, 5);
    let my_wants = names(1, 5);
    let their_offers = names(2, 5);
    let their_wants = names(3, 5);

    c.bench_function("pair_score_5x5", |b| {
        b.iter(|| {
            calculate_pair_score(
                black_box(my_offers.as_slice()),
                black_box(my_wants.as_slice()),
                black_box(their_offers.as_slice()),
                black_box(their_wants.as_slice()),
            )
        });
    });
}

fn bench_evaluate_population(c: &mut Criterion) {
    let matcher = Matcher::with_defaults();
    let me = profile(0);

    let mut group = c.benchmark_group("evaluate");

    for candidate_count in [10, 100, 1000].iter() {
        let candidates: Vec<SkillProfile> = (1..=*candidate_count).map(|i| profile(i as i64)).collect();

        group.bench_with_input(
            BenchmarkId::new("population", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    candidates
                        .iter()
                        .filter_map(|them| matcher.evaluate(black_box(&me), them))
                        .count()
                });
            },
        );
    }

    group.finish();
}

fn seeded_store(population: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    tokio_test::block_on(async {
        for i in 0..population {
            let user = store
                .create_user(NewUser {
                    username: format!("user{}", i),
                    email: format!("user{}@swapp.test", i),
                    bio: None,
                })
                .await
                .unwrap();
            let p = profile(i as i64);
            for skill in p.offers.into_iter().chain(p.wants) {
                store
                    .insert_skill(NewSkillListing {
                        user_id: user.id,
                        skill_name: skill.skill_name,
                        direction: skill.direction,
                        proficiency: None,
                        description: None,
                    })
                    .await
                    .unwrap();
            }
        }
    });
    store
}

fn bench_matcher_run(c: &mut Criterion) {
    let matcher = Matcher::with_defaults();

    c.bench_function("find_matches_for_user_200_users", |b| {
        b.iter_batched(
            || seeded_store(200),
            |store| {
                tokio_test::block_on(matcher.find_matches_for_user(&store, &store, 1)).unwrap()
            },
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_pair_score, bench_evaluate_population, bench_matcher_run);

criterion_main!(benches);
