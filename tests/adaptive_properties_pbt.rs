//! Property-based tests for the learning-curve tracker and MDP recommender.
//!
//! Invariants covered:
//! - Bounded history: a curve keeps exactly the 50 most recent points
//! - Trend: steady climbs classify as improving, high spread as volatile
//! - Learner state always matches the proficiency bucket
//! - Proficiency moves at most 0.05 per feedback
//! - Difficulty moves at most one level per analysis and stays in range
//! - Transition distributions stay normalized under online updates

use proptest::prelude::*;

use adaptive_tutor::adaptive::{
    ActionType, AdaptiveEngine, CurveTrend, DifficultyLevel, LearningState, MdpAction, Outcome, RecommendContext,
};

const ACTIONS: [ActionType; 7] = [
    ActionType::EasyLesson,
    ActionType::MediumLesson,
    ActionType::HardLesson,
    ActionType::Review,
    ActionType::Practice,
    ActionType::Assessment,
    ActionType::Break,
];

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_action() -> impl Strategy<Value = ActionType> {
    prop::sample::select(ACTIONS.to_vec())
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    ((-1.0f64..=2.0f64), (-0.5f64..=0.5f64), (-0.3f64..=0.3f64)).prop_map(
        |(performance, engagement_change, fatigue_change)| Outcome {
            performance,
            engagement_change,
            fatigue_change,
        },
    )
}

/// Ten strictly increasing scores whose slope stays above 0.05 and whose
/// spread stays below 0.3.
fn arb_steady_climb() -> impl Strategy<Value = Vec<f64>> {
    (
        (0.0f64..=0.05f64),
        (0.055f64..=0.1f64),
        prop::collection::vec(0.0f64..=0.004f64, 10),
    )
        .prop_map(|(base, step, jitter)| {
            jitter
                .into_iter()
                .enumerate()
                .map(|(i, j)| base + step * i as f64 + j)
                .collect()
        })
}

/// Ten scores split between a low and a high cluster at least 0.8 apart.
fn arb_bimodal() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((any::<bool>(), 0.0f64..=0.1f64), 10)
        .prop_filter("both clusters well populated", |points| {
            let high = points.iter().filter(|(is_high, _)| *is_high).count();
            (3..=7).contains(&high)
        })
        .prop_map(|points| {
            points
                .into_iter()
                .map(|(is_high, j)| if is_high { 0.9 + j } else { j })
                .collect()
        })
}

fn is_single_step(from: DifficultyLevel, to: DifficultyLevel) -> bool {
    to == from || to == from.harder() || to == from.easier()
}

// ============================================================================
// Tracker properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_history_keeps_latest_fifty(
        performances in prop::collection::vec(arb_f64_0_1(), 50..120),
    ) {
        let engine = AdaptiveEngine::default();
        for (i, perf) in performances.iter().enumerate() {
            engine.record_observation("u1", "algebra", *perf, i as u32, 1, 0.5);
        }

        let curve = engine.tracker().curve("u1", "algebra").unwrap();
        prop_assert_eq!(curve.data_points.len(), 50);

        let offset = performances.len() - 50;
        for (i, point) in curve.data_points.iter().enumerate() {
            prop_assert_eq!(point.time_spent as usize, offset + i);
            prop_assert_eq!(point.performance, performances[offset + i]);
        }
    }

    #[test]
    fn prop_steady_climb_is_improving(performances in arb_steady_climb()) {
        let engine = AdaptiveEngine::default();
        for perf in &performances {
            engine.record_observation("u1", "algebra", *perf, 20, 1, 0.7);
        }
        let curve = engine.tracker().curve("u1", "algebra").unwrap();
        prop_assert_eq!(curve.trend, CurveTrend::Improving);
    }

    #[test]
    fn prop_high_spread_is_volatile(performances in arb_bimodal()) {
        let engine = AdaptiveEngine::default();
        for perf in &performances {
            engine.record_observation("u1", "algebra", *perf, 20, 1, 0.7);
        }
        let curve = engine.tracker().curve("u1", "algebra").unwrap();
        prop_assert_eq!(curve.trend, CurveTrend::Volatile);
    }

    #[test]
    fn prop_difficulty_moves_one_level_at_most(
        observations in prop::collection::vec(
            (arb_f64_0_1(), 1u32..=90, 1u32..=6, arb_f64_0_1()),
            3..60,
        ),
    ) {
        let engine = AdaptiveEngine::default();
        for (perf, time_spent, attempts, engagement) in observations {
            engine.record_observation("u1", "algebra", perf, time_spent, attempts, engagement);

            let curve = engine.tracker().curve("u1", "algebra").unwrap();
            prop_assert!(is_single_step(curve.current_difficulty, curve.recommended_difficulty));
            prop_assert!(curve.recommended_difficulty >= DifficultyLevel::VeryEasy);
            prop_assert!(curve.recommended_difficulty <= DifficultyLevel::VeryHard);
            prop_assert!((0.0..=1.0).contains(&curve.confidence));

            let before = curve.current_difficulty;
            let after = engine.apply_difficulty_adjustment("u1", "algebra").unwrap();
            prop_assert!(is_single_step(before, after));
        }
    }
}

// ============================================================================
// Recommender properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_state_matches_proficiency_and_steps_are_small(
        steps in prop::collection::vec((arb_action(), arb_outcome(), -5.0f64..=10.0f64), 1..40),
        time_available in 0u32..=90,
    ) {
        let engine = AdaptiveEngine::default();
        let context = RecommendContext {
            time_available: Some(time_available),
            ..Default::default()
        };
        engine.recommend_action("u1", &context);

        let mut previous = engine.recommender().user_state("u1").unwrap();
        for (action_type, outcome, reward) in steps {
            let action = MdpAction::new(action_type, None);
            let state = engine.update_from_feedback("u1", &action, &outcome, reward);

            prop_assert_eq!(
                state.current_learning_state(),
                LearningState::from_proficiency(state.proficiency_level)
            );
            prop_assert!((state.proficiency_level - previous.proficiency_level).abs() <= 0.05 + 1e-12);
            prop_assert!((0.0..=1.0).contains(&state.proficiency_level));
            prop_assert!((0.0..=1.0).contains(&state.engagement_level));
            prop_assert!((0.0..=1.0).contains(&state.fatigue_level));
            prop_assert!(state.time_available <= previous.time_available);
            prop_assert_eq!(state.session_count, previous.session_count + 1);

            previous = state;
        }
    }

    #[test]
    fn prop_transitions_stay_normalized(
        steps in prop::collection::vec((arb_action(), arb_outcome(), -5.0f64..=10.0f64), 1..60),
    ) {
        let engine = AdaptiveEngine::default();
        for (action_type, outcome, reward) in steps {
            let action = MdpAction::new(action_type, None);
            engine.update_from_feedback("u1", &action, &outcome, reward);
        }

        let policy = engine.recommender().policy_snapshot();
        for from in LearningState::ALL {
            for action in ACTIONS {
                if let Some(dist) = policy.transitions().get(from, action) {
                    prop_assert!((dist.total() - 1.0).abs() < 1e-9);
                    prop_assert!(dist.iter().all(|(_, p)| (0.0..=1.0).contains(&p)));
                }
            }
        }
    }

    #[test]
    fn prop_recommendation_respects_short_sessions(
        time_available in 0u32..15,
        proficiency_steps in 0usize..20,
    ) {
        let engine = AdaptiveEngine::default();
        let context = RecommendContext {
            time_available: Some(time_available),
            ..Default::default()
        };
        engine.recommend_action("u1", &context);

        let climb = Outcome { performance: 1.0, engagement_change: 0.0, fatigue_change: 0.0 };
        let review = MdpAction::new(ActionType::Review, None);
        for _ in 0..proficiency_steps {
            engine.update_from_feedback("u1", &review, &climb, 1.0);
        }

        let action = engine.recommend_action("u1", &context);
        prop_assert!(matches!(
            action.action_type,
            ActionType::Review | ActionType::Practice | ActionType::Break
        ));
    }
}
