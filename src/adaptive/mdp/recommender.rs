use parking_lot::RwLock;

use crate::adaptive::config::{MdpParams, StoreParams};
use crate::adaptive::mdp::policy::MdpPolicy;
use crate::adaptive::store::KeyedStore;
use crate::adaptive::types::*;

/// Candidate order doubles as the tie-break: on equal value the earlier
/// action wins.
const CANDIDATE_ORDER: [ActionType; 7] = [
    ActionType::Review,
    ActionType::Practice,
    ActionType::Assessment,
    ActionType::EasyLesson,
    ActionType::MediumLesson,
    ActionType::HardLesson,
    ActionType::Break,
];

const SHORT_SESSION_ACTIONS: [ActionType; 3] = [ActionType::Review, ActionType::Practice, ActionType::Break];

/// One-step-lookahead action selection over per-user [`MdpState`]s.
///
/// Lock order is always user state, then policy.
pub struct MdpRecommender {
    params: MdpParams,
    policy: RwLock<MdpPolicy>,
    states: KeyedStore<String, MdpState>,
}

impl MdpRecommender {
    pub fn new(params: MdpParams, store: &StoreParams) -> Self {
        let policy = MdpPolicy::new(&params);
        Self::with_policy(params, policy, store)
    }

    pub fn with_policy(params: MdpParams, policy: MdpPolicy, store: &StoreParams) -> Self {
        Self {
            params,
            policy: RwLock::new(policy),
            states: KeyedStore::new(store.capacity),
        }
    }

    pub fn recommend_action(&self, user_id: &str, context: &RecommendContext) -> MdpAction {
        let key = user_id.to_string();
        let (action_type, value, learning_state) = self.states.update(
            &key,
            || self.initial_state(user_id, context),
            |state| {
                let policy = self.policy.read();
                let (action, value) = self.select_action(state, &policy);
                (action, value, state.current_learning_state())
            },
        );

        tracing::debug!(
            user_id = %user_id,
            state = learning_state.as_str(),
            action = action_type.as_str(),
            value,
            "action recommended"
        );

        MdpAction::new(action_type, context.lesson_id.clone())
    }

    /// Applies an observed outcome to the user's state and lets the shared
    /// policy drift toward it. Returns the updated state.
    pub fn update_from_feedback(&self, user_id: &str, action: &MdpAction, outcome: &Outcome, reward: f64) -> MdpState {
        let key = user_id.to_string();
        let state = self.states.update(
            &key,
            || self.initial_state(user_id, &RecommendContext::default()),
            |state| {
                let from = state.current_learning_state();
                self.apply_outcome(state, action, outcome);
                let to = state.current_learning_state();
                self.policy.write().observe(from, action.action_type, to, reward);
                state.clone()
            },
        );

        tracing::debug!(
            user_id = %user_id,
            action = action.action_type.as_str(),
            proficiency = state.proficiency_level,
            state = state.current_learning_state().as_str(),
            time_available = state.time_available,
            "feedback applied"
        );

        state
    }

    /// Previews a path by alternating recommendations with an optimistic
    /// simulated outcome. The simulation goes through
    /// [`update_from_feedback`](Self::update_from_feedback), so the user's
    /// live state and the shared tables move with it.
    pub fn get_learning_path_recommendation(&self, user_id: &str, num_steps: usize) -> Vec<MdpAction> {
        let simulated = &self.params.simulated;
        let outcome = Outcome {
            performance: simulated.performance,
            engagement_change: simulated.engagement_change,
            fatigue_change: simulated.fatigue_change,
        };

        let mut path = Vec::with_capacity(num_steps);
        for _ in 0..num_steps {
            let action = self.recommend_action(user_id, &RecommendContext::default());
            self.update_from_feedback(user_id, &action, &outcome, simulated.reward);
            path.push(action);
        }
        path
    }

    pub fn available_actions(&self, state: &MdpState) -> Vec<ActionType> {
        let proficiency = state.proficiency_level;
        let learning_state = state.current_learning_state();

        let offered = |action: ActionType| match action {
            ActionType::Review | ActionType::Practice | ActionType::Assessment => true,
            ActionType::EasyLesson => true,
            ActionType::MediumLesson => learning_state != LearningState::Beginner || proficiency > 0.3,
            ActionType::HardLesson => match learning_state {
                LearningState::Beginner => false,
                LearningState::Intermediate => proficiency > 0.6,
                LearningState::Advanced | LearningState::Expert => true,
            },
            ActionType::Break => state.fatigue_level > self.params.break_fatigue_threshold,
        };

        let short_session = state.time_available < self.params.short_session_minutes;

        CANDIDATE_ORDER
            .into_iter()
            .filter(|action| offered(*action))
            .filter(|action| !short_session || SHORT_SESSION_ACTIONS.contains(action))
            .collect()
    }

    pub fn immediate_reward(&self, state: &MdpState, action: ActionType) -> f64 {
        action.base_reward() + self.params.proficiency_weight * state.proficiency_level
            + self.params.engagement_weight * state.engagement_level
            - self.params.fatigue_penalty * state.fatigue_level
    }

    pub fn action_values(&self, state: &MdpState, policy: &MdpPolicy) -> Vec<(ActionType, f64)> {
        let learning_state = state.current_learning_state();
        self.available_actions(state)
            .into_iter()
            .map(|action| {
                let value = self.immediate_reward(state, action)
                    + self.params.discount * policy.expected_future_reward(learning_state, action);
                (action, value)
            })
            .collect()
    }

    pub fn user_state(&self, user_id: &str) -> Option<MdpState> {
        self.states.read(&user_id.to_string(), MdpState::clone)
    }

    pub fn policy_snapshot(&self) -> MdpPolicy {
        self.policy.read().clone()
    }

    pub fn cleanup_stale(&self, max_age: chrono::Duration) -> usize {
        self.states.cleanup_stale(max_age)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    fn select_action(&self, state: &MdpState, policy: &MdpPolicy) -> (ActionType, f64) {
        let mut best: Option<(ActionType, f64)> = None;
        for (action, value) in self.action_values(state, policy) {
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((action, value)),
            }
        }
        // review is never filtered out, so the candidate list is non-empty
        best.unwrap_or((ActionType::Review, 0.0))
    }

    fn initial_state(&self, user_id: &str, context: &RecommendContext) -> MdpState {
        tracing::debug!(user_id = %user_id, "initializing learner state");
        MdpState::new(
            user_id,
            context
                .learning_style
                .clone()
                .unwrap_or_else(|| "balanced".to_string()),
            context
                .time_available
                .unwrap_or(self.params.default_time_available),
        )
    }

    fn apply_outcome(&self, state: &mut MdpState, action: &MdpAction, outcome: &Outcome) {
        // Bounding the score bounds the step at ±proficiency_step / 2.
        let performance = outcome.performance.clamp(0.0, 1.0);
        state.proficiency_level =
            (state.proficiency_level + (performance - 0.5) * self.params.proficiency_step).clamp(0.0, 1.0);
        state.engagement_level = (state.engagement_level + outcome.engagement_change).clamp(0.0, 1.0);
        state.fatigue_level = (state.fatigue_level + outcome.fatigue_change).clamp(0.0, 1.0);

        state.recent_performance.push_back(outcome.performance);
        while state.recent_performance.len() > self.params.performance_history {
            state.recent_performance.pop_front();
        }

        state.time_available = state.time_available.saturating_sub(action.duration);
        state.session_count += 1;
    }
}

impl Default for MdpRecommender {
    fn default() -> Self {
        Self::new(MdpParams::default(), &StoreParams::default())
    }
}
