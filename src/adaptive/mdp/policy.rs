use std::collections::HashMap;

use crate::adaptive::config::MdpParams;
use crate::adaptive::types::{ActionType, LearningState};

use crate::adaptive::types::ActionType::{EasyLesson, HardLesson, MediumLesson, Practice, Review};
use crate::adaptive::types::LearningState::{Advanced, Beginner, Expert, Intermediate};

/// Probability of landing in each learning state, indexed by
/// [`LearningState::index`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateDistribution([f64; 4]);

impl StateDistribution {
    pub fn from_pairs(pairs: &[(LearningState, f64)]) -> Self {
        let mut probs = [0.0; 4];
        for (state, p) in pairs {
            probs[state.index()] = *p;
        }
        Self(probs)
    }

    pub fn probability(&self, state: LearningState) -> f64 {
        self.0[state.index()]
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LearningState, f64)> + '_ {
        LearningState::ALL.iter().map(move |s| (*s, self.0[s.index()]))
    }

    /// Raises the mass on `state` by `amount` (capped at 1) and renormalizes.
    fn reinforce(&mut self, state: LearningState, amount: f64) {
        let idx = state.index();
        self.0[idx] = (self.0[idx] + amount).min(1.0);
        let total = self.total();
        if total > 0.0 {
            for p in self.0.iter_mut() {
                *p /= total;
            }
        }
    }
}

/// Next-state distributions per (state, action). Pairs without an entry
/// (practice, assessment, break) carry no lookahead value.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    entries: HashMap<(LearningState, ActionType), StateDistribution>,
}

impl TransitionTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, from: LearningState, action: ActionType, dist: StateDistribution) {
        self.entries.insert((from, action), dist);
    }

    pub fn get(&self, from: LearningState, action: ActionType) -> Option<&StateDistribution> {
        self.entries.get(&(from, action))
    }

    /// Returns false when the pair has no distribution to adjust.
    pub fn reinforce(&mut self, from: LearningState, action: ActionType, to: LearningState, amount: f64) -> bool {
        match self.entries.get_mut(&(from, action)) {
            Some(dist) => {
                dist.reinforce(to, amount);
                true
            }
            None => false,
        }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        let rows: [(LearningState, ActionType, &[(LearningState, f64)]); 16] = [
            (Beginner, EasyLesson, &[(Beginner, 0.3), (Intermediate, 0.6), (Advanced, 0.1)]),
            (Beginner, MediumLesson, &[(Beginner, 0.7), (Intermediate, 0.3)]),
            (Beginner, HardLesson, &[(Beginner, 0.9), (Intermediate, 0.1)]),
            (Beginner, Review, &[(Beginner, 0.8), (Intermediate, 0.2)]),
            (Intermediate, EasyLesson, &[(Beginner, 0.1), (Intermediate, 0.8), (Advanced, 0.1)]),
            (Intermediate, MediumLesson, &[(Beginner, 0.1), (Intermediate, 0.4), (Advanced, 0.5)]),
            (Intermediate, HardLesson, &[(Beginner, 0.3), (Intermediate, 0.6), (Advanced, 0.1)]),
            (Intermediate, Review, &[(Beginner, 0.2), (Intermediate, 0.7), (Advanced, 0.1)]),
            (Advanced, EasyLesson, &[(Intermediate, 0.2), (Advanced, 0.7), (Expert, 0.1)]),
            (Advanced, MediumLesson, &[(Intermediate, 0.1), (Advanced, 0.6), (Expert, 0.3)]),
            (Advanced, HardLesson, &[(Intermediate, 0.1), (Advanced, 0.4), (Expert, 0.5)]),
            (Advanced, Review, &[(Intermediate, 0.1), (Advanced, 0.8), (Expert, 0.1)]),
            (Expert, EasyLesson, &[(Advanced, 0.1), (Expert, 0.9)]),
            (Expert, MediumLesson, &[(Advanced, 0.1), (Expert, 0.9)]),
            (Expert, HardLesson, &[(Advanced, 0.2), (Expert, 0.8)]),
            (Expert, Review, &[(Advanced, 0.1), (Expert, 0.9)]),
        ];

        let mut table = Self::empty();
        for (from, action, pairs) in rows {
            table.insert(from, action, StateDistribution::from_pairs(pairs));
        }
        table
    }
}

/// Scalar payoff per (from, action, to); absent triples are worth 0.
#[derive(Debug, Clone)]
pub struct RewardTable {
    entries: HashMap<(LearningState, ActionType, LearningState), f64>,
}

impl RewardTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, from: LearningState, action: ActionType, to: LearningState) -> f64 {
        self.entries.get(&(from, action, to)).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, from: LearningState, action: ActionType, to: LearningState) -> bool {
        self.entries.contains_key(&(from, action, to))
    }

    pub fn insert(&mut self, from: LearningState, action: ActionType, to: LearningState, reward: f64) {
        self.entries.insert((from, action, to), reward);
    }

    /// Exponential moving average toward `observed`; first sighting stores it as is.
    pub fn blend(&mut self, from: LearningState, action: ActionType, to: LearningState, observed: f64, smoothing: f64) {
        self.entries
            .entry((from, action, to))
            .and_modify(|r| *r = smoothing * *r + (1.0 - smoothing) * observed)
            .or_insert(observed);
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        let rows = [
            // promotion
            (Beginner, EasyLesson, Intermediate, 10.0),
            (Intermediate, MediumLesson, Advanced, 15.0),
            (Advanced, HardLesson, Expert, 20.0),
            // mastery
            (Beginner, Review, Beginner, 5.0),
            (Intermediate, Review, Intermediate, 8.0),
            (Advanced, Review, Advanced, 12.0),
            // engagement
            (Beginner, Practice, Beginner, 3.0),
            (Intermediate, Practice, Intermediate, 5.0),
            (Advanced, Practice, Advanced, 7.0),
            // efficiency
            (Beginner, EasyLesson, Beginner, 2.0),
            (Intermediate, MediumLesson, Intermediate, 3.0),
            (Advanced, HardLesson, Advanced, 4.0),
        ];

        let mut table = Self::empty();
        for (from, action, to, reward) in rows {
            table.insert(from, action, to, reward);
        }
        table
    }
}

/// Transition and reward model shared by every user, drifting slowly toward
/// observed outcomes.
#[derive(Debug, Clone)]
pub struct MdpPolicy {
    transitions: TransitionTable,
    rewards: RewardTable,
    transition_nudge: f64,
    reward_smoothing: f64,
}

impl MdpPolicy {
    pub fn new(params: &MdpParams) -> Self {
        Self::with_tables(TransitionTable::default(), RewardTable::default(), params)
    }

    pub fn with_tables(transitions: TransitionTable, rewards: RewardTable, params: &MdpParams) -> Self {
        Self {
            transitions,
            rewards,
            transition_nudge: params.transition_nudge,
            reward_smoothing: params.reward_smoothing,
        }
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    /// Σ P(next | from, action) · R(from, action, next).
    pub fn expected_future_reward(&self, from: LearningState, action: ActionType) -> f64 {
        self.transitions
            .get(from, action)
            .map(|dist| {
                dist.iter()
                    .map(|(next, p)| p * self.rewards.get(from, action, next))
                    .sum::<f64>()
            })
            .unwrap_or(0.0)
    }

    pub fn observe(&mut self, from: LearningState, action: ActionType, to: LearningState, reward: f64) {
        let reinforced = self.transitions.reinforce(from, action, to, self.transition_nudge);
        self.rewards.blend(from, action, to, reward, self.reward_smoothing);

        tracing::debug!(
            from = from.as_str(),
            action = action.as_str(),
            to = to.as_str(),
            reward,
            reinforced,
            "policy updated from feedback"
        );
    }
}

impl Default for MdpPolicy {
    fn default() -> Self {
        Self::new(&MdpParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_distributions_sum_to_one() {
        let table = TransitionTable::default();
        for from in LearningState::ALL {
            for action in [EasyLesson, MediumLesson, HardLesson, Review] {
                let dist = table.get(from, action).unwrap();
                assert!((dist.total() - 1.0).abs() < 1e-9, "{from:?} {action:?}");
            }
            assert!(table.get(from, Practice).is_none());
        }
    }

    #[test]
    fn test_future_reward() {
        let policy = MdpPolicy::default();
        // 0.3 * 2 + 0.6 * 10
        assert!((policy.expected_future_reward(Beginner, EasyLesson) - 6.6).abs() < 1e-9);
        assert!((policy.expected_future_reward(Beginner, Review) - 4.0).abs() < 1e-9);
        assert_eq!(policy.expected_future_reward(Beginner, Practice), 0.0);
    }

    #[test]
    fn test_reinforce_renormalizes() {
        let mut policy = MdpPolicy::default();
        policy.observe(Beginner, EasyLesson, Beginner, 2.0);
        let dist = policy.transitions().get(Beginner, EasyLesson).unwrap();
        assert!((dist.total() - 1.0).abs() < 1e-9);
        assert!((dist.probability(Beginner) - 0.31 / 1.01).abs() < 1e-9);
        assert!(dist.probability(Intermediate) < 0.6);
    }

    #[test]
    fn test_reward_ema_and_insert() {
        let mut policy = MdpPolicy::default();
        policy.observe(Beginner, EasyLesson, Intermediate, 20.0);
        assert!((policy.rewards().get(Beginner, EasyLesson, Intermediate) - 11.0).abs() < 1e-9);

        assert!(!policy.rewards().contains(Beginner, Practice, Intermediate));
        policy.observe(Beginner, Practice, Intermediate, 4.0);
        assert_eq!(policy.rewards().get(Beginner, Practice, Intermediate), 4.0);
        assert!(policy.transitions().get(Beginner, Practice).is_none());
    }
}
