use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adaptive::config::AdaptiveConfig;
use crate::adaptive::curve::LearningCurveTracker;
use crate::adaptive::error::AdaptiveError;
use crate::adaptive::mdp::MdpRecommender;
use crate::adaptive::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub performance: f64,
    pub time_spent: u32,
    pub attempts: u32,
    pub engagement: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Observation {
    pub fn new(performance: f64, time_spent: u32, attempts: u32, engagement: f64) -> Self {
        Self {
            performance,
            time_spent,
            attempts,
            engagement,
            timestamp: None,
        }
    }

    fn validate(&self) -> Result<(), AdaptiveError> {
        check_unit("performance", self.performance)?;
        check_unit("engagement", self.engagement)?;
        if self.attempts == 0 {
            return Err(AdaptiveError::InvalidObservation {
                field: "attempts",
                value: 0.0,
                expected: "at least 1",
            });
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), AdaptiveError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AdaptiveError::InvalidObservation {
            field,
            value,
            expected: "a value in [0, 1]",
        })
    }
}

/// What happened when a learner finished a recommended action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutcome {
    pub performance: f64,
    pub time_spent: u32,
    pub attempts: u32,
    pub engagement: f64,
    #[serde(default)]
    pub engagement_change: f64,
    #[serde(default = "default_fatigue_change")]
    pub fatigue_change: f64,
}

fn default_fatigue_change() -> f64 {
    Outcome::default().fatigue_change
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationResult {
    pub point: LearningPoint,
    pub adjustment: DifficultyAdjustment,
    pub alerts: Vec<StruggleAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub point: LearningPoint,
    pub state: MdpState,
    pub next_action: Option<MdpAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub learning_curve: CurveAnalysis,
    pub mdp_recommendations: Vec<MdpAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStep {
    DifficultyAdjustment {
        current: DifficultyLevel,
        recommended: DifficultyLevel,
        reason: String,
    },
    AdditionalPractice {
        reason: String,
        suggested_actions: Vec<String>,
    },
    EngagementBoost {
        reason: String,
        suggested_actions: Vec<String>,
    },
}

/// Ties the learning-curve tracker to the action recommender: observations
/// feed the curve, completed actions feed both.
pub struct AdaptiveEngine {
    config: AdaptiveConfig,
    tracker: LearningCurveTracker,
    recommender: MdpRecommender,
}

impl AdaptiveEngine {
    pub fn new(config: AdaptiveConfig) -> Self {
        let tracker = LearningCurveTracker::new(config.tracker.clone(), &config.store);
        let recommender = MdpRecommender::new(config.mdp.clone(), &config.store);
        Self {
            config,
            tracker,
            recommender,
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn tracker(&self) -> &LearningCurveTracker {
        &self.tracker
    }

    pub fn recommender(&self) -> &MdpRecommender {
        &self.recommender
    }

    pub fn observe(&self, user_id: &str, concept: &str, observation: &Observation) -> Result<ObservationResult, AdaptiveError> {
        if self.config.feature_flags.strict_inputs {
            observation.validate()?;
        }

        let point = self.record(user_id, concept, observation);
        let adjustment = self.tracker.get_difficulty_adjustment(user_id, concept);
        let alerts = self.tracker.get_struggle_alerts(user_id, concept);

        if !alerts.is_empty() {
            tracing::info!(
                user_id = %user_id,
                concept = %concept,
                alerts = alerts.len(),
                "struggle detected"
            );
        }

        Ok(ObservationResult {
            point,
            adjustment,
            alerts,
        })
    }

    /// Records the outcome of `action` on the concept's curve, moves the
    /// learner's MDP state, and picks the next action.
    pub fn complete_action(
        &self,
        user_id: &str,
        concept: &str,
        action: &MdpAction,
        outcome: &ActivityOutcome,
        reward: f64,
    ) -> Result<ActionResult, AdaptiveError> {
        let observation = Observation::new(outcome.performance, outcome.time_spent, outcome.attempts, outcome.engagement);
        if self.config.feature_flags.strict_inputs {
            observation.validate()?;
        }

        let point = self.record(user_id, concept, &observation);
        let feedback = Outcome {
            performance: outcome.performance,
            engagement_change: outcome.engagement_change,
            fatigue_change: outcome.fatigue_change,
        };
        let state = self.recommender.update_from_feedback(user_id, action, &feedback, reward);

        let next_action = self
            .config
            .feature_flags
            .mdp_recommendations_enabled
            .then(|| self.recommender.recommend_action(user_id, &RecommendContext::default()));

        Ok(ActionResult {
            point,
            state,
            next_action,
        })
    }

    pub fn progress_report(&self, user_id: &str, concept: &str, context: &RecommendContext) -> ProgressReport {
        let learning_curve = self.progress_curve(user_id, concept);
        let mdp_recommendations = if self.config.feature_flags.mdp_recommendations_enabled {
            vec![self.recommender.recommend_action(user_id, context)]
        } else {
            Vec::new()
        };

        ProgressReport {
            learning_curve,
            mdp_recommendations,
        }
    }

    pub fn next_steps(&self, user_id: &str, concept: &str) -> Vec<NextStep> {
        let mut steps = Vec::new();

        if let CurveAnalysis::Analyzed(report) = self.progress_curve(user_id, concept) {
            if report.recommended_difficulty != report.current_difficulty {
                steps.push(NextStep::DifficultyAdjustment {
                    current: report.current_difficulty,
                    recommended: report.recommended_difficulty,
                    reason: "Learning curve analysis suggests difficulty adjustment".to_string(),
                });
            }
            if report.recent_performance < 0.7 {
                steps.push(NextStep::AdditionalPractice {
                    reason: "Recent performance suggests need for more practice".to_string(),
                    suggested_actions: to_strings(&["Review concepts", "Practice with examples", "Take assessment"]),
                });
            }
        }

        if let Some(state) = self.recommender.user_state(user_id) {
            if state.engagement_level < 0.6 {
                steps.push(NextStep::EngagementBoost {
                    reason: "Low engagement detected".to_string(),
                    suggested_actions: to_strings(&["Try interactive content", "Take a break", "Switch topics"]),
                });
            }
        }

        steps
    }

    pub fn record_observation(
        &self,
        user_id: &str,
        concept: &str,
        performance: f64,
        time_spent: u32,
        attempts: u32,
        engagement: f64,
    ) -> LearningPoint {
        self.tracker
            .record_observation(user_id, concept, performance, time_spent, attempts, engagement)
    }

    pub fn get_learning_curve_analysis(&self, user_id: &str, concept: &str) -> CurveAnalysis {
        self.tracker.get_learning_curve_analysis(user_id, concept)
    }

    pub fn get_difficulty_adjustment(&self, user_id: &str, concept: &str) -> DifficultyAdjustment {
        self.tracker.get_difficulty_adjustment(user_id, concept)
    }

    pub fn get_struggle_alerts(&self, user_id: &str, concept: &str) -> Vec<StruggleAlert> {
        self.tracker.get_struggle_alerts(user_id, concept)
    }

    pub fn apply_difficulty_adjustment(&self, user_id: &str, concept: &str) -> Option<DifficultyLevel> {
        self.tracker.apply_difficulty_adjustment(user_id, concept)
    }

    pub fn recommend_action(&self, user_id: &str, context: &RecommendContext) -> MdpAction {
        self.recommender.recommend_action(user_id, context)
    }

    pub fn update_from_feedback(&self, user_id: &str, action: &MdpAction, outcome: &Outcome, reward: f64) -> MdpState {
        self.recommender.update_from_feedback(user_id, action, outcome, reward)
    }

    pub fn get_learning_path_recommendation(&self, user_id: &str, num_steps: usize) -> Vec<MdpAction> {
        self.recommender.get_learning_path_recommendation(user_id, num_steps)
    }

    pub fn cleanup_stale_users(&self, max_age: chrono::Duration) -> usize {
        self.tracker.cleanup_stale(max_age) + self.recommender.cleanup_stale(max_age)
    }

    /// (learning curves, learner states) currently held.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.tracker.curve_count(), self.recommender.state_count())
    }

    fn progress_curve(&self, user_id: &str, concept: &str) -> CurveAnalysis {
        if self.config.feature_flags.learning_curves_enabled {
            self.tracker.get_learning_curve_analysis(user_id, concept)
        } else {
            CurveAnalysis::NoData {
                concept: concept.to_string(),
                message: "Learning curve tracking is disabled".to_string(),
            }
        }
    }

    fn record(&self, user_id: &str, concept: &str, observation: &Observation) -> LearningPoint {
        let timestamp = observation.timestamp.unwrap_or_else(Utc::now);
        self.tracker.record_observation_at(
            user_id,
            concept,
            observation.performance,
            observation.time_spent,
            observation.attempts,
            observation.engagement,
            timestamp,
        )
    }
}

impl Default for AdaptiveEngine {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
