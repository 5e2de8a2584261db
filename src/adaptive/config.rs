use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendParams {
    pub window_size: usize,
    pub min_points: usize,
    pub up_threshold: f64,
    pub down_threshold: f64,
    pub volatility_threshold: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_points: 3,
            up_threshold: 0.05,
            down_threshold: -0.05,
            volatility_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerParams {
    pub history_limit: usize,
    pub recent_window: usize,
    pub alert_window: usize,
    pub full_confidence_points: f64,
    pub recency_hours: i64,
    pub stale_recency_confidence: f64,
    pub default_confidence: f64,
    pub struggle_down_threshold: f64,
    pub step_up_performance: f64,
    pub step_up_engagement: f64,
    pub plateau_performance: f64,
    pub trend: TrendParams,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            history_limit: 50,
            recent_window: 5,
            alert_window: 3,
            full_confidence_points: 20.0,
            recency_hours: 24,
            stale_recency_confidence: 0.7,
            default_confidence: 0.5,
            struggle_down_threshold: 0.7,
            step_up_performance: 0.8,
            step_up_engagement: 0.7,
            plateau_performance: 0.6,
            trend: TrendParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedOutcome {
    pub performance: f64,
    pub engagement_change: f64,
    pub fatigue_change: f64,
    pub reward: f64,
}

impl Default for SimulatedOutcome {
    fn default() -> Self {
        Self {
            performance: 0.7,
            engagement_change: 0.05,
            fatigue_change: 0.1,
            reward: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdpParams {
    pub discount: f64,
    pub proficiency_weight: f64,
    pub engagement_weight: f64,
    pub fatigue_penalty: f64,
    pub proficiency_step: f64,
    pub performance_history: usize,
    pub break_fatigue_threshold: f64,
    pub short_session_minutes: u32,
    pub default_time_available: u32,
    pub transition_nudge: f64,
    pub reward_smoothing: f64,
    pub simulated: SimulatedOutcome,
}

impl Default for MdpParams {
    fn default() -> Self {
        Self {
            discount: 0.9,
            proficiency_weight: 2.0,
            engagement_weight: 1.5,
            fatigue_penalty: 1.0,
            proficiency_step: 0.1,
            performance_history: 10,
            break_fatigue_threshold: 0.7,
            short_session_minutes: 15,
            default_time_available: 30,
            transition_nudge: 0.01,
            reward_smoothing: 0.9,
            simulated: SimulatedOutcome::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreParams {
    pub capacity: usize,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self { capacity: 100_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub learning_curves_enabled: bool,
    pub mdp_recommendations_enabled: bool,
    pub strict_inputs: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            learning_curves_enabled: true,
            mdp_recommendations_enabled: true,
            strict_inputs: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    pub tracker: TrackerParams,
    pub mdp: MdpParams,
    pub store: StoreParams,
    pub feature_flags: FeatureFlags,
}

impl AdaptiveConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TUTOR_LEARNING_CURVES_ENABLED") {
            config.feature_flags.learning_curves_enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("TUTOR_MDP_ENABLED") {
            config.feature_flags.mdp_recommendations_enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("TUTOR_STRICT_INPUTS") {
            config.feature_flags.strict_inputs = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("TUTOR_STORE_CAPACITY") {
            if let Some(capacity) = val.parse::<usize>().ok().filter(|c| *c > 0) {
                config.store.capacity = capacity;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_SESSION_MINUTES") {
            if let Ok(minutes) = val.parse::<u32>() {
                config.mdp.default_time_available = minutes;
            }
        }

        config
    }
}
