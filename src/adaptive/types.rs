use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    VeryEasy,
    Easy,
    #[default]
    Medium,
    Hard,
    VeryHard,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryEasy => "very_easy",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very_hard",
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::VeryEasy => Self::Easy,
            Self::Easy => Self::Medium,
            Self::Medium => Self::Hard,
            Self::Hard | Self::VeryHard => Self::VeryHard,
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::VeryHard => Self::Hard,
            Self::Hard => Self::Medium,
            Self::Medium => Self::Easy,
            Self::Easy | Self::VeryEasy => Self::VeryEasy,
        }
    }

    /// Level a single attempt demonstrates, judged by its score alone.
    pub fn from_performance(performance: f64) -> Self {
        if performance >= 0.9 {
            Self::VeryHard
        } else if performance >= 0.8 {
            Self::Hard
        } else if performance >= 0.6 {
            Self::Medium
        } else if performance >= 0.4 {
            Self::Easy
        } else {
            Self::VeryEasy
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveTrend {
    #[default]
    Improving,
    Plateauing,
    Declining,
    Volatile,
}

impl CurveTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Plateauing => "plateauing",
            Self::Declining => "declining",
            Self::Volatile => "volatile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StruggleType {
    Conceptual,
    Procedural,
    Application,
    Retention,
    Engagement,
}

impl StruggleType {
    pub const ALL: [StruggleType; 5] = [
        Self::Conceptual,
        Self::Procedural,
        Self::Application,
        Self::Retention,
        Self::Engagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conceptual => "conceptual",
            Self::Procedural => "procedural",
            Self::Application => "application",
            Self::Retention => "retention",
            Self::Engagement => "engagement",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Conceptual => "Use visual diagrams and step-by-step explanations",
            Self::Procedural => "Practice with guided examples and checklists",
            Self::Application => "Work through real-world examples and case studies",
            Self::Retention => "Use spaced repetition and regular review sessions",
            Self::Engagement => "Try interactive activities and gamification elements",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPoint {
    pub timestamp: DateTime<Utc>,
    pub concept: String,
    pub difficulty: DifficultyLevel,
    pub performance: f64,
    pub time_spent: u32,
    pub attempts: u32,
    pub engagement: f64,
    pub struggle_indicators: Vec<StruggleType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurve {
    pub concept: String,
    pub data_points: VecDeque<LearningPoint>,
    pub trend: CurveTrend,
    pub current_difficulty: DifficultyLevel,
    pub recommended_difficulty: DifficultyLevel,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
}

impl LearningCurve {
    pub fn new(concept: impl Into<String>, default_confidence: f64, now: DateTime<Utc>) -> Self {
        Self {
            concept: concept.into(),
            data_points: VecDeque::new(),
            trend: CurveTrend::Improving,
            current_difficulty: DifficultyLevel::Medium,
            recommended_difficulty: DifficultyLevel::Medium,
            confidence: default_confidence,
            last_updated: now,
        }
    }

    /// The newest `n` points, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LearningPoint> {
        let skip = self.data_points.len().saturating_sub(n);
        self.data_points.iter().skip(skip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Change,
    Maintain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyAdjustment {
    pub adjustment: AdjustmentKind,
    pub new_difficulty: DifficultyLevel,
    pub confidence: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<CurveTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StruggleAlert {
    #[serde(rename = "type")]
    pub kind: StruggleType,
    pub severity: AlertSeverity,
    pub timestamp: DateTime<Utc>,
    pub concept: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveReport {
    pub concept: String,
    pub trend: CurveTrend,
    pub confidence: f64,
    pub current_difficulty: DifficultyLevel,
    pub recommended_difficulty: DifficultyLevel,
    pub recent_performance: f64,
    pub avg_engagement: f64,
    pub total_time_minutes: u64,
    pub total_attempts: u64,
    pub data_points: usize,
    pub struggle_indicators: BTreeMap<StruggleType, usize>,
    pub last_updated: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurveAnalysis {
    NoData { concept: String, message: String },
    Analyzed(CurveReport),
}

impl CurveAnalysis {
    pub fn report(&self) -> Option<&CurveReport> {
        match self {
            Self::Analyzed(report) => Some(report),
            Self::NoData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningState {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl LearningState {
    pub const ALL: [LearningState; 4] = [
        Self::Beginner,
        Self::Intermediate,
        Self::Advanced,
        Self::Expert,
    ];

    pub fn from_proficiency(proficiency: f64) -> Self {
        if proficiency < 0.25 {
            Self::Beginner
        } else if proficiency < 0.5 {
            Self::Intermediate
        } else if proficiency < 0.75 {
            Self::Advanced
        } else {
            Self::Expert
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Beginner => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
            Self::Expert => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    EasyLesson,
    MediumLesson,
    HardLesson,
    Review,
    Practice,
    Assessment,
    Break,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EasyLesson => "easy_lesson",
            Self::MediumLesson => "medium_lesson",
            Self::HardLesson => "hard_lesson",
            Self::Review => "review",
            Self::Practice => "practice",
            Self::Assessment => "assessment",
            Self::Break => "break",
        }
    }

    pub fn base_reward(&self) -> f64 {
        match self {
            Self::EasyLesson => 2.0,
            Self::MediumLesson => 3.0,
            Self::HardLesson => 4.0,
            Self::Review => 1.5,
            Self::Practice => 2.5,
            Self::Assessment => 3.0,
            Self::Break => 0.5,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        match self {
            Self::EasyLesson => 20,
            Self::MediumLesson => 30,
            Self::HardLesson => 45,
            Self::Review => 15,
            Self::Practice => 25,
            Self::Assessment => 20,
            Self::Break => 10,
        }
    }

    pub fn difficulty_label(&self) -> &'static str {
        match self {
            Self::EasyLesson => "easy",
            Self::MediumLesson => "medium",
            Self::HardLesson => "hard",
            Self::Review => "review",
            Self::Practice => "practice",
            Self::Assessment => "assessment",
            Self::Break => "break",
        }
    }

    pub fn expected_outcome(&self) -> &'static str {
        match self {
            Self::EasyLesson => "Build confidence with manageable content",
            Self::MediumLesson => "Challenge yourself with moderate difficulty",
            Self::HardLesson => "Push your limits with advanced content",
            Self::Review => "Reinforce previous learning",
            Self::Practice => "Apply knowledge through exercises",
            Self::Assessment => "Test your understanding",
            Self::Break => "Rest and recharge",
        }
    }
}

/// Serialized with its derived `current_learning_state`, which is never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "MdpStateView")]
pub struct MdpState {
    pub user_id: String,
    pub proficiency_level: f64,
    pub engagement_level: f64,
    pub fatigue_level: f64,
    pub recent_performance: VecDeque<f64>,
    pub learning_style: String,
    pub time_available: u32,
    pub session_count: u32,
}

#[derive(Serialize)]
struct MdpStateView {
    user_id: String,
    proficiency_level: f64,
    engagement_level: f64,
    fatigue_level: f64,
    recent_performance: VecDeque<f64>,
    learning_style: String,
    time_available: u32,
    session_count: u32,
    current_learning_state: LearningState,
}

impl From<MdpState> for MdpStateView {
    fn from(state: MdpState) -> Self {
        let current_learning_state = state.current_learning_state();
        Self {
            user_id: state.user_id,
            proficiency_level: state.proficiency_level,
            engagement_level: state.engagement_level,
            fatigue_level: state.fatigue_level,
            recent_performance: state.recent_performance,
            learning_style: state.learning_style,
            time_available: state.time_available,
            session_count: state.session_count,
            current_learning_state,
        }
    }
}

impl MdpState {
    pub fn new(user_id: impl Into<String>, learning_style: impl Into<String>, time_available: u32) -> Self {
        Self {
            user_id: user_id.into(),
            proficiency_level: 0.0,
            engagement_level: 0.5,
            fatigue_level: 0.0,
            recent_performance: VecDeque::new(),
            learning_style: learning_style.into(),
            time_available,
            session_count: 0,
        }
    }

    /// Always the bucket of `proficiency_level`; never stored separately.
    pub fn current_learning_state(&self) -> LearningState {
        LearningState::from_proficiency(self.proficiency_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdpAction {
    pub action_type: ActionType,
    pub lesson_id: Option<String>,
    pub difficulty: String,
    pub duration: u32,
    pub expected_outcome: String,
}

impl MdpAction {
    pub fn new(action_type: ActionType, lesson_id: Option<String>) -> Self {
        Self {
            action_type,
            lesson_id,
            difficulty: action_type.difficulty_label().to_string(),
            duration: action_type.duration_minutes(),
            expected_outcome: action_type.expected_outcome().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendContext {
    pub time_available: Option<u32>,
    pub learning_style: Option<String>,
    pub lesson_id: Option<String>,
}

impl RecommendContext {
    /// Reads the known keys from a loosely typed map; anything missing or
    /// of the wrong shape is left unset.
    pub fn from_value(value: &Value) -> Self {
        Self {
            time_available: value
                .get("time_available")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok()),
            learning_style: value
                .get("learning_style")
                .and_then(Value::as_str)
                .map(str::to_string),
            lesson_id: value
                .get("lesson_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Outcome {
    pub performance: f64,
    pub engagement_change: f64,
    pub fatigue_change: f64,
}

impl Default for Outcome {
    fn default() -> Self {
        Self {
            performance: 0.5,
            engagement_change: 0.0,
            fatigue_change: 0.1,
        }
    }
}

impl Outcome {
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let field = |key: &str, fallback: f64| value.get(key).and_then(Value::as_f64).unwrap_or(fallback);
        Self {
            performance: field("performance", defaults.performance),
            engagement_change: field("engagement_change", defaults.engagement_change),
            fatigue_change: field("fatigue_change", defaults.fatigue_change),
        }
    }
}
