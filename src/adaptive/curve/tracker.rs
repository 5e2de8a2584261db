use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::adaptive::config::{StoreParams, TrackerParams};
use crate::adaptive::curve::struggle::{detect_struggles, struggle_severity};
use crate::adaptive::curve::trend::{mean, std_dev, trailing, TrendAnalyzer};
use crate::adaptive::store::KeyedStore;
use crate::adaptive::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurveKey {
    pub user_id: String,
    pub concept: String,
}

impl CurveKey {
    pub fn new(user_id: &str, concept: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            concept: concept.to_string(),
        }
    }
}

/// Per-(user, concept) learning curves.
///
/// Performance and engagement are taken as given: values outside [0, 1] flow
/// into the trend and severity math unchanged. Callers clamp.
pub struct LearningCurveTracker {
    params: TrackerParams,
    trend: TrendAnalyzer,
    curves: KeyedStore<CurveKey, LearningCurve>,
}

impl LearningCurveTracker {
    pub fn new(params: TrackerParams, store: &StoreParams) -> Self {
        Self {
            trend: TrendAnalyzer::new(params.trend.clone()),
            params,
            curves: KeyedStore::new(store.capacity),
        }
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
        self.record_observation_at(user_id, concept, performance, time_spent, attempts, engagement, Utc::now())
    }

    /// Same as [`record_observation`](Self::record_observation) with the
    /// point stamped at `timestamp` instead of the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn record_observation_at(
        &self,
        user_id: &str,
        concept: &str,
        performance: f64,
        time_spent: u32,
        attempts: u32,
        engagement: f64,
        timestamp: DateTime<Utc>,
    ) -> LearningPoint {
        let point = LearningPoint {
            timestamp,
            concept: concept.to_string(),
            difficulty: DifficultyLevel::from_performance(performance),
            performance,
            time_spent,
            attempts,
            engagement,
            struggle_indicators: detect_struggles(performance, time_spent, attempts, engagement),
        };

        let key = CurveKey::new(user_id, concept);
        let (len, trend, recommended) = self.curves.update(
            &key,
            || LearningCurve::new(concept, self.params.default_confidence, Utc::now()),
            |curve| {
                curve.data_points.push_back(point.clone());
                while curve.data_points.len() > self.params.history_limit {
                    curve.data_points.pop_front();
                }
                self.analyze(curve);
                (curve.data_points.len(), curve.trend, curve.recommended_difficulty)
            },
        );

        tracing::debug!(
            user_id = %user_id,
            concept = %concept,
            performance,
            points = len,
            trend = trend.as_str(),
            recommended = recommended.as_str(),
            struggles = point.struggle_indicators.len(),
            "learning point recorded"
        );

        point
    }

    pub fn get_learning_curve_analysis(&self, user_id: &str, concept: &str) -> CurveAnalysis {
        let key = CurveKey::new(user_id, concept);
        self.curves
            .read(&key, |curve| CurveAnalysis::Analyzed(self.build_report(curve)))
            .unwrap_or_else(|| CurveAnalysis::NoData {
                concept: concept.to_string(),
                message: "No learning data available for this concept".to_string(),
            })
    }

    pub fn get_difficulty_adjustment(&self, user_id: &str, concept: &str) -> DifficultyAdjustment {
        let key = CurveKey::new(user_id, concept);
        self.curves
            .read(&key, |curve| {
                if curve.data_points.len() < self.params.trend.min_points {
                    return None;
                }

                let adjustment = if curve.current_difficulty != curve.recommended_difficulty {
                    let performances: Vec<f64> = curve.recent(3).map(|p| p.performance).collect();
                    DifficultyAdjustment {
                        adjustment: AdjustmentKind::Change,
                        new_difficulty: curve.recommended_difficulty,
                        confidence: curve.confidence,
                        reason: format!(
                            "Learning curve analysis suggests {} difficulty",
                            curve.recommended_difficulty.as_str()
                        ),
                        trend: Some(curve.trend),
                        performance: Some(mean(&performances)),
                    }
                } else {
                    DifficultyAdjustment {
                        adjustment: AdjustmentKind::Maintain,
                        new_difficulty: curve.current_difficulty,
                        confidence: curve.confidence,
                        reason: "Current difficulty is appropriate".to_string(),
                        trend: Some(curve.trend),
                        performance: None,
                    }
                };
                Some(adjustment)
            })
            .flatten()
            .unwrap_or_else(|| DifficultyAdjustment {
                adjustment: AdjustmentKind::Maintain,
                new_difficulty: DifficultyLevel::Medium,
                confidence: self.params.default_confidence,
                reason: "Insufficient data for adjustment".to_string(),
                trend: None,
                performance: None,
            })
    }

    pub fn get_struggle_alerts(&self, user_id: &str, concept: &str) -> Vec<StruggleAlert> {
        let key = CurveKey::new(user_id, concept);
        self.curves
            .read(&key, |curve| {
                curve
                    .recent(self.params.alert_window)
                    .flat_map(|point| {
                        let severity = if point.performance < 0.3 {
                            AlertSeverity::High
                        } else {
                            AlertSeverity::Medium
                        };
                        point.struggle_indicators.iter().map(move |kind| StruggleAlert {
                            kind: *kind,
                            severity,
                            timestamp: point.timestamp,
                            concept: concept.to_string(),
                            suggestion: kind.suggestion().to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adopts the recommended level as the curve's current level and
    /// re-derives the recommendation from there.
    pub fn apply_difficulty_adjustment(&self, user_id: &str, concept: &str) -> Option<DifficultyLevel> {
        let key = CurveKey::new(user_id, concept);
        self.curves.update_existing(&key, |curve| {
            let previous = curve.current_difficulty;
            curve.current_difficulty = curve.recommended_difficulty;
            self.analyze(curve);
            if previous != curve.current_difficulty {
                tracing::info!(
                    user_id = %user_id,
                    concept = %concept,
                    from = previous.as_str(),
                    to = curve.current_difficulty.as_str(),
                    "difficulty adjusted"
                );
            }
            curve.current_difficulty
        })
    }

    pub fn curve(&self, user_id: &str, concept: &str) -> Option<LearningCurve> {
        self.curves.read(&CurveKey::new(user_id, concept), LearningCurve::clone)
    }

    pub fn cleanup_stale(&self, max_age: chrono::Duration) -> usize {
        self.curves.cleanup_stale(max_age)
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    fn analyze(&self, curve: &mut LearningCurve) {
        if curve.data_points.len() < self.params.trend.min_points {
            return;
        }

        let performances: Vec<f64> = curve.data_points.iter().map(|p| p.performance).collect();
        let now = Utc::now();

        curve.trend = self.trend.classify(&performances);
        curve.confidence = compute_confidence(&self.params, &curve.data_points, now);
        curve.recommended_difficulty = recommend_difficulty(
            &self.params,
            curve.current_difficulty,
            curve.trend,
            curve.recent(self.params.recent_window),
        );
        curve.last_updated = now;
    }

    fn build_report(&self, curve: &LearningCurve) -> CurveReport {
        let recent: Vec<&LearningPoint> = curve.recent(self.params.recent_window).collect();
        let performances: Vec<f64> = recent.iter().map(|p| p.performance).collect();
        let engagements: Vec<f64> = recent.iter().map(|p| p.engagement).collect();

        let mut struggle_indicators = BTreeMap::new();
        for kind in recent.iter().flat_map(|p| p.struggle_indicators.iter()) {
            *struggle_indicators.entry(*kind).or_insert(0) += 1;
        }

        CurveReport {
            concept: curve.concept.clone(),
            trend: curve.trend,
            confidence: curve.confidence,
            current_difficulty: curve.current_difficulty,
            recommended_difficulty: curve.recommended_difficulty,
            recent_performance: round2(mean(&performances)),
            avg_engagement: round2(mean(&engagements)),
            total_time_minutes: curve.data_points.iter().map(|p| u64::from(p.time_spent)).sum(),
            total_attempts: curve.data_points.iter().map(|p| u64::from(p.attempts)).sum(),
            data_points: curve.data_points.len(),
            struggle_indicators,
            last_updated: curve.last_updated,
            recommendations: self.curve_recommendations(curve),
        }
    }

    fn curve_recommendations(&self, curve: &LearningCurve) -> Vec<String> {
        let mut recommendations: Vec<&str> = match curve.trend {
            CurveTrend::Declining => vec![
                "Consider reviewing foundational concepts",
                "Reduce difficulty level to rebuild confidence",
            ],
            CurveTrend::Plateauing => vec![
                "Try different learning approaches or resources",
                "Consider increasing difficulty gradually",
            ],
            CurveTrend::Volatile => vec![
                "Focus on consistent practice and review",
                "Identify specific areas of confusion",
            ],
            CurveTrend::Improving => vec![
                "Continue with current approach",
                "Consider advancing to next difficulty level",
            ],
        };

        let seen = |kind: StruggleType| {
            curve
                .recent(self.params.alert_window)
                .any(|p| p.struggle_indicators.contains(&kind))
        };
        if seen(StruggleType::Conceptual) {
            recommendations.push("Use visual aids and analogies for conceptual understanding");
        }
        if seen(StruggleType::Procedural) {
            recommendations.push("Practice step-by-step procedures with guided examples");
        }
        if seen(StruggleType::Application) {
            recommendations.push("Focus on real-world applications and practice problems");
        }
        if seen(StruggleType::Engagement) {
            recommendations.push("Try gamification or interactive learning methods");
        }

        recommendations.truncate(5);
        recommendations.into_iter().map(str::to_string).collect()
    }
}

impl Default for LearningCurveTracker {
    fn default() -> Self {
        Self::new(TrackerParams::default(), &StoreParams::default())
    }
}

/// Mean of data-volume, consistency and recency confidence, in [0, 1].
pub fn compute_confidence(params: &TrackerParams, points: &VecDeque<LearningPoint>, now: DateTime<Utc>) -> f64 {
    let Some(last) = points.back() else {
        return params.default_confidence;
    };

    let volume = (points.len() as f64 / params.full_confidence_points).min(1.0);

    let performances: Vec<f64> = points.iter().map(|p| p.performance).collect();
    let consistency = (1.0 - std_dev(trailing(&performances, params.trend.window_size))).max(0.0);

    let recency = if last.timestamp > now - chrono::Duration::hours(params.recency_hours) {
        1.0
    } else {
        params.stale_recency_confidence
    };

    ((volume + consistency + recency) / 3.0).clamp(0.0, 1.0)
}

/// Steps `current` by at most one level. Heavy struggle is checked first and
/// always wins over strong performance.
pub fn recommend_difficulty<'a>(
    params: &TrackerParams,
    current: DifficultyLevel,
    trend: CurveTrend,
    recent: impl IntoIterator<Item = &'a LearningPoint>,
) -> DifficultyLevel {
    let recent: Vec<&LearningPoint> = recent.into_iter().collect();
    if recent.is_empty() {
        return current;
    }

    let performances: Vec<f64> = recent.iter().map(|p| p.performance).collect();
    let engagements: Vec<f64> = recent.iter().map(|p| p.engagement).collect();
    let avg_performance = mean(&performances);
    let avg_engagement = mean(&engagements);

    if struggle_severity(recent.iter().copied()) > params.struggle_down_threshold {
        current.easier()
    } else if avg_performance > params.step_up_performance && avg_engagement > params.step_up_engagement {
        current.harder()
    } else if trend == CurveTrend::Plateauing && avg_performance > params.plateau_performance {
        match current {
            DifficultyLevel::Easy | DifficultyLevel::Medium => current.harder(),
            other => other,
        }
    } else {
        current
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
