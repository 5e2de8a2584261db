use crate::adaptive::types::{LearningPoint, StruggleType};

/// Failure modes visible in a single observation. Several can fire at once.
pub fn detect_struggles(performance: f64, time_spent: u32, attempts: u32, engagement: f64) -> Vec<StruggleType> {
    let mut struggles = Vec::new();

    // low score despite a long session
    if performance < 0.5 && time_spent > 30 {
        struggles.push(StruggleType::Conceptual);
    }
    if attempts > 3 && performance < 0.6 {
        struggles.push(StruggleType::Procedural);
    }
    if performance < 0.4 {
        struggles.push(StruggleType::Application);
    }
    if performance < 0.3 {
        struggles.push(StruggleType::Retention);
    }
    if engagement < 0.3 {
        struggles.push(StruggleType::Engagement);
    }

    struggles
}

/// Share of all possible struggle tags raised across `points`, in [0, 1].
pub fn struggle_severity<'a>(points: impl IntoIterator<Item = &'a LearningPoint>) -> f64 {
    let (count, total) = points.into_iter().fold((0usize, 0usize), |(count, total), point| {
        (count + 1, total + point.struggle_indicators.len())
    });

    let max_possible = count * StruggleType::ALL.len();
    if max_possible == 0 {
        return 0.0;
    }

    (total as f64 / max_possible as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::types::DifficultyLevel;
    use chrono::Utc;

    fn point(indicators: Vec<StruggleType>) -> LearningPoint {
        LearningPoint {
            timestamp: Utc::now(),
            concept: "algebra".to_string(),
            difficulty: DifficultyLevel::Medium,
            performance: 0.5,
            time_spent: 10,
            attempts: 1,
            engagement: 0.5,
            struggle_indicators: indicators,
        }
    }

    #[test]
    fn test_all_struggles_fire_together() {
        let found = detect_struggles(0.2, 60, 4, 0.2);
        assert_eq!(found, StruggleType::ALL.to_vec());
    }

    #[test]
    fn test_no_struggles_for_strong_attempt() {
        assert!(detect_struggles(0.9, 45, 1, 0.9).is_empty());
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert!(detect_struggles(0.5, 31, 1, 0.9).is_empty());
        assert_eq!(detect_struggles(0.49, 30, 1, 0.9), Vec::<StruggleType>::new());
        assert_eq!(detect_struggles(0.59, 10, 4, 0.9), vec![StruggleType::Procedural]);
        assert_eq!(detect_struggles(0.9, 10, 1, 0.29), vec![StruggleType::Engagement]);
    }

    #[test]
    fn test_severity() {
        assert_eq!(struggle_severity(std::iter::empty()), 0.0);
        let points = vec![point(StruggleType::ALL.to_vec()), point(vec![])];
        assert!((struggle_severity(&points) - 0.5).abs() < 1e-12);
    }
}
