use crate::adaptive::config::TrendParams;
use crate::adaptive::types::CurveTrend;

pub struct TrendAnalyzer {
    params: TrendParams,
}

impl TrendAnalyzer {
    pub fn new(params: TrendParams) -> Self {
        Self { params }
    }

    /// Classifies the trailing window of `performances` (oldest first).
    /// Volatility outranks slope.
    pub fn classify(&self, performances: &[f64]) -> CurveTrend {
        if performances.len() < self.params.min_points {
            return CurveTrend::Improving;
        }

        let window = trailing(performances, self.params.window_size);
        let slope = compute_slope(window);
        let volatility = std_dev(window);

        if volatility > self.params.volatility_threshold {
            CurveTrend::Volatile
        } else if slope > self.params.up_threshold {
            CurveTrend::Improving
        } else if slope < self.params.down_threshold {
            CurveTrend::Declining
        } else {
            CurveTrend::Plateauing
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(TrendParams::default())
    }
}

pub fn trailing(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Least-squares slope of `values` against their index.
pub fn compute_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * sum_xx - sum_x.powi(2);
    if denominator.abs() < 1e-10 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = mean(values);
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
