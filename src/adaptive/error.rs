#[derive(Debug, thiserror::Error)]
pub enum AdaptiveError {
    #[error("invalid observation: {field} = {value} (expected {expected})")]
    InvalidObservation {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}
