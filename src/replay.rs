//! Line-delimited JSON front end for [`AdaptiveEngine`].
//!
//! Each input line is one request tagged by `op`; each request produces
//! exactly one response line, `{"ok": true, "op": ..., "result": ...}` or
//! `{"ok": false, "error": ...}`. A bad line never stops the stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::adaptive::engine::{ActivityOutcome, Observation};
use crate::adaptive::{ActionType, AdaptiveEngine, AdaptiveError, MdpAction, Outcome, RecommendContext};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayRequest {
    Observe {
        user_id: String,
        concept: String,
        performance: f64,
        time_spent: u32,
        attempts: u32,
        engagement: f64,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    Recommend {
        user_id: String,
        #[serde(default)]
        context: Value,
    },
    Feedback {
        user_id: String,
        action: ActionSpec,
        #[serde(default)]
        outcome: Value,
        reward: f64,
    },
    Complete {
        user_id: String,
        concept: String,
        action: ActionSpec,
        outcome: ActivityOutcome,
        reward: f64,
    },
    Path {
        user_id: String,
        #[serde(default = "default_path_steps")]
        num_steps: usize,
    },
    Analysis {
        user_id: String,
        concept: String,
    },
    Adjustment {
        user_id: String,
        concept: String,
    },
    ApplyAdjustment {
        user_id: String,
        concept: String,
    },
    Alerts {
        user_id: String,
        concept: String,
    },
    Report {
        user_id: String,
        concept: String,
        #[serde(default)]
        context: Value,
    },
    NextSteps {
        user_id: String,
        concept: String,
    },
}

/// Action as sent by a client: only the type is required, the rest is
/// filled from the action catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSpec {
    pub action_type: ActionType,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl ActionSpec {
    pub fn into_action(self) -> MdpAction {
        let mut action = MdpAction::new(self.action_type, self.lesson_id);
        if let Some(duration) = self.duration {
            action.duration = duration;
        }
        action
    }
}

fn default_path_steps() -> usize {
    5
}

impl ReplayRequest {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Observe { .. } => "observe",
            Self::Recommend { .. } => "recommend",
            Self::Feedback { .. } => "feedback",
            Self::Complete { .. } => "complete",
            Self::Path { .. } => "path",
            Self::Analysis { .. } => "analysis",
            Self::Adjustment { .. } => "adjustment",
            Self::ApplyAdjustment { .. } => "apply_adjustment",
            Self::Alerts { .. } => "alerts",
            Self::Report { .. } => "report",
            Self::NextSteps { .. } => "next_steps",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Adaptive(#[from] AdaptiveError),
}

pub async fn replay<R, W>(engine: &AdaptiveEngine, reader: R, mut writer: W) -> Result<ReplayStats, ReplayError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = ReplayStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.processed += 1;

        let response = match serde_json::from_str::<ReplayRequest>(line) {
            Ok(request) => {
                let op = request.op();
                match handle(engine, request) {
                    Ok(result) => json!({ "ok": true, "op": op, "result": result }),
                    Err(e) => {
                        stats.failed += 1;
                        warn!(op, error = %e, "request failed");
                        json!({ "ok": false, "op": op, "error": e.to_string() })
                    }
                }
            }
            Err(e) => {
                stats.failed += 1;
                warn!(error = %e, "malformed request line");
                json!({ "ok": false, "error": ReplayError::Json(e).to_string() })
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }

    writer.flush().await?;
    debug!(processed = stats.processed, failed = stats.failed, "replay finished");
    Ok(stats)
}

pub fn handle(engine: &AdaptiveEngine, request: ReplayRequest) -> Result<Value, ReplayError> {
    let value = match request {
        ReplayRequest::Observe {
            user_id,
            concept,
            performance,
            time_spent,
            attempts,
            engagement,
            timestamp,
        } => {
            let observation = Observation {
                performance,
                time_spent,
                attempts,
                engagement,
                timestamp,
            };
            serde_json::to_value(engine.observe(&user_id, &concept, &observation)?)?
        }
        ReplayRequest::Recommend { user_id, context } => {
            let context = RecommendContext::from_value(&context);
            serde_json::to_value(engine.recommend_action(&user_id, &context))?
        }
        ReplayRequest::Feedback {
            user_id,
            action,
            outcome,
            reward,
        } => {
            let outcome = Outcome::from_value(&outcome);
            let action = action.into_action();
            serde_json::to_value(engine.update_from_feedback(&user_id, &action, &outcome, reward))?
        }
        ReplayRequest::Complete {
            user_id,
            concept,
            action,
            outcome,
            reward,
        } => {
            let action = action.into_action();
            serde_json::to_value(engine.complete_action(&user_id, &concept, &action, &outcome, reward)?)?
        }
        ReplayRequest::Path { user_id, num_steps } => {
            serde_json::to_value(engine.get_learning_path_recommendation(&user_id, num_steps))?
        }
        ReplayRequest::Analysis { user_id, concept } => {
            serde_json::to_value(engine.get_learning_curve_analysis(&user_id, &concept))?
        }
        ReplayRequest::Adjustment { user_id, concept } => {
            serde_json::to_value(engine.get_difficulty_adjustment(&user_id, &concept))?
        }
        ReplayRequest::ApplyAdjustment { user_id, concept } => {
            serde_json::to_value(engine.apply_difficulty_adjustment(&user_id, &concept))?
        }
        ReplayRequest::Alerts { user_id, concept } => {
            serde_json::to_value(engine.get_struggle_alerts(&user_id, &concept))?
        }
        ReplayRequest::Report {
            user_id,
            concept,
            context,
        } => {
            let context = RecommendContext::from_value(&context);
            serde_json::to_value(engine.progress_report(&user_id, &concept, &context))?
        }
        ReplayRequest::NextSteps { user_id, concept } => {
            serde_json::to_value(engine.next_steps(&user_id, &concept))?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parsing() {
        let request: ReplayRequest =
            serde_json::from_str(r#"{"op":"path","user_id":"u1"}"#).unwrap();
        match request {
            ReplayRequest::Path { user_id, num_steps } => {
                assert_eq!(user_id, "u1");
                assert_eq!(num_steps, 5);
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let request: ReplayRequest =
            serde_json::from_str(r#"{"op":"next_steps","user_id":"u1","concept":"algebra"}"#).unwrap();
        assert_eq!(request.op(), "next_steps");
    }

    #[test]
    fn test_action_spec_fills_catalogue_fields() {
        let spec: ActionSpec = serde_json::from_str(r#"{"action_type":"hard_lesson"}"#).unwrap();
        let action = spec.into_action();
        assert_eq!(action.duration, 45);
        assert_eq!(action.difficulty, "hard");

        let spec: ActionSpec = serde_json::from_str(r#"{"action_type":"review","duration":5}"#).unwrap();
        assert_eq!(spec.into_action().duration, 5);
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(serde_json::from_str::<ReplayRequest>(r#"{"op":"teleport","user_id":"u1"}"#).is_err());
    }

    #[test]
    fn test_recommend_without_context() {
        let engine = AdaptiveEngine::default();
        let value = handle(
            &engine,
            ReplayRequest::Recommend {
                user_id: "u1".to_string(),
                context: Value::Null,
            },
        )
        .unwrap();
        assert_eq!(value["action_type"], "easy_lesson");
    }
}
