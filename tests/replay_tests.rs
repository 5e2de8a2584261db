//! NDJSON replay over in-memory streams.

use serde_json::Value;
use tokio::io::BufReader;

use adaptive_tutor::adaptive::config::{AdaptiveConfig, FeatureFlags};
use adaptive_tutor::adaptive::AdaptiveEngine;
use adaptive_tutor::replay::{replay, ReplayStats};

async fn run(engine: &AdaptiveEngine, input: &str) -> (ReplayStats, Vec<Value>) {
    let reader = BufReader::new(input.as_bytes());
    let mut output = Vec::new();
    let stats = replay(engine, reader, &mut output).await.unwrap();

    let lines = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (stats, lines)
}

#[tokio::test]
async fn test_session_round() {
    let engine = AdaptiveEngine::default();
    let input = r#"
{"op":"observe","user_id":"u1","concept":"algebra","performance":0.7,"time_spent":30,"attempts":1,"engagement":0.8}
{"op":"observe","user_id":"u1","concept":"algebra","performance":0.8,"time_spent":30,"attempts":1,"engagement":0.8}
{"op":"observe","user_id":"u1","concept":"algebra","performance":0.85,"time_spent":30,"attempts":1,"engagement":0.8}
{"op":"observe","user_id":"u1","concept":"algebra","performance":0.9,"time_spent":30,"attempts":1,"engagement":0.8}
{"op":"observe","user_id":"u1","concept":"algebra","performance":0.95,"time_spent":30,"attempts":1,"engagement":0.8}
{"op":"analysis","user_id":"u1","concept":"algebra"}
{"op":"adjustment","user_id":"u1","concept":"algebra"}
{"op":"recommend","user_id":"u1","context":{"time_available":10,"lesson_id":"l-1"}}
{"op":"feedback","user_id":"u1","action":{"action_type":"review"},"outcome":{"performance":1.0,"engagement_change":0.2},"reward":4.0}
"#;

    let (stats, lines) = run(&engine, input).await;
    assert_eq!(stats, ReplayStats { processed: 9, failed: 0 });
    assert_eq!(lines.len(), 9);
    assert!(lines.iter().all(|line| line["ok"] == true));

    let analysis = &lines[5]["result"];
    assert_eq!(analysis["status"], "analyzed");
    assert_eq!(analysis["trend"], "improving");
    assert_eq!(analysis["recommended_difficulty"], "hard");

    let adjustment = &lines[6]["result"];
    assert_eq!(adjustment["adjustment"], "change");
    assert_eq!(adjustment["new_difficulty"], "hard");

    let action = &lines[7]["result"];
    assert_eq!(action["action_type"], "review");
    assert_eq!(action["lesson_id"], "l-1");

    let state = &lines[8]["result"];
    assert_eq!(state["time_available"], 0);
    assert_eq!(state["session_count"], 1);
    assert_eq!(state["fatigue_level"], 0.1);
    assert_eq!(state["current_learning_state"], "beginner");
}

#[tokio::test]
async fn test_complete_reports_learning_state() {
    let engine = AdaptiveEngine::default();
    let input = r#"{"op":"complete","user_id":"u5","concept":"algebra","action":{"action_type":"easy_lesson"},"outcome":{"performance":0.9,"time_spent":20,"attempts":1,"engagement":0.8},"reward":5.0}"#;

    let (stats, lines) = run(&engine, input).await;
    assert_eq!(stats.failed, 0);
    let result = &lines[0]["result"];
    assert_eq!(result["state"]["current_learning_state"], "beginner");
    assert_eq!(result["state"]["session_count"], 1);
    assert!(result["next_action"]["action_type"].is_string());
}

#[tokio::test]
async fn test_bad_lines_do_not_stop_the_stream() {
    let engine = AdaptiveEngine::default();
    let input = "not json\n{\"op\":\"teleport\"}\n\n{\"op\":\"path\",\"user_id\":\"u1\",\"num_steps\":3}\n";

    let (stats, lines) = run(&engine, input).await;
    assert_eq!(stats, ReplayStats { processed: 3, failed: 2 });
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["ok"], false);
    assert!(lines[0]["error"].as_str().unwrap().starts_with("json error"));
    assert_eq!(lines[1]["ok"], false);
    assert_eq!(lines[2]["ok"], true);
    assert_eq!(lines[2]["result"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_strict_mode_reports_rejection() {
    let engine = AdaptiveEngine::new(AdaptiveConfig {
        feature_flags: FeatureFlags {
            strict_inputs: true,
            ..Default::default()
        },
        ..Default::default()
    });
    let input = r#"{"op":"observe","user_id":"u1","concept":"algebra","performance":1.5,"time_spent":30,"attempts":1,"engagement":0.8}"#;

    let (stats, lines) = run(&engine, input).await;
    assert_eq!(stats.failed, 1);
    assert_eq!(lines[0]["ok"], false);
    assert_eq!(lines[0]["op"], "observe");
    assert!(lines[0]["error"].as_str().unwrap().contains("performance"));
}

#[tokio::test]
async fn test_report_and_next_steps() {
    let engine = AdaptiveEngine::default();
    let mut input = String::new();
    for _ in 0..5 {
        input.push_str(
            r#"{"op":"observe","user_id":"u2","concept":"calculus","performance":0.2,"time_spent":60,"attempts":4,"engagement":0.2}"#,
        );
        input.push('\n');
    }
    input.push_str(r#"{"op":"alerts","user_id":"u2","concept":"calculus"}"#);
    input.push('\n');
    input.push_str(r#"{"op":"report","user_id":"u2","concept":"calculus"}"#);
    input.push('\n');
    input.push_str(r#"{"op":"next_steps","user_id":"u2","concept":"calculus"}"#);
    input.push('\n');
    input.push_str(r#"{"op":"apply_adjustment","user_id":"u2","concept":"calculus"}"#);
    input.push('\n');

    let (stats, lines) = run(&engine, &input).await;
    assert_eq!(stats.failed, 0);

    let last_observe = &lines[4]["result"];
    assert_eq!(last_observe["alerts"].as_array().unwrap().len(), 15);
    assert_eq!(last_observe["point"]["struggle_indicators"].as_array().unwrap().len(), 5);

    assert_eq!(lines[5]["result"][0]["type"], "conceptual");

    let report = &lines[6]["result"];
    assert_eq!(report["learning_curve"]["recommended_difficulty"], "easy");
    assert_eq!(report["mdp_recommendations"].as_array().unwrap().len(), 1);

    let steps = lines[7]["result"].as_array().unwrap();
    assert_eq!(steps[0]["type"], "difficulty_adjustment");
    assert_eq!(steps[1]["type"], "additional_practice");

    assert_eq!(lines[8]["result"], "easy");
}
