use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use super::*;
use crate::logic::observation::{DetectedObject, FrameAnalysisResult};
use crate::logic::strategy::StrategyManager;

fn system() -> CognitiveSystem {
    let strategy = Arc::new(StrategyManager::new("test-system", None));
    CognitiveSystem::new("test-system", None, strategy)
}

/// Poll until the worker-side condition holds or the deadline passes
fn wait_for(check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("condition not reached within deadline");
}

fn anomalous_observation(score: f32) -> FrameAnalysisResult {
    let ts = Utc
        .with_ymd_and_hms(2024, 3, 6, 14, 30, 0)
        .unwrap()
        .timestamp_micros();
    let mut result = FrameAnalysisResult::new(ts);
    result.anomaly_score = score;
    result.anomaly_type = "Intrusion".into();
    result.anomaly_description = "Perimeter breach".into();
    result.is_anomaly = true;
    result.motion.overall_motion_level = 0.3;
    result
}

#[test]
fn test_initial_goals_installed() {
    let system = system();
    wait_for(|| system.get_active_goals().len() == 2);

    let goals = system.get_active_goals();
    assert!(goals.iter().any(|g| g.goal_type == GoalType::Monitor));
    assert!(goals.iter().any(|g| g.goal_type == GoalType::Optimize));
    // Medium monitor goal sorts before the low-priority optimize goal
    assert_eq!(goals[0].goal_type, GoalType::Monitor);
    system.shutdown();
}

#[test]
fn test_perception_extracts_observation_facts() {
    let system = system();

    let mut result = anomalous_observation(0.8);
    result.objects.push(DetectedObject {
        type_id: "person".into(),
        track_id: "p1".into(),
        confidence: 0.9,
        ..Default::default()
    });
    system.process_analysis_result("cam-a", &result);

    wait_for(|| {
        system
            .query_knowledge("Anomaly detected", 5)
            .iter()
            .any(|k| k.content.contains("cam-a"))
    });
    wait_for(|| !system.query_knowledge("Detected person", 5).is_empty());
    wait_for(|| !system.query_knowledge("Motion detected", 5).is_empty());
    system.shutdown();
}

#[test]
fn test_anomaly_spawns_verify_goal() {
    let system = system();
    system.process_analysis_result("cam-a", &anomalous_observation(0.6));

    wait_for(|| {
        system
            .get_active_goals()
            .iter()
            .any(|g| g.goal_type == GoalType::Verify)
    });
    system.shutdown();
}

#[test]
fn test_high_confidence_threat_escalates_to_respond_goal() {
    let system = system();
    system.process_analysis_result("cam-a", &anomalous_observation(0.9));

    wait_for(|| {
        system
            .get_active_goals()
            .iter()
            .any(|g| g.goal_type == GoalType::Respond && g.priority == GoalPriority::Critical)
    });
    system.shutdown();
}

#[test]
fn test_action_execution_records_result() {
    let system = system();
    let action_id = system.create_action(
        ActionType::LogInformation,
        "note something",
        "",
        0.5,
        serde_json::Value::Null,
    );

    wait_for(|| {
        system
            .core
            .actions
            .lock()
            .get(&action_id)
            .map(|a| a.status == ActionStatus::Completed)
            .unwrap_or(false)
    });

    let actions = system.core.actions.lock();
    let action = actions.get(&action_id).unwrap();
    assert!(action.result.contains("Information logged"));
    assert!(action.completion_time_us > 0);
    drop(actions);
    system.shutdown();
}

#[test]
fn test_track_subject_without_subjects_fails() {
    let system = system();
    let action_id = system.create_action(
        ActionType::TrackSubject,
        "track",
        "",
        0.9,
        serde_json::Value::Null,
    );

    wait_for(|| {
        system
            .core
            .actions
            .lock()
            .get(&action_id)
            .map(|a| a.is_complete())
            .unwrap_or(false)
    });

    let actions = system.core.actions.lock();
    assert_eq!(actions.get(&action_id).unwrap().status, ActionStatus::Failed);
    drop(actions);
    system.shutdown();
}

#[test]
fn test_query_knowledge_ranks_by_occurrence() {
    let system = system();
    system.add_knowledge_item(
        KnowledgeType::Observation,
        "threat threat threat everywhere",
        0.9,
        "test",
    );
    system.add_knowledge_item(KnowledgeType::Observation, "a single threat", 0.9, "test");
    system.add_knowledge_item(KnowledgeType::Observation, "nothing here", 0.9, "test");

    let results = system.query_knowledge("threat", 10);
    assert_eq!(results.len(), 2);
    assert!(results[0].content.starts_with("threat threat"));
    system.shutdown();
}

#[test]
fn test_update_goal_status_completes_progress() {
    let system = system();
    let goal_id = system.add_goal(GoalType::Track, "track someone", GoalPriority::High);

    assert!(system.update_goal_status(&goal_id, GoalStatus::Achieved));
    assert!(!system.update_goal_status("GOAL-missing", GoalStatus::Failed));

    let goals = system.core.goals.lock();
    let goal = goals.get(&goal_id).unwrap();
    assert_eq!(goal.progress, 1.0);
    assert!(goal.is_completed());
    drop(goals);
    system.shutdown();
}

#[test]
fn test_cleanup_drops_stale_knowledge_and_finished_work() {
    let system = system();
    system.add_knowledge_item(KnowledgeType::Observation, "old fact", 0.9, "test");
    system.create_action(
        ActionType::LogInformation,
        "done soon",
        "",
        0.5,
        serde_json::Value::Null,
    );

    // Wait for the startup cascade (two monitor-focus actions) plus our
    // action to all finish so the queue is quiescent before cleaning up
    wait_for(|| {
        let actions = system.core.actions.lock();
        actions.len() >= 3 && actions.values().all(|a| a.is_complete())
    });

    let far_future = now_us() + 2 * crate::constants::KNOWLEDGE_RETENTION_US;
    system.core.cleanup_old_data(far_future);

    assert!(system.query_knowledge("", 10).is_empty());
    assert!(system.core.actions.lock().is_empty());
    system.shutdown();
}

#[test]
fn test_cognitive_status_fallback_lists_state() {
    let system = system();
    wait_for(|| system.get_active_goals().len() == 2);

    let status = system.generate_cognitive_status();
    assert!(status.contains("Active Goals"));
    assert!(status.contains("Monitor security cameras"));
    system.shutdown();
}

#[test]
fn test_shutdown_is_idempotent_and_quiesces() {
    let system = system();
    system.shutdown();
    system.shutdown();

    // Enqueueing after shutdown is a no-op rather than an error
    system.process_analysis_result("cam-a", &anomalous_observation(0.9));
}

#[test]
fn test_queue_is_fifo_despite_priorities() {
    let system = system();

    // A normal frame (advisory priority 5) enqueued before an anomalous one
    // (advisory priority 10) is still perceived first
    let mut normal = anomalous_observation(0.2);
    normal.is_anomaly = false;
    normal.anomaly_type.clear();
    system.process_analysis_result("cam-first", &normal);
    system.process_analysis_result("cam-second", &anomalous_observation(0.9));

    wait_for(|| {
        let facts = system.query_knowledge("Frame analyzed", 10);
        facts.iter().any(|k| k.content.contains("cam-first"))
            && facts.iter().any(|k| k.content.contains("cam-second"))
    });

    let facts = system.query_knowledge("Frame analyzed", 10);
    let first = facts
        .iter()
        .find(|k| k.content.contains("cam-first"))
        .unwrap();
    let second = facts
        .iter()
        .find(|k| k.content.contains("cam-second"))
        .unwrap();
    assert!(first.timestamp_us <= second.timestamp_us);
    system.shutdown();
}

#[test]
fn test_insight_extraction_vocabulary() {
    let text = "The system runs well. You should consider tuning the threshold. \
                Nothing else. We recommend adding cameras to the east wing.";
    let insights = extract_insights(text, 5);
    assert_eq!(insights.len(), 2);
    assert!(insights[0].contains("consider"));
    assert!(insights[1].contains("recommend"));

    let plain = extract_insights_plain(text, 2);
    assert_eq!(plain.len(), 2);
    assert!(plain[0].contains("runs well"));
}
