//! Cognitive Core
//!
//! The perceive → cognize → act → reflect loop. All work flows through an
//! internal FIFO task queue drained by a single worker thread; goals,
//! knowledge, reasoning steps and actions live in four independently locked
//! stores, so cross-store operations see stale-but-never-torn views.
//!
//! # Failure Strategy
//! Task execution failures are logged and never stop the worker. Every
//! oracle-assisted path has a deterministic rule-based fallback, so the loop
//! is total with or without the oracle.

pub mod types;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use chrono::Timelike;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

use crate::constants::{
    CLEANUP_INTERVAL_US, COMPLETED_RETENTION_US, KNOWLEDGE_RETENTION_US, RECENT_STATE_CAP,
};
use crate::logic::features::{now_us, timestamp_to_datetime};
use crate::logic::observation::FrameAnalysisResult;
use crate::logic::oracle::{
    ContextItem, ContextItemType, OracleActionType, OracleManager, OracleRequest, OracleResponse,
    RequestPriority, RequestType,
};
use crate::logic::strategy::{IncidentSeverity, IncidentType, StrategyManager};

pub use types::{
    ActionStatus, ActionType, AgentAction, Goal, GoalPriority, GoalStatus, GoalType,
    KnowledgeItem, KnowledgeType, ReasoningStep, ReasoningType, Task, TaskKind,
};

static SENTENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]").expect("valid regex"));

/// Keyword vocabulary for rule-based threat scanning
const THREAT_INDICATORS: &[&str] = &[
    "unknown",
    "unauthorized",
    "suspicious",
    "unusual",
    "anomaly",
    "unusual activity",
    "unexpected",
];

/// Sentences containing these read as insights during reflection
const INSIGHT_INDICATORS: &[&str] = &[
    "suggest",
    "recommend",
    "could",
    "should",
    "might",
    "consider",
    "opportunity",
    "improve",
    "insight",
    "pattern",
    "notice",
    "observed",
    "perform",
    "efficiency",
    "effective",
    "optimize",
];

fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct CognitiveCore {
    system_id: String,
    oracle: Option<Arc<OracleManager>>,
    strategy: Arc<StrategyManager>,

    knowledge: Mutex<HashMap<String, KnowledgeItem>>,
    goals: Mutex<HashMap<String, Goal>>,
    reasoning: Mutex<HashMap<String, ReasoningStep>>,
    actions: Mutex<HashMap<String, AgentAction>>,

    /// Bounded ring of recent state snapshots for reflection
    recent_states: Mutex<VecDeque<serde_json::Value>>,

    task_tx: Mutex<Option<mpsc::Sender<Task>>>,
    running: AtomicBool,
}

/// Central reasoning system coordinating perception, cognition and action
pub struct CognitiveSystem {
    core: Arc<CognitiveCore>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CognitiveSystem {
    pub fn new(
        system_id: &str,
        oracle: Option<Arc<OracleManager>>,
        strategy: Arc<StrategyManager>,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel::<Task>();

        let core = Arc::new(CognitiveCore {
            system_id: system_id.to_string(),
            oracle,
            strategy,
            knowledge: Mutex::new(HashMap::new()),
            goals: Mutex::new(HashMap::new()),
            reasoning: Mutex::new(HashMap::new()),
            actions: Mutex::new(HashMap::new()),
            recent_states: Mutex::new(VecDeque::new()),
            task_tx: Mutex::new(Some(task_tx)),
            running: AtomicBool::new(true),
        });

        let worker_core = Arc::clone(&core);
        let worker = thread::spawn(move || {
            log::info!("Cognitive worker started");
            let mut last_cleanup_us = now_us();

            while let Ok(task) = task_rx.recv() {
                if !worker_core.running.load(Ordering::SeqCst)
                    || matches!(task.kind, TaskKind::Shutdown)
                {
                    break;
                }
                worker_core.execute_task(task);

                let current = now_us();
                if current - last_cleanup_us > CLEANUP_INTERVAL_US {
                    worker_core.cleanup_old_data(current);
                    last_cleanup_us = current;
                }
            }
            log::info!("Cognitive worker stopped");
        });

        let system = Self {
            core,
            worker: Mutex::new(Some(worker)),
        };

        // Standing goals installed at startup
        system.add_goal(
            GoalType::Monitor,
            "Monitor security cameras for anomalies",
            GoalPriority::Medium,
        );
        system.add_goal(
            GoalType::Optimize,
            "Optimize system performance and reduce false alarms",
            GoalPriority::Low,
        );

        system
    }

    // ------------------------------------------------------------------
    // Public API
    // ------------------------------------------------------------------

    /// Perceive: package an observation into a task and enqueue it
    pub fn process_analysis_result(&self, device_id: &str, result: &FrameAnalysisResult) {
        let priority = if result.is_anomaly { 10 } else { 5 };
        self.core.enqueue(
            TaskKind::ProcessAnalysis {
                device_id: device_id.to_string(),
                result: result.clone(),
            },
            priority,
        );
    }

    pub fn add_goal(
        &self,
        goal_type: GoalType,
        description: &str,
        priority: GoalPriority,
    ) -> String {
        self.core.add_goal(goal_type, description, priority)
    }

    pub fn update_goal_status(&self, goal_id: &str, status: GoalStatus) -> bool {
        let mut goals = self.core.goals.lock();
        match goals.get_mut(goal_id) {
            Some(goal) => {
                goal.status = status;
                goal.last_update_time_us = now_us();
                if matches!(status, GoalStatus::Achieved | GoalStatus::Failed) {
                    goal.progress = 1.0;
                }
                true
            }
            None => false,
        }
    }

    pub fn get_active_goals(&self) -> Vec<Goal> {
        self.core.get_active_goals()
    }

    pub fn add_knowledge_item(
        &self,
        item_type: KnowledgeType,
        content: &str,
        confidence: f32,
        source: &str,
    ) -> String {
        self.core
            .add_knowledge_item(item_type, content, confidence, source)
    }

    pub fn query_knowledge(&self, query: &str, max_results: usize) -> Vec<KnowledgeItem> {
        self.core.query_knowledge(query, max_results)
    }

    pub fn create_action(
        &self,
        action_type: ActionType,
        description: &str,
        goal_id: &str,
        priority: f32,
        parameters: serde_json::Value,
    ) -> String {
        self.core
            .create_action(action_type, description, goal_id, priority, parameters)
    }

    pub fn get_ongoing_actions(&self) -> Vec<AgentAction> {
        self.core.get_ongoing_actions()
    }

    /// Enqueue a reflection pass. Called periodically by the system ticker.
    pub fn execute_cognitive_cycle(&self) {
        self.core.enqueue(TaskKind::Reflect, 1);
    }

    /// Textual summary of the current cognitive state
    pub fn generate_cognitive_status(&self) -> String {
        self.core.generate_cognitive_status()
    }

    /// Stop the worker: clear the running flag and wake it. No further tasks
    /// execute once the flag is down.
    pub fn shutdown(&self) {
        self.core.running.store(false, Ordering::SeqCst);
        let sender = self.core.task_tx.lock().take();
        if let Some(sender) = sender {
            let _ = sender.send(Task {
                kind: TaskKind::Shutdown,
                priority: 0,
                creation_time_us: now_us(),
            });
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CognitiveSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// CORE (worker side)
// ============================================================================

impl CognitiveCore {
    fn enqueue(&self, kind: TaskKind, priority: i32) {
        let sender = self.task_tx.lock();
        if let Some(sender) = sender.as_ref() {
            let _ = sender.send(Task {
                kind,
                priority,
                creation_time_us: now_us(),
            });
        }
    }

    fn execute_task(&self, task: Task) {
        match task.kind {
            TaskKind::ProcessAnalysis { device_id, result } => {
                self.perceive(&device_id, &result)
            }
            TaskKind::UpdateKnowledge => self.cognize(),
            TaskKind::EvaluateGoals => self.update_goals(),
            TaskKind::SelectActions => self.plan_actions(),
            TaskKind::ExecuteAction { action_id } => self.run_action(&action_id),
            TaskKind::Reflect => self.reflect(),
            TaskKind::Shutdown => {}
        }
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    fn add_goal(&self, goal_type: GoalType, description: &str, priority: GoalPriority) -> String {
        let goal = Goal::new(
            generate_id("GOAL"),
            goal_type,
            description,
            priority,
            now_us(),
        );
        let id = goal.id.clone();
        self.goals.lock().insert(id.clone(), goal);

        self.enqueue(TaskKind::EvaluateGoals, 5);
        id
    }

    fn get_active_goals(&self) -> Vec<Goal> {
        let goals = self.goals.lock();
        let mut active: Vec<Goal> = goals.values().filter(|g| g.is_active()).cloned().collect();
        active.sort_by(|a, b| a.priority.cmp(&b.priority));
        active
    }

    fn add_knowledge_item(
        &self,
        item_type: KnowledgeType,
        content: &str,
        confidence: f32,
        source: &str,
    ) -> String {
        let item = KnowledgeItem {
            id: generate_id("KNOW"),
            item_type,
            content: content.to_string(),
            confidence,
            timestamp_us: now_us(),
            source: source.to_string(),
            related_items: Vec::new(),
        };
        let id = item.id.clone();
        self.knowledge.lock().insert(id.clone(), item);
        id
    }

    /// Keyword search over the knowledge base. Empty query returns the most
    /// recent items; otherwise results rank by occurrence count, then recency.
    fn query_knowledge(&self, query: &str, max_results: usize) -> Vec<KnowledgeItem> {
        let knowledge = self.knowledge.lock();

        if query.is_empty() {
            let mut results: Vec<KnowledgeItem> = knowledge.values().cloned().collect();
            results.sort_by(|a, b| b.timestamp_us.cmp(&a.timestamp_us));
            results.truncate(max_results);
            return results;
        }

        let query_lower = query.to_lowercase();
        let mut results: Vec<(usize, KnowledgeItem)> = knowledge
            .values()
            .filter_map(|item| {
                let count = item.content.to_lowercase().matches(&query_lower).count();
                (count > 0).then(|| (count, item.clone()))
            })
            .collect();

        results.sort_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then(b.timestamp_us.cmp(&a.timestamp_us))
        });

        results
            .into_iter()
            .take(max_results)
            .map(|(_, item)| item)
            .collect()
    }

    fn add_reasoning(
        &self,
        step_type: ReasoningType,
        description: &str,
        inputs: Vec<String>,
    ) -> String {
        let step = ReasoningStep {
            id: generate_id("REAS"),
            step_type,
            description: description.to_string(),
            inputs,
            outputs: Vec::new(),
            start_time_us: now_us(),
            end_time_us: 0,
            confidence: 0.0,
            alternatives_considered: Vec::new(),
            trace: String::new(),
        };
        let id = step.id.clone();
        self.reasoning.lock().insert(id.clone(), step);
        id
    }

    fn create_action(
        &self,
        action_type: ActionType,
        description: &str,
        goal_id: &str,
        priority: f32,
        parameters: serde_json::Value,
    ) -> String {
        let action = AgentAction::new(
            generate_id("ACT"),
            action_type,
            description,
            goal_id,
            priority,
            parameters,
            now_us(),
        );
        let id = action.id.clone();
        self.actions.lock().insert(id.clone(), action);

        self.enqueue(
            TaskKind::ExecuteAction {
                action_id: id.clone(),
            },
            (priority * 10.0) as i32,
        );
        id
    }

    fn get_ongoing_actions(&self) -> Vec<AgentAction> {
        let actions = self.actions.lock();
        let mut ongoing: Vec<AgentAction> = actions
            .values()
            .filter(|a| !a.is_complete())
            .cloned()
            .collect();
        ongoing.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ongoing
    }

    // ------------------------------------------------------------------
    // Perceive
    // ------------------------------------------------------------------

    fn perceive(&self, device_id: &str, result: &FrameAnalysisResult) {
        self.extract_facts(device_id, result);
        self.update_situation_model(result);

        let priority = if result.is_anomaly { 7 } else { 3 };
        self.enqueue(TaskKind::UpdateKnowledge, priority);
    }

    /// One OBSERVATION item per notable fact in the frame
    fn extract_facts(&self, device_id: &str, result: &FrameAnalysisResult) {
        self.add_knowledge_item(
            KnowledgeType::Observation,
            &format!(
                "Frame analyzed from camera {} at {}",
                device_id,
                timestamp_to_datetime(result.timestamp_us).format("%Y-%m-%d %H:%M:%S")
            ),
            1.0,
            "FrameAnalysis",
        );

        if result.motion.overall_motion_level > 0.01 {
            self.add_knowledge_item(
                KnowledgeType::Observation,
                &format!(
                    "Motion detected in camera {} with level {:.2}",
                    device_id, result.motion.overall_motion_level
                ),
                result.motion.overall_motion_level,
                "MotionDetection",
            );
        }

        for obj in &result.objects {
            let mut content = format!(
                "Detected {} in camera {} with confidence {:.2}",
                obj.type_id, device_id, obj.confidence
            );
            if let Some(status) = obj.attributes.get("recognitionStatus") {
                content.push_str(&format!(" ({})", status));
            }
            self.add_knowledge_item(
                KnowledgeType::Observation,
                &content,
                obj.confidence,
                "ObjectDetection",
            );
        }

        if result.is_anomaly {
            self.add_knowledge_item(
                KnowledgeType::Observation,
                &format!(
                    "Anomaly detected in camera {}: {} - {}",
                    device_id, result.anomaly_type, result.anomaly_description
                ),
                result.anomaly_score,
                "AnomalyDetection",
            );
        }
    }

    /// Derive INFERENCE items from simple rules over the frame
    fn update_situation_model(&self, result: &FrameAnalysisResult) {
        if result.is_anomaly {
            match result.anomaly_type.as_str() {
                "UnknownVisitor" => {
                    self.add_knowledge_item(
                        KnowledgeType::Inference,
                        "Potential security concern: Unknown individual present in monitored area",
                        result.anomaly_score * 0.8,
                        "SituationAnalysis",
                    );
                }
                "Loitering" => {
                    self.add_knowledge_item(
                        KnowledgeType::Inference,
                        "Suspicious behavior: Subject lingering in area for extended period",
                        result.anomaly_score * 0.8,
                        "SituationAnalysis",
                    );
                }
                "AbnormalActivity" => {
                    self.add_knowledge_item(
                        KnowledgeType::Inference,
                        "Unusual activity pattern detected: May indicate unauthorized access or behavior",
                        result.anomaly_score * 0.7,
                        "SituationAnalysis",
                    );
                }
                _ => {}
            }
        }

        let timestamp_us = if result.timestamp_us > 0 {
            result.timestamp_us
        } else {
            now_us()
        };
        let hour = timestamp_to_datetime(timestamp_us).hour();
        let is_business_hours = (9..17).contains(&hour);
        let is_nighttime = hour >= 22 || hour < 6;

        if is_nighttime && result.motion.overall_motion_level > 0.1 {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                "Significant activity detected during nighttime hours - possible off-hours access",
                0.85,
                "TimeContextAnalysis",
            );
        }

        if result.person_count() > 5 && !is_business_hours {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                "Unusual number of people detected outside business hours",
                0.75,
                "OccupancyAnalysis",
            );
        }

        if result.vehicle_count() > 3 && is_nighttime {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                "Multiple vehicles present during nighttime - unusual activity",
                0.8,
                "VehicleAnalysis",
            );
        }
    }

    // ------------------------------------------------------------------
    // Cognize
    // ------------------------------------------------------------------

    fn cognize(&self) {
        self.assess_situation();
        self.identify_threats();
        self.update_goals();

        self.enqueue(TaskKind::SelectActions, 5);
    }

    fn assess_situation(&self) {
        let recent = self.query_knowledge("", 20);

        if self.oracle.is_some() && !recent.is_empty() {
            let reasoning_id = self.add_reasoning(
                ReasoningType::SituationAssessment,
                "Assess current security situation",
                Vec::new(),
            );

            let step = self.generate_reasoning_with_oracle(
                ReasoningType::SituationAssessment,
                "What is the current security situation?",
                &recent,
            );

            {
                let mut reasoning = self.reasoning.lock();
                if let Some(existing) = reasoning.get_mut(&reasoning_id) {
                    existing.end_time_us = now_us();
                    existing.confidence = step.confidence;
                    existing.trace = step.trace.clone();
                    existing.outputs = step.outputs.clone();
                }
            }

            if !step.outputs.is_empty() {
                let priority = if step.confidence > 0.8 { 8 } else { 5 };
                self.enqueue(TaskKind::EvaluateGoals, priority);
            }
            return;
        }

        // Rule-based fallback: scan for anomaly observations
        let mut max_score = 0.0f32;
        let mut anomaly_description = String::new();
        for item in &recent {
            if item.content.contains("Anomaly detected") {
                if item.confidence > max_score {
                    max_score = item.confidence;
                    anomaly_description = item.content.clone();
                }
            }
        }

        if !anomaly_description.is_empty() {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                &format!(
                    "Security situation assessment: Potential security issue detected. {}",
                    anomaly_description
                ),
                max_score * 0.9,
                "SituationAssessment",
            );
            self.enqueue(TaskKind::EvaluateGoals, 8);
        } else {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                "Security situation assessment: Normal operations, no significant issues detected.",
                0.9,
                "SituationAssessment",
            );
        }
    }

    /// Keyword/confidence scan over recent knowledge with a fixed indicator
    /// vocabulary
    fn identify_threats(&self) {
        let recent = self.query_knowledge("", 20);

        let mut max_threat_score = 0.0f32;
        let mut threat_description = String::new();

        for item in &recent {
            let content_lower = item.content.to_lowercase();
            if THREAT_INDICATORS
                .iter()
                .any(|indicator| content_lower.contains(indicator))
            {
                let threat_score = item.confidence * 0.8;
                if threat_score > max_threat_score {
                    max_threat_score = threat_score;
                    threat_description = item.content.clone();
                }
            }
        }

        if max_threat_score > 0.5 {
            self.add_knowledge_item(
                KnowledgeType::Inference,
                &format!(
                    "Threat assessment: Potential security threat identified. {}",
                    threat_description
                ),
                max_threat_score,
                "ThreatAnalysis",
            );
            self.enqueue(TaskKind::EvaluateGoals, 9);
        }
    }

    /// Ensure VERIFY/RESPOND goals exist for the current threat picture and
    /// recompute goal progress from linked actions
    fn update_goals(&self) {
        let active_goals = self.get_active_goals();
        let recent = self.query_knowledge("", 20);

        let mut has_threat = false;
        let mut has_anomaly = false;
        let mut max_threat_score = 0.0f32;

        for item in &recent {
            let content_lower = item.content.to_lowercase();
            if content_lower.contains("threat") {
                has_threat = true;
                max_threat_score = max_threat_score.max(item.confidence);
            } else if content_lower.contains("anomaly") {
                has_anomaly = true;
                max_threat_score = max_threat_score.max(item.confidence);
            }
        }

        if has_threat || has_anomaly {
            let has_verify_goal = active_goals.iter().any(|g| g.goal_type == GoalType::Verify);
            let has_respond_goal = active_goals
                .iter()
                .any(|g| g.goal_type == GoalType::Respond);

            if !has_verify_goal {
                self.add_goal(
                    GoalType::Verify,
                    "Investigate potential security concern",
                    GoalPriority::High,
                );
            }

            if !has_respond_goal && max_threat_score > 0.7 {
                self.add_goal(
                    GoalType::Respond,
                    "Respond to identified security threat",
                    GoalPriority::Critical,
                );
            }
        }

        // Recompute progress. Action counts are snapshotted per goal so the
        // two store locks are never held together.
        let goal_ids: Vec<String> = self.goals.lock().keys().cloned().collect();
        for goal_id in goal_ids {
            let goal_type = match self.goals.lock().get(&goal_id) {
                Some(goal) if !goal.is_completed() => goal.goal_type,
                _ => continue,
            };

            match goal_type {
                GoalType::Detect => {
                    if has_anomaly {
                        let mut goals = self.goals.lock();
                        if let Some(goal) = goals.get_mut(&goal_id) {
                            goal.progress = 1.0;
                            goal.status = GoalStatus::Achieved;
                            goal.result_description = "Detection successful".to_string();
                            goal.last_update_time_us = now_us();
                        }
                    }
                }
                GoalType::Verify | GoalType::Respond => {
                    let (total, completed) = {
                        let actions = self.actions.lock();
                        let linked: Vec<&AgentAction> =
                            actions.values().filter(|a| a.goal_id == goal_id).collect();
                        (
                            linked.len(),
                            linked.iter().filter(|a| a.is_complete()).count(),
                        )
                    };

                    if total > 0 {
                        let mut goals = self.goals.lock();
                        if let Some(goal) = goals.get_mut(&goal_id) {
                            goal.progress = completed as f32 / total as f32;
                            goal.last_update_time_us = now_us();
                            if completed == total {
                                goal.status = GoalStatus::Achieved;
                                goal.result_description = match goal_type {
                                    GoalType::Verify => "Verification complete".to_string(),
                                    _ => "Response complete".to_string(),
                                };
                            }
                        }
                    }
                }
                _ => {
                    let mut goals = self.goals.lock();
                    if let Some(goal) = goals.get_mut(&goal_id) {
                        goal.last_update_time_us = now_us();
                    }
                }
            }
        }

        self.enqueue(TaskKind::SelectActions, 6);
    }

    // ------------------------------------------------------------------
    // Act
    // ------------------------------------------------------------------

    /// Plan actions for the highest-priority active goal and enqueue them in
    /// descending action priority
    fn plan_actions(&self) {
        let active_goals = self.get_active_goals();
        let goal = match active_goals.first() {
            Some(goal) => goal.clone(),
            None => return,
        };

        if self.oracle.is_some() {
            let recent = self.query_knowledge("", 20);
            let reasoning_id = self.add_reasoning(
                ReasoningType::Planning,
                &format!("Plan actions for goal: {}", goal.description),
                Vec::new(),
            );

            match self.plan_actions_with_oracle(&goal, &recent) {
                Some(planned) => {
                    let mut reasoning = self.reasoning.lock();
                    if let Some(step) = reasoning.get_mut(&reasoning_id) {
                        step.end_time_us = now_us();
                        step.confidence = 0.9;
                        step.trace = format!(
                            "Planned {} actions for goal: {}",
                            planned.len(),
                            goal.description
                        );
                        step.outputs = planned;
                    }
                    return;
                }
                None => {
                    let mut reasoning = self.reasoning.lock();
                    if let Some(step) = reasoning.get_mut(&reasoning_id) {
                        step.end_time_us = now_us();
                        step.confidence = 0.2;
                        step.trace = "Oracle planning unavailable, using defaults".to_string();
                    }
                }
            }
        }

        self.plan_default_actions(&goal);
    }

    /// Fixed per-goal-type fallback action sets
    fn plan_default_actions(&self, goal: &Goal) {
        match goal.goal_type {
            GoalType::Monitor => {
                self.create_action(
                    ActionType::FocusCamera,
                    "Focus monitoring on active cameras",
                    &goal.id,
                    0.7,
                    json!({ "duration": 300 }),
                );
            }
            GoalType::Verify => {
                self.create_action(
                    ActionType::VerifyAnomaly,
                    "Verify reported anomaly",
                    &goal.id,
                    0.9,
                    serde_json::Value::Null,
                );
                self.create_action(
                    ActionType::GatherContext,
                    "Gather additional context",
                    &goal.id,
                    0.8,
                    serde_json::Value::Null,
                );
            }
            GoalType::Respond => {
                self.create_action(
                    ActionType::GenerateAlert,
                    "Generate security alert for operators",
                    &goal.id,
                    0.95,
                    json!({ "priority": "high" }),
                );
                self.create_action(
                    ActionType::TrackSubject,
                    "Track suspicious subjects",
                    &goal.id,
                    0.9,
                    serde_json::Value::Null,
                );
            }
            _ => {
                self.create_action(
                    ActionType::LogInformation,
                    &format!("Log goal progress: {}", goal.description),
                    &goal.id,
                    0.5,
                    serde_json::Value::Null,
                );
            }
        }
    }

    /// Oracle-assisted planning; returns the created action ids, or None when
    /// the oracle declined so the caller falls back
    fn plan_actions_with_oracle(
        &self,
        goal: &Goal,
        recent: &[KnowledgeItem],
    ) -> Option<Vec<String>> {
        let oracle = self.oracle.as_ref()?;

        let mut request = OracleRequest::new(
            &self.system_id,
            RequestType::ResponsePlanning,
            RequestPriority::High,
        );

        let mut goal_item = ContextItem::new(
            ContextItemType::EnvironmentInfo,
            format!("Goal: {}", goal.description),
            goal.creation_time_us,
        );
        goal_item.metadata = json!({
            "goalId": goal.id,
            "goalType": format!("{:?}", goal.goal_type),
            "priority": format!("{:?}", goal.priority),
        });
        request.add_context_item(goal_item);

        for item in recent {
            let mut context = ContextItem::new(
                ContextItemType::EnvironmentInfo,
                item.content.clone(),
                item.timestamp_us,
            );
            context.confidence = item.confidence;
            request.add_context_item(context);
        }

        let response = oracle.submit(request);
        if !response.success || response.actions.is_empty() {
            return None;
        }

        // Create actions sorted most-confident first so execution tasks land
        // in priority order on the FIFO queue
        let mut planned = response.actions.clone();
        planned.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut ids = Vec::new();
        for oracle_action in planned {
            let action_type = match oracle_action.action_type {
                OracleActionType::Monitor => ActionType::FocusCamera,
                OracleActionType::Alert => ActionType::GenerateAlert,
                OracleActionType::Track => ActionType::TrackSubject,
                OracleActionType::AnalyzeFurther => ActionType::GatherContext,
                OracleActionType::CrossReference => ActionType::CorrelateEvents,
                OracleActionType::Predict => ActionType::UpdateModel,
                OracleActionType::Recommend => ActionType::RequestAssistance,
            };
            ids.push(self.create_action(
                action_type,
                &oracle_action.description,
                &goal.id,
                oracle_action.confidence,
                oracle_action.parameters.clone(),
            ));
        }
        Some(ids)
    }

    // ------------------------------------------------------------------
    // Execute
    // ------------------------------------------------------------------

    fn run_action(&self, action_id: &str) {
        let action = {
            let mut actions = self.actions.lock();
            match actions.get_mut(action_id) {
                Some(action) => {
                    action.status = ActionStatus::InProgress;
                    action.start_time_us = now_us();
                    action.clone()
                }
                None => return,
            }
        };

        let success = self.execute_action(&action);

        let mut actions = self.actions.lock();
        if let Some(action) = actions.get_mut(action_id) {
            action.status = if success {
                ActionStatus::Completed
            } else {
                ActionStatus::Failed
            };
            action.completion_time_us = now_us();
            if !success && action.result.is_empty() {
                action.result = "Action execution failed".to_string();
            }
        }
    }

    fn set_action_result(&self, action_id: &str, result: String) {
        let mut actions = self.actions.lock();
        if let Some(action) = actions.get_mut(action_id) {
            action.result = result;
        }
    }

    fn execute_action(&self, action: &AgentAction) -> bool {
        log::info!("Executing action: {}", action.description);

        match action.action_type {
            ActionType::FocusCamera => {
                let camera_id = self.strategy.get_recommended_camera();
                let result = format!(
                    "Focused monitoring on camera: {}",
                    camera_id.as_deref().unwrap_or("all cameras")
                );
                log::info!("{}", result);
                self.set_action_result(&action.id, result);
                true
            }

            ActionType::AdjustAnalysis => {
                self.add_knowledge_item(
                    KnowledgeType::MetaKnowledge,
                    "Adjusted analysis parameters for optimized detection",
                    0.9,
                    "ActionExecution",
                );
                true
            }

            ActionType::GenerateAlert => {
                let priority = action
                    .parameters
                    .get("priority")
                    .and_then(|v| v.as_str())
                    .unwrap_or("medium")
                    .to_string();

                // Draft from the most relevant threat knowledge, else anomaly
                // knowledge, else a generic line
                let detail = self
                    .query_knowledge("threat", 3)
                    .first()
                    .map(|k| k.content.clone())
                    .or_else(|| {
                        self.query_knowledge("anomaly", 3)
                            .first()
                            .map(|k| k.content.clone())
                    })
                    .unwrap_or_else(|| {
                        "Potential security concern detected. Please verify.".to_string()
                    });

                let alert = format!("SECURITY ALERT ({}): {}", priority, detail);
                log::info!("Generated alert: {}", alert);

                self.add_knowledge_item(
                    KnowledgeType::Observation,
                    &format!("Security alert generated: {}", alert),
                    0.95,
                    "ActionExecution",
                );
                self.set_action_result(&action.id, format!("Alert generated: {}", alert));
                true
            }

            ActionType::SuppressAlert => {
                log::info!("Suppressed alert to prevent false alarm");
                self.add_knowledge_item(
                    KnowledgeType::MetaKnowledge,
                    "Suppressed potential false alarm",
                    0.8,
                    "ActionExecution",
                );
                true
            }

            ActionType::GatherContext => {
                let report = self.strategy.generate_situation_report();
                self.add_knowledge_item(
                    KnowledgeType::ContextualInfo,
                    &format!("Situation context: {}", report),
                    0.85,
                    "ContextGathering",
                );
                self.set_action_result(&action.id, "Gathered additional context".to_string());
                true
            }

            ActionType::VerifyAnomaly => {
                let anomaly_knowledge = self.query_knowledge("anomaly", 5);
                if anomaly_knowledge.is_empty() {
                    log::warn!("No anomalies found to verify");
                    return false;
                }

                let verified = anomaly_knowledge.iter().any(|k| k.confidence > 0.8);
                if verified {
                    self.add_knowledge_item(
                        KnowledgeType::Inference,
                        "Anomaly verification: The detected anomaly has been confirmed as genuine",
                        0.9,
                        "AnomalyVerification",
                    );
                } else {
                    self.add_knowledge_item(
                        KnowledgeType::Inference,
                        "Anomaly verification: Unable to confirm the anomaly with high confidence",
                        0.7,
                        "AnomalyVerification",
                    );
                }

                self.set_action_result(
                    &action.id,
                    if verified {
                        "Anomaly verified as genuine".to_string()
                    } else {
                        "Unable to verify anomaly with high confidence".to_string()
                    },
                );
                true
            }

            ActionType::CorrelateEvents => {
                self.add_knowledge_item(
                    KnowledgeType::Inference,
                    "Event correlation analysis completed",
                    0.7,
                    "EventCorrelation",
                );
                true
            }

            ActionType::InitiateResponse => {
                let threat_knowledge = self.query_knowledge("threat", 3);

                let (description, severity) = match threat_knowledge.first() {
                    Some(item) => (
                        item.content.clone(),
                        if item.confidence > 0.8 {
                            IncidentSeverity::High
                        } else {
                            IncidentSeverity::Medium
                        },
                    ),
                    None => (
                        "Automated response to security concern".to_string(),
                        IncidentSeverity::Medium,
                    ),
                };

                let camera_id = self.strategy.get_recommended_camera().unwrap_or_default();
                let incident_id = self.strategy.create_incident(
                    IncidentType::SuspiciousBehavior,
                    severity,
                    &camera_id,
                    &description,
                );

                log::info!("Created incident: {}", incident_id);
                self.set_action_result(
                    &action.id,
                    format!("Initiated response protocol - Incident ID: {}", incident_id),
                );
                true
            }

            ActionType::TrackSubject => {
                let subjects = self.strategy.get_tracked_subjects();
                match subjects.first() {
                    Some(subject) => {
                        log::info!("Tracking subject: {}", subject.track_id);
                        self.add_knowledge_item(
                            KnowledgeType::Observation,
                            &format!("Actively tracking subject with ID {}", subject.track_id),
                            0.9,
                            "SubjectTracking",
                        );
                        self.set_action_result(
                            &action.id,
                            format!("Tracking subject: {}", subject.track_id),
                        );
                        true
                    }
                    None => {
                        log::warn!("No subjects available for tracking");
                        false
                    }
                }
            }

            ActionType::CoordinateSystem => {
                log::info!("Coordinating with external systems");
                self.add_knowledge_item(
                    KnowledgeType::Observation,
                    "Coordinated response with external systems",
                    0.8,
                    "SystemCoordination",
                );
                true
            }

            ActionType::UpdateModel => {
                log::info!("Updating internal models based on recent events");
                self.add_knowledge_item(
                    KnowledgeType::MetaKnowledge,
                    "Updated internal models for improved detection",
                    0.85,
                    "ModelUpdate",
                );
                true
            }

            ActionType::LogInformation => {
                let message = action
                    .parameters
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&action.description);
                log::info!("System log: {}", message);
                self.set_action_result(&action.id, format!("Information logged: {}", message));
                true
            }

            ActionType::RequestAssistance => {
                let message = action
                    .parameters
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Human operator assistance required for security situation");

                log::info!("Requesting assistance: {}", message);
                self.add_knowledge_item(
                    KnowledgeType::MetaKnowledge,
                    &format!("Requested human operator assistance: {}", message),
                    0.9,
                    "AssistanceRequest",
                );
                self.set_action_result(&action.id, format!("Assistance requested: {}", message));
                true
            }
        }
    }

    // ------------------------------------------------------------------
    // Reflect
    // ------------------------------------------------------------------

    /// Snapshot system state into the bounded ring and, with enough history
    /// and an oracle, extract insights and recommendations
    fn reflect(&self) {
        let snapshot = json!({
            "goals": self.goals.lock().values().cloned().collect::<Vec<_>>(),
            "actions": self.actions.lock().values().cloned().collect::<Vec<_>>(),
            "timestampUs": now_us(),
        });

        let recent: Option<Vec<serde_json::Value>> = {
            let mut states = self.recent_states.lock();
            states.push_back(snapshot);
            while states.len() > RECENT_STATE_CAP {
                states.pop_front();
            }

            (states.len() >= 5).then(|| {
                states
                    .iter()
                    .rev()
                    .take(5)
                    .rev()
                    .cloned()
                    .collect()
            })
        };

        let recent = match (recent, self.oracle.as_ref()) {
            (Some(recent), Some(_)) => recent,
            _ => return,
        };

        let reflection = self.reflect_with_oracle(&recent);

        if let Some(insights) = reflection.get("insights").and_then(|v| v.as_array()) {
            for insight in insights.iter().filter_map(|v| v.as_str()) {
                self.add_knowledge_item(
                    KnowledgeType::MetaKnowledge,
                    insight,
                    0.8,
                    "SystemReflection",
                );
            }
        }

        if let Some(recommendations) = reflection.get("recommendations").and_then(|v| v.as_array())
        {
            for recommendation in recommendations.iter().filter_map(|v| v.as_str()) {
                log::info!("Applying recommendation: {}", recommendation);

                if recommendation.contains("goal") && recommendation.contains("create") {
                    self.add_goal(
                        GoalType::Optimize,
                        &format!("Optimization goal from reflection: {}", recommendation),
                        GoalPriority::Medium,
                    );
                } else if recommendation.contains("model") && recommendation.contains("update") {
                    self.create_action(
                        ActionType::UpdateModel,
                        &format!("Update models based on reflection: {}", recommendation),
                        "",
                        0.7,
                        json!({ "recommendation": recommendation }),
                    );
                }
            }
        }
    }

    fn reflect_with_oracle(&self, recent_states: &[serde_json::Value]) -> serde_json::Value {
        let oracle = match self.oracle.as_ref() {
            Some(oracle) => oracle,
            None => return json!({ "insights": [], "recommendations": [] }),
        };

        let mut request = OracleRequest::new(
            &self.system_id,
            RequestType::SituationAssessment,
            RequestPriority::Low,
        );

        for (i, state) in recent_states.iter().enumerate() {
            let mut item = ContextItem::new(
                ContextItemType::EnvironmentInfo,
                format!("System state {} of {}", i + 1, recent_states.len()),
                state
                    .get("timestampUs")
                    .and_then(|v| v.as_i64())
                    .unwrap_or_else(now_us),
            );
            item.metadata = state.clone();
            request.add_context_item(item);
        }

        request.add_context_item(ContextItem::new(
            ContextItemType::EnvironmentInfo,
            "Please analyze system performance and provide insights and recommendations for improvement."
                .to_string(),
            now_us(),
        ));

        let response = oracle.submit(request);
        if !response.success {
            return json!({ "insights": [], "recommendations": [] });
        }

        let insights = extract_insights(&response.reasoning, 5);
        let recommendations: Vec<String> = response
            .actions
            .iter()
            .map(|a| a.description.clone())
            .collect();

        json!({
            "reflection": response.reasoning,
            "confidence": response.confidence_score,
            "insights": insights,
            "recommendations": recommendations,
        })
    }

    /// Oracle-assisted reasoning step: record inputs, derive up to three
    /// insight sentences as INFERENCE knowledge
    fn generate_reasoning_with_oracle(
        &self,
        step_type: ReasoningType,
        description: &str,
        relevant: &[KnowledgeItem],
    ) -> ReasoningStep {
        let mut step = ReasoningStep {
            id: generate_id("REAS"),
            step_type,
            description: description.to_string(),
            inputs: relevant.iter().map(|k| k.id.clone()).collect(),
            outputs: Vec::new(),
            start_time_us: now_us(),
            end_time_us: 0,
            confidence: 0.0,
            alternatives_considered: Vec::new(),
            trace: String::new(),
        };

        let response = match self.oracle.as_ref() {
            Some(oracle) => {
                let mut request = OracleRequest::new(
                    &self.system_id,
                    RequestType::SituationAssessment,
                    RequestPriority::Medium,
                );
                for item in relevant {
                    let mut context = ContextItem::new(
                        ContextItemType::EnvironmentInfo,
                        item.content.clone(),
                        item.timestamp_us,
                    );
                    context.confidence = item.confidence;
                    request.add_context_item(context);
                }
                request.add_context_item(ContextItem::new(
                    ContextItemType::EnvironmentInfo,
                    format!("Query: {}", description),
                    step.start_time_us,
                ));
                oracle.submit(request)
            }
            None => OracleResponse::failure("No oracle configured"),
        };

        if response.success {
            step.trace = response.reasoning.clone();
            step.confidence = response.confidence_score;

            let insights = extract_insights_plain(&response.reasoning, 3);
            for insight in insights {
                let item = KnowledgeItem {
                    id: generate_id("KNOW"),
                    item_type: KnowledgeType::Inference,
                    content: insight,
                    confidence: step.confidence * 0.9,
                    timestamp_us: now_us(),
                    source: "OracleReasoning".to_string(),
                    related_items: step.inputs.clone(),
                };
                let id = item.id.clone();
                self.knowledge.lock().insert(id.clone(), item);
                step.outputs.push(id);
            }
        } else {
            step.trace = "Failed to generate reasoning with oracle".to_string();
            step.confidence = 0.2;
        }

        step.end_time_us = now_us();
        self.reasoning.lock().insert(step.id.clone(), step.clone());
        step
    }

    // ------------------------------------------------------------------
    // Cleanup
    // ------------------------------------------------------------------

    fn cleanup_old_data(&self, current_time_us: i64) {
        {
            let mut knowledge = self.knowledge.lock();
            knowledge
                .retain(|_, item| current_time_us - item.timestamp_us <= KNOWLEDGE_RETENTION_US);
        }

        {
            let mut reasoning = self.reasoning.lock();
            reasoning.retain(|_, step| {
                step.end_time_us == 0
                    || current_time_us - step.end_time_us <= COMPLETED_RETENTION_US
            });
        }

        {
            let mut actions = self.actions.lock();
            actions.retain(|_, action| {
                !action.is_complete()
                    || current_time_us - action.completion_time_us <= COMPLETED_RETENTION_US
            });
        }

        {
            let mut states = self.recent_states.lock();
            while states.len() > RECENT_STATE_CAP {
                states.pop_front();
            }
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    fn generate_cognitive_status(&self) -> String {
        let active_goals = self.get_active_goals();
        let ongoing_actions = self.get_ongoing_actions();

        if let Some(oracle) = self.oracle.as_ref() {
            let mut request = OracleRequest::new(
                &self.system_id,
                RequestType::SituationAssessment,
                RequestPriority::Medium,
            );

            for goal in &active_goals {
                request.add_context_item(ContextItem::new(
                    ContextItemType::EnvironmentInfo,
                    format!("Goal: {} (Priority: {:?})", goal.description, goal.priority),
                    goal.last_update_time_us,
                ));
            }
            for action in &ongoing_actions {
                request.add_context_item(ContextItem::new(
                    ContextItemType::EnvironmentInfo,
                    format!(
                        "Action: {} (Priority: {:.2})",
                        action.description, action.priority
                    ),
                    action.creation_time_us,
                ));
            }
            for item in self.query_knowledge("", 10) {
                let mut context = ContextItem::new(
                    ContextItemType::EnvironmentInfo,
                    format!("Knowledge: {}", item.content),
                    item.timestamp_us,
                );
                context.confidence = item.confidence;
                request.add_context_item(context);
            }

            let response = oracle.submit(request);
            if response.success {
                return response.reasoning;
            }
        }

        let mut status = format!(
            "Cognitive Status at {}\n\n",
            timestamp_to_datetime(now_us()).format("%Y-%m-%d %H:%M:%S")
        );

        status.push_str(&format!("Active Goals ({}):\n", active_goals.len()));
        for goal in &active_goals {
            status.push_str(&format!(
                "- {} (Priority: {:?}, Progress: {:.0}%)\n",
                goal.description,
                goal.priority,
                goal.progress * 100.0
            ));
        }

        status.push_str(&format!("\nOngoing Actions ({}):\n", ongoing_actions.len()));
        for action in &ongoing_actions {
            status.push_str(&format!(
                "- {} (Priority: {:.2})\n",
                action.description, action.priority
            ));
        }

        status.push_str("\nRecent Knowledge:\n");
        for item in self.query_knowledge("", 5) {
            status.push_str(&format!(
                "- {} (Confidence: {:.2})\n",
                item.content, item.confidence
            ));
        }

        status
    }
}

/// Sentences that look like insights, filtered by the indicator vocabulary
fn extract_insights(text: &str, max_insights: usize) -> Vec<String> {
    extract_sentences(text)
        .into_iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            INSIGHT_INDICATORS
                .iter()
                .any(|indicator| lower.contains(indicator))
        })
        .take(max_insights)
        .collect()
}

/// Leading sentences without any indicator filtering
fn extract_insights_plain(text: &str, max_insights: usize) -> Vec<String> {
    extract_sentences(text).into_iter().take(max_insights).collect()
}

fn extract_sentences(text: &str) -> Vec<String> {
    SENTENCES
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.len() > 10)
        .collect()
}
