//! Cognitive Types
//!
//! Goals, knowledge, reasoning steps and agent actions, plus the internal
//! work-queue task.

use serde::{Deserialize, Serialize};

use crate::constants::KNOWLEDGE_VALIDITY_US;
use crate::logic::observation::FrameAnalysisResult;

// ============================================================================
// GOALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalType {
    Monitor,
    Detect,
    Track,
    Verify,
    Respond,
    Prevent,
    Optimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Pending,
    InProgress,
    Achieved,
    Failed,
    Abandoned,
}

/// Ordered most-important-first, so sorting ascending puts CRITICAL goals at
/// the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalPriority {
    Critical,
    High,
    Medium,
    Low,
    Background,
}

/// An objective the agent is pursuing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub goal_type: GoalType,
    pub description: String,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub creation_time_us: i64,
    /// 0 means no deadline
    pub deadline_us: i64,
    pub parent_goal_id: String,
    pub sub_goal_ids: Vec<String>,
    pub depends_on_goal_ids: Vec<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    /// 0.0-1.0
    pub progress: f32,
    pub last_update_time_us: i64,
    pub result_description: String,
}

impl Goal {
    pub fn new(
        id: String,
        goal_type: GoalType,
        description: &str,
        priority: GoalPriority,
        now_us: i64,
    ) -> Self {
        Self {
            id,
            goal_type,
            description: description.to_string(),
            status: GoalStatus::Pending,
            priority,
            creation_time_us: now_us,
            deadline_us: 0,
            parent_goal_id: String::new(),
            sub_goal_ids: Vec::new(),
            depends_on_goal_ids: Vec::new(),
            parameters: serde_json::Value::Null,
            progress: 0.0,
            last_update_time_us: now_us,
            result_description: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, GoalStatus::Pending | GoalStatus::InProgress)
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self.status,
            GoalStatus::Achieved | GoalStatus::Failed | GoalStatus::Abandoned
        )
    }

    pub fn is_achievable_by_deadline(&self, current_time_us: i64) -> bool {
        self.deadline_us == 0 || current_time_us < self.deadline_us
    }
}

// ============================================================================
// KNOWLEDGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeType {
    Observation,
    Inference,
    Prediction,
    HistoricalFact,
    ContextualInfo,
    MetaKnowledge,
}

/// A timestamped, confidence-scored fact or belief about the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub item_type: KnowledgeType,
    pub content: String,
    pub confidence: f32,
    pub timestamp_us: i64,
    pub source: String,
    pub related_items: Vec<String>,
}

impl KnowledgeItem {
    /// Whether the item is still within its validity horizon
    pub fn is_valid(&self, current_time_us: i64) -> bool {
        self.is_valid_for(current_time_us, KNOWLEDGE_VALIDITY_US)
    }

    pub fn is_valid_for(&self, current_time_us: i64, timeout_us: i64) -> bool {
        current_time_us - self.timestamp_us < timeout_us
    }
}

// ============================================================================
// REASONING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasoningType {
    Perception,
    SituationAssessment,
    Planning,
    DecisionMaking,
    SelfReflection,
    MetaCognitive,
}

/// One recorded inference step, rule-based or oracle-assisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub id: String,
    pub step_type: ReasoningType,
    pub description: String,
    /// Ids of knowledge items used as input
    pub inputs: Vec<String>,
    /// Ids of knowledge items generated
    pub outputs: Vec<String>,
    pub start_time_us: i64,
    /// 0 while the step is still running
    pub end_time_us: i64,
    pub confidence: f32,
    pub alternatives_considered: Vec<String>,
    /// Free-text reasoning trace
    pub trace: String,
}

// ============================================================================
// ACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    // Camera control
    FocusCamera,
    AdjustAnalysis,
    // Alerting
    GenerateAlert,
    SuppressAlert,
    // Investigation
    GatherContext,
    VerifyAnomaly,
    CorrelateEvents,
    // Response
    InitiateResponse,
    TrackSubject,
    CoordinateSystem,
    // Internal
    UpdateModel,
    LogInformation,
    RequestAssistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// An executable step in service of a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: String,
    pub action_type: ActionType,
    pub description: String,
    pub status: ActionStatus,
    pub goal_id: String,
    pub creation_time_us: i64,
    pub start_time_us: i64,
    pub completion_time_us: i64,
    /// 0.0-1.0, higher is more important
    pub priority: f32,
    pub expected_utility: f32,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub result: String,
}

impl AgentAction {
    pub fn new(
        id: String,
        action_type: ActionType,
        description: &str,
        goal_id: &str,
        priority: f32,
        parameters: serde_json::Value,
        now_us: i64,
    ) -> Self {
        Self {
            id,
            action_type,
            description: description.to_string(),
            status: ActionStatus::Pending,
            goal_id: goal_id.to_string(),
            creation_time_us: now_us,
            start_time_us: 0,
            completion_time_us: 0,
            priority,
            expected_utility: 0.5,
            parameters,
            result: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self.status,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }
}

// ============================================================================
// TASK QUEUE
// ============================================================================

/// Work item for the cognitive worker.
///
/// The priority field is advisory metadata: the queue is strictly FIFO and
/// the consuming worker never reorders by priority.
#[derive(Debug, Clone)]
pub struct Task {
    pub kind: TaskKind,
    pub priority: i32,
    pub creation_time_us: i64,
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    ProcessAnalysis {
        device_id: String,
        result: FrameAnalysisResult,
    },
    UpdateKnowledge,
    EvaluateGoals,
    SelectActions,
    ExecuteAction {
        action_id: String,
    },
    Reflect,
    /// Control message: drains the worker loop
    Shutdown,
}
