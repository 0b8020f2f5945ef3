//! Strategy Types
//!
//! Cross-camera topology, tracked subjects, incidents and strategic plans.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::observation::DetectedObject;

/// Predicted positions within this margin of a frame edge trigger
/// next-camera prediction
const EDGE_MARGIN: f32 = 0.1;

// ============================================================================
// CAMERA TOPOLOGY
// ============================================================================

/// Spatial position of a camera on the site map
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Static topology node for one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInfo {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub position: CameraPosition,
    #[serde(default = "default_view_angle")]
    pub view_angle: f32,
    #[serde(default = "default_view_distance")]
    pub view_distance: f32,
    #[serde(default)]
    pub adjacent_cameras: BTreeSet<String>,
}

fn default_active() -> bool {
    true
}

fn default_view_angle() -> f32 {
    90.0
}

fn default_view_distance() -> f32 {
    10.0
}

impl CameraInfo {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            name: device_id.to_string(),
            location: String::new(),
            is_active: true,
            position: CameraPosition::default(),
            view_angle: default_view_angle(),
            view_distance: default_view_distance(),
            adjacent_cameras: BTreeSet::new(),
        }
    }
}

// ============================================================================
// TRACKED SUBJECTS
// ============================================================================

/// One sighting of a subject on one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    /// Frame coordinates, 0.0-1.0
    pub normalized_position: (f32, f32),
}

/// A subject tracked across cameras by its detector tracking id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSubject {
    pub track_id: String,
    /// "person", "vehicle", ...
    pub subject_type: String,
    pub attributes: HashMap<String, String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub is_active: bool,
    /// 0.0-1.0, adjusted in small increments
    pub threat_score: f32,
    /// "tracking", "lost", "verified", ...
    pub status: String,
    pub position_history: Vec<PositionRecord>,
    /// Appearance timestamps per camera
    pub camera_appearances: HashMap<String, Vec<DateTime<Utc>>>,
}

impl TrackedSubject {
    pub fn new(track_id: &str, subject_type: &str, now: DateTime<Utc>) -> Self {
        Self {
            track_id: track_id.to_string(),
            subject_type: subject_type.to_string(),
            attributes: HashMap::new(),
            first_seen: now,
            last_seen: now,
            is_active: true,
            threat_score: 0.0,
            status: "tracking".to_string(),
            position_history: Vec::new(),
            camera_appearances: HashMap::new(),
        }
    }

    /// Fold a new detection into the subject
    pub fn update(&mut self, camera_id: &str, obj: &DetectedObject, now: DateTime<Utc>) {
        self.last_seen = now;
        self.is_active = true;

        self.position_history.push(PositionRecord {
            camera_id: camera_id.to_string(),
            timestamp: now,
            normalized_position: obj.bounding_box.normalized_center(),
        });

        self.camera_appearances
            .entry(camera_id.to_string())
            .or_default()
            .push(now);

        for (key, value) in &obj.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }

        if obj.is_unknown() {
            self.threat_score = (self.threat_score + 0.05).min(1.0);
        }
    }

    /// Normalized positions of the whole path
    pub fn path_line(&self) -> Vec<(f32, f32)> {
        self.position_history
            .iter()
            .map(|p| p.normalized_position)
            .collect()
    }

    /// The most recent record plus the best predecessor: same-camera when one
    /// exists, otherwise the most recent overall.
    fn last_two_records(&self) -> Option<(&PositionRecord, &PositionRecord)> {
        if self.position_history.len() < 2 {
            return None;
        }
        let last = self.position_history.last().unwrap();
        let prev = self.position_history[..self.position_history.len() - 1]
            .iter()
            .rev()
            .find(|r| r.camera_id == last.camera_id)
            .unwrap_or(&self.position_history[self.position_history.len() - 2]);
        Some((last, prev))
    }

    /// Normalized velocity (units per second) from the last two records
    fn velocity(&self) -> Option<(f32, f32)> {
        let (last, prev) = self.last_two_records()?;
        let dt = (last.timestamp - prev.timestamp).num_milliseconds() as f32 / 1000.0;
        let dt = dt.max(0.001);
        Some((
            (last.normalized_position.0 - prev.normalized_position.0) / dt,
            (last.normalized_position.1 - prev.normalized_position.1) / dt,
        ))
    }

    /// Linear extrapolation of the next position, clamped to the frame
    pub fn predict_next_position(&self, seconds_ahead: f32) -> (f32, f32) {
        let last = match self.position_history.last() {
            Some(last) => last,
            None => return (0.5, 0.5),
        };

        match self.velocity() {
            Some((vx, vy)) => (
                (last.normalized_position.0 + vx * seconds_ahead).clamp(0.0, 1.0),
                (last.normalized_position.1 + vy * seconds_ahead).clamp(0.0, 1.0),
            ),
            None => last.normalized_position,
        }
    }

    /// Heading in radians, 0 = east, counter-clockwise. Screen y grows
    /// downward, hence the negation.
    pub fn trajectory_angle(&self) -> f32 {
        match self.last_two_records() {
            Some((last, prev)) => {
                let dx = last.normalized_position.0 - prev.normalized_position.0;
                let dy = last.normalized_position.1 - prev.normalized_position.1;
                (-dy).atan2(dx)
            }
            None => 0.0,
        }
    }

    /// Speed in normalized units per second
    pub fn speed(&self) -> f32 {
        match self.velocity() {
            Some((vx, vy)) => (vx * vx + vy * vy).sqrt(),
            None => 0.0,
        }
    }

    /// Cameras where the subject might appear next. Only predicts when the
    /// extrapolated position is near a frame edge, using adjacency plus the
    /// relative spatial position of the neighbors.
    pub fn predict_next_cameras(&self, cameras: &HashMap<String, CameraInfo>) -> Vec<String> {
        let mut predicted = Vec::new();

        let current_camera_id = match self.position_history.last() {
            Some(last) => &last.camera_id,
            None => return predicted,
        };
        let current = match cameras.get(current_camera_id) {
            Some(info) => info,
            None => return predicted,
        };
        if current.adjacent_cameras.is_empty() {
            return predicted;
        }

        let next = self.predict_next_position(5.0);
        let near_edge = next.0 < EDGE_MARGIN
            || next.0 > 1.0 - EDGE_MARGIN
            || next.1 < EDGE_MARGIN
            || next.1 > 1.0 - EDGE_MARGIN;
        if !near_edge {
            return predicted;
        }

        let mut push_if = |check: &dyn Fn(&CameraInfo) -> bool| {
            for adj_id in &current.adjacent_cameras {
                if let Some(adj) = cameras.get(adj_id) {
                    if check(adj) {
                        predicted.push(adj_id.clone());
                    }
                }
            }
        };

        if next.0 < EDGE_MARGIN {
            push_if(&|adj| adj.position.x < current.position.x);
        } else if next.0 > 1.0 - EDGE_MARGIN {
            push_if(&|adj| adj.position.x > current.position.x);
        }

        if next.1 < EDGE_MARGIN {
            push_if(&|adj| adj.position.y < current.position.y);
        } else if next.1 > 1.0 - EDGE_MARGIN {
            push_if(&|adj| adj.position.y > current.position.y);
        }

        predicted.sort();
        predicted.dedup();
        predicted
    }
}

// ============================================================================
// SECURITY INCIDENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentType {
    UnknownVisitor,
    Loitering,
    Intrusion,
    CrowdFormation,
    UnusualMovement,
    SuspiciousBehavior,
    AbandonedObject,
    TrackingLost,
    SystemAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentStatus {
    New,
    Investigating,
    Confirmed,
    FalseAlarm,
    Resolved,
}

impl IncidentStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::FalseAlarm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::New => "NEW",
            IncidentStatus::Investigating => "INVESTIGATING",
            IncidentStatus::Confirmed => "CONFIRMED",
            IncidentStatus::FalseAlarm => "FALSE_ALARM",
            IncidentStatus::Resolved => "RESOLVED",
        }
    }
}

/// One entry in an incident's append-only response log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentAction {
    pub action_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub initiated_by: String,
    pub is_complete: bool,
}

/// A stateful record of a confirmed or suspected security event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityIncident {
    pub incident_id: String,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub primary_camera_id: String,
    pub related_camera_ids: Vec<String>,
    pub related_subject_ids: Vec<String>,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub resolve_time: Option<DateTime<Utc>>,
    pub response_log: Vec<IncidentAction>,
}

impl SecurityIncident {
    pub fn new(
        incident_id: String,
        incident_type: IncidentType,
        severity: IncidentSeverity,
        camera_id: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            incident_id,
            incident_type,
            severity,
            status: IncidentStatus::New,
            primary_camera_id: camera_id.to_string(),
            related_camera_ids: Vec::new(),
            related_subject_ids: Vec::new(),
            description: description.to_string(),
            start_time: now,
            update_time: now,
            resolve_time: None,
            response_log: Vec::new(),
        }
    }

    pub fn add_response_action(
        &mut self,
        action_type: &str,
        description: &str,
        initiated_by: &str,
        now: DateTime<Utc>,
    ) {
        self.response_log.push(IncidentAction {
            action_type: action_type.to_string(),
            description: description.to_string(),
            timestamp: now,
            initiated_by: initiated_by.to_string(),
            is_complete: false,
        });
        self.update_time = now;
    }

    pub fn update_status(&mut self, status: IncidentStatus, updated_by: &str, now: DateTime<Utc>) {
        self.status = status;
        self.add_response_action(
            "STATUS_CHANGE",
            &format!("Incident status changed to {}", status.as_str()),
            updated_by,
            now,
        );
        if status.is_closed() {
            self.resolve_time = Some(now);
        }
    }

    /// Severity heuristic for expected handling time
    pub fn estimate_time_to_resolution(&self) -> Duration {
        match self.severity {
            IncidentSeverity::Low => Duration::minutes(15),
            IncidentSeverity::Medium => Duration::minutes(30),
            IncidentSeverity::High => Duration::hours(1),
            IncidentSeverity::Critical => Duration::hours(2),
        }
    }

    /// Fixed next-step recommendations per incident type, with escalation
    /// extras for HIGH/CRITICAL
    pub fn recommended_actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = match self.incident_type {
            IncidentType::UnknownVisitor => vec![
                "Verify visitor identity",
                "Check access authorization",
                "Monitor visitor movements",
            ],
            IncidentType::Loitering => vec![
                "Monitor subject behavior",
                "Verify if subject has legitimate business",
                "Check adjacent cameras",
            ],
            IncidentType::Intrusion => vec![
                "Verify intrusion detection",
                "Alert security personnel",
                "Initiate area lockdown",
                "Track intruder movements",
            ],
            IncidentType::CrowdFormation => vec![
                "Monitor crowd size and behavior",
                "Check for authorized gathering",
                "Alert security if crowd grows",
            ],
            IncidentType::UnusualMovement => vec![
                "Continue tracking subject",
                "Monitor behavior for further anomalies",
                "Check for correlated activities",
            ],
            IncidentType::SuspiciousBehavior => vec![
                "Closely observe behavior",
                "Check for associated objects or activities",
                "Prepare for intervention if behavior escalates",
            ],
            IncidentType::AbandonedObject => vec![
                "Verify object is unattended",
                "Track when and who left the object",
                "Assess potential threat",
            ],
            IncidentType::TrackingLost => vec![
                "Check adjacent cameras",
                "Review last known direction",
                "Set up alerts for subject reappearance",
            ],
            IncidentType::SystemAlert => vec![
                "Verify alert details",
                "Check system status",
                "Follow system alert protocol",
            ],
        }
        .into_iter()
        .map(String::from)
        .collect();

        if matches!(
            self.severity,
            IncidentSeverity::High | IncidentSeverity::Critical
        ) {
            actions.push("Escalate to supervisor".to_string());
            actions.push("Prepare immediate response team".to_string());
        }

        actions
    }
}

// ============================================================================
// MONITORING STRATEGIES & PLANS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitoringType {
    Passive,
    Active,
    Priority,
    Tracking,
}

/// How to watch a subject or area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStrategy {
    /// Empty means "all subjects in the incident"
    pub subject_id: String,
    pub monitoring_type: MonitoringType,
    pub priority_score: f32,
    pub camera_ids: BTreeSet<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub reason: String,
    /// Frames per second to analyze while this strategy is active
    pub sampling_rate: u32,
    pub enable_prediction: bool,
    pub alert_on_loss: bool,
    pub cross_camera_tracking: bool,
}

impl MonitoringStrategy {
    /// Cameras to watch: explicit set when configured, else predicted
    /// next-cameras, else the subject's last known camera.
    pub fn cameras_to_watch(
        &self,
        cameras: &HashMap<String, CameraInfo>,
        subject: &TrackedSubject,
    ) -> Vec<String> {
        if !self.camera_ids.is_empty() {
            return self.camera_ids.iter().cloned().collect();
        }

        let mut predicted = subject.predict_next_cameras(cameras);
        if predicted.is_empty() {
            if let Some(last) = subject.position_history.last() {
                predicted.push(last.camera_id.clone());
            }
        }
        predicted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

/// One prioritized step of a strategic plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanAction {
    pub action_id: String,
    pub description: String,
    /// 1-10, higher is more important
    pub priority: i32,
    pub is_complete: bool,
    pub due_time: DateTime<Utc>,
    pub assigned_to: String,
}

/// Monitoring strategies plus an ordered action list for one incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicPlan {
    pub plan_id: String,
    pub incident_id: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub description: String,
    pub monitoring_strategies: Vec<MonitoringStrategy>,
    pub actions: Vec<PlanAction>,
    pub status: PlanStatus,
}

impl StrategicPlan {
    pub fn new(plan_id: String, incident_id: &str, description: &str, now: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            incident_id: incident_id.to_string(),
            create_time: now,
            update_time: now,
            description: description.to_string(),
            monitoring_strategies: Vec::new(),
            actions: Vec::new(),
            status: PlanStatus::Draft,
        }
    }

    pub fn add_monitoring_strategy(&mut self, strategy: MonitoringStrategy, now: DateTime<Utc>) {
        self.monitoring_strategies.push(strategy);
        self.update_time = now;
    }

    /// Append an action and keep the list sorted by priority, highest first
    pub fn add_action(
        &mut self,
        description: &str,
        priority: i32,
        due_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let action = PlanAction {
            action_id: format!("ACT-{}", self.actions.len() + 1),
            description: description.to_string(),
            priority,
            is_complete: false,
            due_time,
            assigned_to: "system".to_string(),
        };
        self.actions.push(action);
        self.update_time = now;
        self.actions.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn update_status(&mut self, status: PlanStatus, now: DateTime<Utc>) {
        self.status = status;
        self.update_time = now;
    }

    pub fn is_complete(&self) -> bool {
        if matches!(self.status, PlanStatus::Completed | PlanStatus::Cancelled) {
            return true;
        }
        self.actions.iter().all(|a| a.is_complete)
    }

    /// First incomplete action, if any
    pub fn next_action(&self) -> Option<&PlanAction> {
        self.actions.iter().find(|a| !a.is_complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::observation::{BoundingBox, DetectedObject};

    fn detection_at(x: f32, y: f32) -> DetectedObject {
        DetectedObject {
            type_id: "person".into(),
            track_id: "p1".into(),
            bounding_box: BoundingBox::new(x * 1920.0 - 50.0, y * 1080.0 - 50.0, 100.0, 100.0),
            ..Default::default()
        }
    }

    fn subject_moving_left() -> TrackedSubject {
        let t0 = Utc::now();
        let mut subject = TrackedSubject::new("p1", "person", t0);
        subject.update("cam-a", &detection_at(0.5, 0.5), t0);
        subject.update(
            "cam-a",
            &detection_at(0.15, 0.5),
            t0 + Duration::seconds(1),
        );
        subject
    }

    #[test]
    fn test_predict_next_position_extrapolates_and_clamps() {
        let subject = subject_moving_left();
        let predicted = subject.predict_next_position(5.0);
        assert_eq!(predicted.0, 0.0);
        assert!((predicted.1 - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_predict_next_cameras_left_edge() {
        // Scenario D: A and B adjacent, B left of A, subject exiting left
        let mut cameras = HashMap::new();
        let mut cam_a = CameraInfo::new("cam-a");
        cam_a.position = CameraPosition {
            x: 10.0,
            y: 0.0,
            z: 0.0,
        };
        cam_a.adjacent_cameras.insert("cam-b".to_string());
        let mut cam_b = CameraInfo::new("cam-b");
        cam_b.position = CameraPosition {
            x: 5.0,
            y: 0.0,
            z: 0.0,
        };
        cam_b.adjacent_cameras.insert("cam-a".to_string());
        cameras.insert("cam-a".to_string(), cam_a);
        cameras.insert("cam-b".to_string(), cam_b);

        let subject = subject_moving_left();
        assert_eq!(subject.predict_next_cameras(&cameras), vec!["cam-b"]);
    }

    #[test]
    fn test_no_camera_prediction_away_from_edges() {
        let mut cameras = HashMap::new();
        let mut cam_a = CameraInfo::new("cam-a");
        cam_a.adjacent_cameras.insert("cam-b".to_string());
        cameras.insert("cam-a".to_string(), cam_a);
        cameras.insert("cam-b".to_string(), CameraInfo::new("cam-b"));

        let t0 = Utc::now();
        let mut subject = TrackedSubject::new("p1", "person", t0);
        subject.update("cam-a", &detection_at(0.5, 0.5), t0);
        subject.update(
            "cam-a",
            &detection_at(0.52, 0.5),
            t0 + Duration::seconds(1),
        );

        assert!(subject.predict_next_cameras(&cameras).is_empty());
    }

    #[test]
    fn test_trajectory_helpers() {
        let subject = subject_moving_left();
        assert_eq!(subject.path_line().len(), 2);

        // Heading west: angle near pi, speed 0.35 normalized units/sec
        let angle = subject.trajectory_angle();
        assert!((angle.abs() - std::f32::consts::PI).abs() < 0.05);
        assert!((subject.speed() - 0.35).abs() < 0.01);
    }

    #[test]
    fn test_cameras_to_watch_prefers_explicit_set() {
        let cameras = HashMap::new();
        let subject = subject_moving_left();

        let mut strategy = MonitoringStrategy {
            subject_id: String::new(),
            monitoring_type: MonitoringType::Active,
            priority_score: 0.7,
            camera_ids: BTreeSet::new(),
            start_time: Utc::now(),
            duration_minutes: 30,
            reason: "test".into(),
            sampling_rate: 5,
            enable_prediction: true,
            alert_on_loss: true,
            cross_camera_tracking: true,
        };

        // No explicit set and no adjacency data: fall back to last camera
        assert_eq!(strategy.cameras_to_watch(&cameras, &subject), vec!["cam-a"]);

        strategy.camera_ids.insert("cam-x".into());
        assert_eq!(strategy.cameras_to_watch(&cameras, &subject), vec!["cam-x"]);
    }

    #[test]
    fn test_resolution_estimate_scales_with_severity() {
        let now = Utc::now();
        let mut incident = SecurityIncident::new(
            "INC-1".into(),
            IncidentType::Loitering,
            IncidentSeverity::Low,
            "cam-a",
            "test",
            now,
        );
        assert_eq!(incident.estimate_time_to_resolution(), Duration::minutes(15));

        incident.severity = IncidentSeverity::Critical;
        assert_eq!(incident.estimate_time_to_resolution(), Duration::hours(2));
    }

    #[test]
    fn test_unknown_detection_raises_threat_score() {
        let t0 = Utc::now();
        let mut subject = TrackedSubject::new("p1", "person", t0);
        let mut obj = detection_at(0.5, 0.5);
        obj.attributes
            .insert("recognitionStatus".into(), "unknown".into());

        for _ in 0..30 {
            subject.update("cam-a", &obj, t0);
        }
        assert_eq!(subject.threat_score, 1.0);
    }

    #[test]
    fn test_incident_status_transitions() {
        let now = Utc::now();
        let mut incident = SecurityIncident::new(
            "INC-1".into(),
            IncidentType::Intrusion,
            IncidentSeverity::High,
            "cam-a",
            "test",
            now,
        );
        assert_eq!(incident.status, IncidentStatus::New);

        incident.update_status(IncidentStatus::Investigating, "operator", now);
        assert!(incident.resolve_time.is_none());

        incident.update_status(IncidentStatus::Resolved, "operator", now);
        assert!(incident.status.is_closed());
        assert!(incident.resolve_time.is_some());
        assert!(incident
            .response_log
            .iter()
            .any(|a| a.description.contains("RESOLVED")));
    }

    #[test]
    fn test_recommended_actions_escalate_for_critical() {
        let now = Utc::now();
        let incident = SecurityIncident::new(
            "INC-1".into(),
            IncidentType::Intrusion,
            IncidentSeverity::Critical,
            "cam-a",
            "test",
            now,
        );
        let actions = incident.recommended_actions();
        assert!(actions.contains(&"Initiate area lockdown".to_string()));
        assert!(actions.contains(&"Escalate to supervisor".to_string()));
    }

    #[test]
    fn test_plan_actions_sorted_by_priority() {
        let now = Utc::now();
        let mut plan = StrategicPlan::new("PLAN-1".into(), "INC-1", "test plan", now);
        plan.add_action("low", 2, now, now);
        plan.add_action("high", 9, now, now);
        plan.add_action("mid", 5, now, now);

        let priorities: Vec<i32> = plan.actions.iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![9, 5, 2]);
        assert_eq!(plan.next_action().unwrap().description, "high");
        assert!(!plan.is_complete());
    }
}
