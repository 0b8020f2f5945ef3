//! Subject & Strategy Manager
//!
//! Cross-camera entity tracking, incident lifecycle and strategic plan
//! generation. Each state store (cameras, subjects, incidents, plans) sits
//! behind its own lock; cross-store operations take one lock at a time.

pub mod types;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use crate::constants::{
    INCIDENT_STALE_TIMEOUT_SECS, PLAN_RETENTION_HOURS, SUBJECT_IDLE_TIMEOUT_SECS,
};
use crate::logic::observation::{DetectedObject, FrameAnalysisResult};
use crate::logic::oracle::{
    ContextItem, ContextItemType, OracleManager, OracleRequest, RequestPriority, RequestType,
};

pub use types::{
    CameraInfo, CameraPosition, IncidentSeverity, IncidentStatus, IncidentType,
    MonitoringStrategy, MonitoringType, PlanAction, PlanStatus, PositionRecord, SecurityIncident,
    StrategicPlan, TrackedSubject,
};

fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

pub struct StrategyManager {
    system_id: String,
    oracle: Option<Arc<OracleManager>>,
    cameras: Mutex<HashMap<String, CameraInfo>>,
    subjects: Mutex<HashMap<String, TrackedSubject>>,
    incidents: Mutex<HashMap<String, SecurityIncident>>,
    plans: Mutex<HashMap<String, StrategicPlan>>,
}

impl StrategyManager {
    pub fn new(system_id: &str, oracle: Option<Arc<OracleManager>>) -> Self {
        Self {
            system_id: system_id.to_string(),
            oracle,
            cameras: Mutex::new(HashMap::new()),
            subjects: Mutex::new(HashMap::new()),
            incidents: Mutex::new(HashMap::new()),
            plans: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Camera topology
    // ------------------------------------------------------------------

    /// Register cameras from a JSON topology document
    pub fn configure(&self, config: &serde_json::Value) {
        let cameras = match config.get("cameras").and_then(|v| v.as_array()) {
            Some(cameras) => cameras,
            None => return,
        };

        for entry in cameras {
            match serde_json::from_value::<CameraInfo>(entry.clone()) {
                Ok(camera) => self.register_camera(camera),
                Err(e) => log::warn!("Skipping malformed camera entry: {}", e),
            }
        }
    }

    pub fn register_camera(&self, camera: CameraInfo) {
        log::info!("Registered camera {} ({})", camera.device_id, camera.name);
        self.cameras.lock().insert(camera.device_id.clone(), camera);
    }

    pub fn update_camera_status(&self, camera_id: &str, is_active: bool) {
        if let Some(camera) = self.cameras.lock().get_mut(camera_id) {
            camera.is_active = is_active;
        }
    }

    pub fn adjacent_cameras(&self, camera_id: &str) -> Vec<String> {
        self.cameras
            .lock()
            .get(camera_id)
            .map(|c| c.adjacent_cameras.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Frame path
    // ------------------------------------------------------------------

    /// Fold an observation into the tracked state and open incidents for
    /// anomalies. Also runs the periodic cleanup sweeps.
    pub fn process_analysis_result(&self, camera_id: &str, result: &FrameAnalysisResult) {
        for obj in &result.objects {
            self.update_tracked_subject(camera_id, obj);
        }

        if result.is_anomaly {
            let incident_type = match result.anomaly_type.as_str() {
                "UnknownVisitor" => IncidentType::UnknownVisitor,
                "Loitering" => IncidentType::Loitering,
                "Intrusion" => IncidentType::Intrusion,
                "CrowdFormation" => IncidentType::CrowdFormation,
                "AbnormalMovement" => IncidentType::UnusualMovement,
                "AbandonedObject" => IncidentType::AbandonedObject,
                _ => IncidentType::SuspiciousBehavior,
            };

            let severity = if result.anomaly_score > 0.85 {
                IncidentSeverity::Critical
            } else if result.anomaly_score > 0.7 {
                IncidentSeverity::High
            } else if result.anomaly_score > 0.5 {
                IncidentSeverity::Medium
            } else {
                IncidentSeverity::Low
            };

            self.create_incident(
                incident_type,
                severity,
                camera_id,
                &result.anomaly_description,
            );
        }

        self.cleanup_old_data(Utc::now());
    }

    /// Update (or create) the tracked subject matching a detection.
    /// Only people and vehicles are tracked.
    pub fn update_tracked_subject(&self, camera_id: &str, obj: &DetectedObject) -> bool {
        if !obj.is_person() && !obj.is_vehicle() {
            return false;
        }

        let now = Utc::now();
        let mut subjects = self.subjects.lock();

        let subject_id = match self.match_object_to_subject(&subjects, obj) {
            Some(id) => id,
            None => {
                let id = if obj.track_id.is_empty() {
                    generate_id("SUBJ")
                } else {
                    obj.track_id.clone()
                };
                let mut subject = TrackedSubject::new(&id, &obj.type_id, now);
                for (key, value) in &obj.attributes {
                    subject.attributes.insert(key.clone(), value.clone());
                }
                subjects.insert(id.clone(), subject);
                id
            }
        };

        match subjects.get_mut(&subject_id) {
            Some(subject) => {
                subject.update(camera_id, obj, now);
                true
            }
            None => false,
        }
    }

    /// Matching is by tracking-id equality only. Subjects that drop their id
    /// and reappear under a new one become new subjects.
    /// TODO: appearance-based re-identification would need a feature store.
    fn match_object_to_subject(
        &self,
        subjects: &HashMap<String, TrackedSubject>,
        obj: &DetectedObject,
    ) -> Option<String> {
        if obj.track_id.is_empty() {
            return None;
        }
        subjects.get(&obj.track_id).map(|s| s.track_id.clone())
    }

    // ------------------------------------------------------------------
    // Incidents & plans
    // ------------------------------------------------------------------

    /// Open a new incident and immediately generate a plan for it
    pub fn create_incident(
        &self,
        incident_type: IncidentType,
        severity: IncidentSeverity,
        camera_id: &str,
        description: &str,
    ) -> String {
        let now = Utc::now();
        let mut incident = SecurityIncident::new(
            generate_id("INC"),
            incident_type,
            severity,
            camera_id,
            description,
            now,
        );
        incident.add_response_action(
            "INCIDENT_CREATED",
            "Incident created automatically by system",
            "system",
            now,
        );
        let incident_id = incident.incident_id.clone();

        self.incidents
            .lock()
            .insert(incident_id.clone(), incident);

        log::info!(
            "Incident {} opened on camera {} ({:?}/{:?})",
            incident_id,
            camera_id,
            incident_type,
            severity
        );

        self.generate_plan(&incident_id);
        incident_id
    }

    pub fn update_incident(
        &self,
        incident_id: &str,
        status: IncidentStatus,
        updated_by: &str,
    ) -> bool {
        let updated = {
            let mut incidents = self.incidents.lock();
            match incidents.get_mut(incident_id) {
                Some(incident) => {
                    incident.update_status(status, updated_by, Utc::now());
                    true
                }
                None => false,
            }
        };

        if updated && status.is_closed() {
            let now = Utc::now();
            let mut plans = self.plans.lock();
            for plan in plans.values_mut() {
                if plan.incident_id == incident_id {
                    plan.update_status(PlanStatus::Completed, now);
                }
            }
        }

        updated
    }

    /// Generate a strategic plan for an incident, returning its id
    pub fn generate_plan(&self, incident_id: &str) -> Option<String> {
        let incident = self.incidents.lock().get(incident_id).cloned()?;
        let plan = self.build_plan(&incident);
        let plan_id = plan.plan_id.clone();
        self.plans.lock().insert(plan_id.clone(), plan);
        Some(plan_id)
    }

    pub fn update_plan(&self, plan_id: &str, status: PlanStatus) -> bool {
        let mut plans = self.plans.lock();
        match plans.get_mut(plan_id) {
            Some(plan) => {
                plan.update_status(status, Utc::now());
                true
            }
            None => false,
        }
    }

    fn build_plan(&self, incident: &SecurityIncident) -> StrategicPlan {
        let now = Utc::now();
        let mut plan = StrategicPlan::new(
            generate_id("PLAN"),
            &incident.incident_id,
            &format!("Response plan for {}", incident.description),
            now,
        );
        plan.status = PlanStatus::Active;

        // Default strategy: watch the primary camera plus its neighbors
        let mut camera_ids: std::collections::BTreeSet<String> =
            std::collections::BTreeSet::new();
        camera_ids.insert(incident.primary_camera_id.clone());
        for adjacent in self.adjacent_cameras(&incident.primary_camera_id) {
            camera_ids.insert(adjacent);
        }

        plan.add_monitoring_strategy(
            MonitoringStrategy {
                subject_id: String::new(),
                monitoring_type: MonitoringType::Active,
                priority_score: 0.7,
                camera_ids,
                start_time: now,
                duration_minutes: 30,
                reason: "Incident response".to_string(),
                sampling_rate: 5,
                enable_prediction: true,
                alert_on_loss: true,
                cross_camera_tracking: true,
            },
            now,
        );

        let oracle_actions = self.plan_actions_with_oracle(incident);

        match oracle_actions {
            Some(actions) if !actions.is_empty() => {
                for (i, description) in actions.iter().enumerate() {
                    let priority = 10 - i as i32;
                    let due = now + Duration::minutes(5 * i as i64);
                    plan.add_action(description, priority, due, now);
                }
            }
            _ => {
                for (i, description) in incident.recommended_actions().iter().enumerate() {
                    let priority = 10 - i as i32;
                    let due = now + Duration::minutes(5 * i as i64);
                    plan.add_action(description, priority, due, now);
                }
            }
        }

        plan
    }

    /// Ask the oracle for plan actions; None means "use the fallback table".
    /// Monitor-type actions are skipped, the monitoring strategy covers them.
    fn plan_actions_with_oracle(&self, incident: &SecurityIncident) -> Option<Vec<String>> {
        let oracle = self.oracle.as_ref()?;

        let mut request = OracleRequest::new(
            &incident.primary_camera_id,
            RequestType::ResponsePlanning,
            RequestPriority::High,
        );

        let mut item = ContextItem::new(
            ContextItemType::AnomalyDetection,
            format!(
                "Incident: {} - {}",
                incident.incident_id, incident.description
            ),
            incident.start_time.timestamp_micros(),
        );
        item.metadata = json!({
            "incidentId": incident.incident_id,
            "severity": format!("{:?}", incident.severity),
            "status": incident.status.as_str(),
            "cameraId": incident.primary_camera_id,
        });
        request.add_context_item(item);

        for subject_id in &incident.related_subject_ids {
            let subject = self.subjects.lock().get(subject_id).cloned();
            if let Some(subject) = subject {
                let mut item = ContextItem::new(
                    ContextItemType::ObjectDetection,
                    format!("Subject: {} - {}", subject.track_id, subject.subject_type),
                    subject.last_seen.timestamp_micros(),
                );
                item.metadata = json!({
                    "subjectId": subject.track_id,
                    "threatScore": subject.threat_score,
                    "status": subject.status,
                });
                request.add_context_item(item);
            }
        }

        let response = oracle.submit(request);
        if !response.success {
            return None;
        }

        Some(
            response
                .actions
                .iter()
                .filter(|a| a.action_type != crate::logic::oracle::OracleActionType::Monitor)
                .map(|a| a.description.clone())
                .collect(),
        )
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Open incidents sorted by severity (highest first), then newest first
    pub fn get_active_incidents(&self) -> Vec<SecurityIncident> {
        let incidents = self.incidents.lock();
        let mut active: Vec<SecurityIncident> = incidents
            .values()
            .filter(|i| !i.status.is_closed())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.start_time.cmp(&a.start_time))
        });
        active
    }

    pub fn get_active_plans(&self) -> Vec<StrategicPlan> {
        self.plans
            .lock()
            .values()
            .filter(|p| p.status == PlanStatus::Active)
            .cloned()
            .collect()
    }

    /// Tracked subjects sorted by threat score, highest first
    pub fn get_tracked_subjects(&self) -> Vec<TrackedSubject> {
        let subjects = self.subjects.lock();
        let mut list: Vec<TrackedSubject> = subjects.values().cloned().collect();
        list.sort_by(|a, b| {
            b.threat_score
                .partial_cmp(&a.threat_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        list
    }

    /// Threat score including severity-weighted boosts from incidents the
    /// subject is associated with, clamped to [0,1]
    pub fn calculate_threat_score(&self, subject: &TrackedSubject) -> f32 {
        let mut score = subject.threat_score;

        {
            let incidents = self.incidents.lock();
            for incident in incidents.values() {
                if incident.status.is_closed() {
                    continue;
                }
                if incident
                    .related_subject_ids
                    .iter()
                    .any(|id| id == &subject.track_id)
                {
                    score += match incident.severity {
                        IncidentSeverity::Critical => 0.3,
                        IncidentSeverity::High => 0.2,
                        IncidentSeverity::Medium => 0.1,
                        IncidentSeverity::Low => 0.05,
                    };
                }
            }
        }

        score.clamp(0.0, 1.0)
    }

    /// Associate a tracked subject with an incident
    pub fn link_subject_to_incident(&self, incident_id: &str, subject_id: &str) -> bool {
        let mut incidents = self.incidents.lock();
        match incidents.get_mut(incident_id) {
            Some(incident) => {
                if !incident
                    .related_subject_ids
                    .iter()
                    .any(|id| id == subject_id)
                {
                    incident.related_subject_ids.push(subject_id.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Predicted position of a subject after `seconds_ahead`
    pub fn predict_subject_position(
        &self,
        subject_id: &str,
        seconds_ahead: f32,
    ) -> Option<PositionRecord> {
        let subjects = self.subjects.lock();
        let subject = subjects.get(subject_id)?;
        let last = subject.position_history.last()?;

        if subject.position_history.len() < 2 {
            return Some(last.clone());
        }

        Some(PositionRecord {
            camera_id: last.camera_id.clone(),
            timestamp: Utc::now() + Duration::milliseconds((seconds_ahead * 1000.0) as i64),
            normalized_position: subject.predict_next_position(seconds_ahead),
        })
    }

    /// The camera most worth watching: highest-severity incident first, then
    /// highest-threat subject, then any active camera.
    pub fn get_recommended_camera(&self) -> Option<String> {
        let incidents = self.get_active_incidents();
        if let Some(incident) = incidents.first() {
            return Some(incident.primary_camera_id.clone());
        }

        let subjects = self.get_tracked_subjects();
        if let Some(subject) = subjects.first() {
            if let Some(last) = subject.position_history.last() {
                return Some(last.camera_id.clone());
            }
        }

        let cameras = self.cameras.lock();
        cameras
            .values()
            .find(|c| c.is_active)
            .map(|c| c.device_id.clone())
    }

    /// Situation report via the oracle, with a deterministic text fallback
    pub fn generate_situation_report(&self) -> String {
        let incidents = self.get_active_incidents();
        let subjects = self.get_tracked_subjects();

        if let Some(oracle) = self.oracle.as_ref() {
            let mut request = OracleRequest::new(
                &self.system_id,
                RequestType::SituationAssessment,
                RequestPriority::Medium,
            );

            for incident in &incidents {
                let mut item = ContextItem::new(
                    ContextItemType::AnomalyDetection,
                    format!(
                        "Incident: {} - {}",
                        incident.incident_id, incident.description
                    ),
                    incident.start_time.timestamp_micros(),
                );
                item.metadata = json!({
                    "incidentId": incident.incident_id,
                    "severity": format!("{:?}", incident.severity),
                    "status": incident.status.as_str(),
                    "cameraId": incident.primary_camera_id,
                });
                request.add_context_item(item);
            }

            for subject in subjects.iter().filter(|s| s.is_active) {
                let mut item = ContextItem::new(
                    ContextItemType::ObjectDetection,
                    format!("Subject: {} - {}", subject.track_id, subject.subject_type),
                    subject.last_seen.timestamp_micros(),
                );
                item.metadata = json!({
                    "subjectId": subject.track_id,
                    "threatScore": subject.threat_score,
                    "status": subject.status,
                });
                request.add_context_item(item);
            }

            {
                let cameras = self.cameras.lock();
                for camera in cameras.values() {
                    let mut item = ContextItem::new(
                        ContextItemType::EnvironmentInfo,
                        format!("Camera: {} - {}", camera.device_id, camera.name),
                        crate::logic::features::now_us(),
                    );
                    item.metadata = json!({
                        "cameraId": camera.device_id,
                        "location": camera.location,
                        "isActive": camera.is_active,
                    });
                    request.add_context_item(item);
                }
            }

            let response = oracle.submit(request);
            if response.success {
                return response.reasoning;
            }
        }

        // Deterministic fallback report
        let mut report = String::new();
        report.push_str(&format!("Security situation for {}\n", self.system_id));
        report.push_str(&format!("Active incidents: {}\n", incidents.len()));
        for incident in &incidents {
            report.push_str(&format!(
                "- {} [{:?}/{:?}] on {}: {}\n",
                incident.incident_id,
                incident.incident_type,
                incident.severity,
                incident.primary_camera_id,
                incident.description
            ));
        }
        report.push_str(&format!("Tracked subjects: {}\n", subjects.len()));
        for subject in subjects.iter().take(5) {
            report.push_str(&format!(
                "- {} ({}) threat {:.2}\n",
                subject.track_id, subject.subject_type, subject.threat_score
            ));
        }
        report
    }

    // ------------------------------------------------------------------
    // Cleanup
    // ------------------------------------------------------------------

    /// Drop idle subjects, force-resolve stale incidents, drop old plans
    fn cleanup_old_data(&self, now: DateTime<Utc>) {
        {
            let mut subjects = self.subjects.lock();
            subjects.retain(|_, subject| {
                (now - subject.last_seen).num_seconds() <= SUBJECT_IDLE_TIMEOUT_SECS
            });
        }

        {
            let mut incidents = self.incidents.lock();
            for incident in incidents.values_mut() {
                if incident.status.is_closed() {
                    continue;
                }
                if (now - incident.update_time).num_seconds() > INCIDENT_STALE_TIMEOUT_SECS {
                    incident.update_status(IncidentStatus::Resolved, "system_timeout", now);
                }
            }
        }

        {
            let mut plans = self.plans.lock();
            plans.retain(|_, plan| {
                plan.status == PlanStatus::Active
                    || (now - plan.create_time).num_hours() <= PLAN_RETENTION_HOURS
            });
        }
    }
}
