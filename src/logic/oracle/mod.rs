//! Reasoning Oracle
//!
//! Integration with the external natural-language reasoning service. Requests
//! carry a typed context list and are drained by a dedicated worker thread;
//! callers block on a one-shot reply channel with a bounded timeout. The
//! whole system stays functional when no oracle is configured: every caller
//! has a deterministic fallback and treats `success=false` as "use it".

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::logic::config::GlobalSettings;
use crate::logic::features::{now_us, timestamp_to_datetime};
use crate::logic::observation::{DetectedObject, FrameAnalysisResult};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("valid regex"));

// ============================================================================
// CONTEXT ITEMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextItemType {
    ObjectDetection,
    MotionEvent,
    AnomalyDetection,
    EnvironmentInfo,
    HistoricalPattern,
    CrossCameraInfo,
    SystemEvent,
}

impl ContextItemType {
    fn tag(&self) -> &'static str {
        match self {
            ContextItemType::ObjectDetection => "OBJECT",
            ContextItemType::MotionEvent => "MOTION",
            ContextItemType::AnomalyDetection => "ANOMALY",
            ContextItemType::EnvironmentInfo => "INFO",
            ContextItemType::HistoricalPattern => "PATTERN",
            ContextItemType::CrossCameraInfo => "CROSS-CAM",
            ContextItemType::SystemEvent => "SYSTEM",
        }
    }
}

/// One timestamped, confidence-scored fact handed to the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub item_type: ContextItemType,
    pub description: String,
    pub timestamp_us: i64,
    pub confidence: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ContextItem {
    pub fn new(item_type: ContextItemType, description: String, timestamp_us: i64) -> Self {
        Self {
            item_type,
            description,
            timestamp_us,
            confidence: 1.0,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn from_detected_object(obj: &DetectedObject) -> Self {
        let mut description = format!(
            "Detected {} with confidence {:.2} at position [x:{}, y:{}, width:{}, height:{}]",
            obj.type_id,
            obj.confidence,
            obj.bounding_box.x as i32,
            obj.bounding_box.y as i32,
            obj.bounding_box.width as i32,
            obj.bounding_box.height as i32,
        );
        if let Some(status) = obj.attributes.get("recognitionStatus") {
            description.push_str(&format!(" (Recognition: {})", status));
        }

        Self {
            item_type: ContextItemType::ObjectDetection,
            description,
            timestamp_us: obj.timestamp_us,
            confidence: obj.confidence,
            metadata: json!({
                "objectType": obj.type_id,
                "trackId": obj.track_id,
                "attributes": obj.attributes,
            }),
        }
    }

    pub fn from_analysis_result(result: &FrameAnalysisResult) -> Self {
        let (item_type, description, confidence) = if result.is_anomaly {
            (
                ContextItemType::AnomalyDetection,
                format!(
                    "Anomaly detected: {} - {}",
                    result.anomaly_type, result.anomaly_description
                ),
                result.anomaly_score,
            )
        } else if result.motion.overall_motion_level > 0.05 {
            (
                ContextItemType::MotionEvent,
                format!(
                    "Motion detected with level {:.2}",
                    result.motion.overall_motion_level
                ),
                result.motion.overall_motion_level,
            )
        } else {
            (
                ContextItemType::EnvironmentInfo,
                "Normal scene activity".to_string(),
                1.0 - result.anomaly_score,
            )
        };

        Self {
            item_type,
            description,
            timestamp_us: result.timestamp_us,
            confidence,
            metadata: json!({
                "anomalyScore": result.anomaly_score,
                "anomalyType": result.anomaly_type,
                "isAnomaly": result.is_anomaly,
                "motionLevel": result.motion.overall_motion_level,
                "objectCounts": {
                    "person": result.person_count(),
                    "unknownPerson": result.unknown_person_count(),
                    "vehicle": result.vehicle_count(),
                    "total": result.objects.len(),
                },
            }),
        }
    }

    /// Line format handed to the oracle prompt
    pub fn to_prompt_line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            timestamp_to_datetime(self.timestamp_us).format("%Y-%m-%d %H:%M:%S"),
            self.item_type.tag(),
            self.description
        )
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    AnomalyAnalysis,
    SituationAssessment,
    ResponsePlanning,
    PredictiveAnalysis,
    CrossCameraAnalysis,
}

#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub device_id: String,
    pub request_type: RequestType,
    pub priority: RequestPriority,
    pub context_items: Vec<ContextItem>,
    pub request_time_us: i64,
}

impl OracleRequest {
    pub fn new(device_id: &str, request_type: RequestType, priority: RequestPriority) -> Self {
        Self {
            device_id: device_id.to_string(),
            request_type,
            priority,
            context_items: Vec::new(),
            request_time_us: now_us(),
        }
    }

    pub fn add_context_item(&mut self, item: ContextItem) {
        self.context_items.push(item);
    }

    /// Build the full prompt: task header, current time, context sorted
    /// oldest-first, per-type instructions and the JSON output contract.
    pub fn generate_prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(match self.request_type {
            RequestType::AnomalyAnalysis => {
                "TASK: Analyze the anomaly detected in the security camera and provide context.\n\n"
            }
            RequestType::SituationAssessment => {
                "TASK: Assess the overall situation in the security camera view.\n\n"
            }
            RequestType::ResponsePlanning => {
                "TASK: Plan an appropriate response to the situation in the security camera.\n\n"
            }
            RequestType::PredictiveAnalysis => {
                "TASK: Predict potential future behavior based on the observed activity.\n\n"
            }
            RequestType::CrossCameraAnalysis => {
                "TASK: Analyze information from multiple cameras to understand the overall security situation.\n\n"
            }
        });

        prompt.push_str(&format!(
            "CURRENT TIME: {}\n\n",
            timestamp_to_datetime(self.request_time_us).format("%Y-%m-%d %H:%M:%S")
        ));

        prompt.push_str("CONTEXT:\n");
        let mut sorted = self.context_items.clone();
        sorted.sort_by_key(|item| item.timestamp_us);
        for item in &sorted {
            prompt.push_str(&format!("- {}\n", item.to_prompt_line()));
        }

        prompt.push_str("\nINSTRUCTIONS:\n");
        prompt.push_str(match self.request_type {
            RequestType::AnomalyAnalysis => {
                "1. Analyze the anomaly described in the context.\n\
                 2. Determine the potential security implications.\n\
                 3. Assess whether this might be a false alarm or a genuine security concern.\n\
                 4. Provide reasoning for your assessment.\n\
                 5. Recommend whether this requires human attention.\n"
            }
            RequestType::SituationAssessment => {
                "1. Assess the overall situation in the camera view.\n\
                 2. Identify any potential security concerns.\n\
                 3. Consider the time of day and normal patterns for this location.\n\
                 4. Determine the level of concern (Normal, Low, Medium, High).\n\
                 5. Provide reasoning for your assessment.\n"
            }
            RequestType::ResponsePlanning => {
                "1. Analyze the security situation described in the context.\n\
                 2. Determine the appropriate security response level.\n\
                 3. Suggest specific actions that should be taken.\n\
                 4. Prioritize these actions.\n\
                 5. Provide reasoning for your recommendations.\n"
            }
            RequestType::PredictiveAnalysis => {
                "1. Analyze the patterns of behavior described in the context.\n\
                 2. Predict what might happen next based on these patterns.\n\
                 3. Identify potential security implications of these predictions.\n\
                 4. Assign confidence levels to your predictions.\n\
                 5. Suggest what to monitor or look for to confirm your predictions.\n"
            }
            RequestType::CrossCameraAnalysis => {
                "1. Analyze information from multiple cameras to understand the overall situation.\n\
                 2. Identify any connections or patterns across different camera views.\n\
                 3. Determine if there are coordinated activities happening.\n\
                 4. Assess the overall security implications.\n\
                 5. Recommend cameras to focus on and what to look for.\n"
            }
        });

        prompt.push_str(
            "\nOUTPUT FORMAT:\n\
             Provide your response in JSON format with the following structure:\n\
             {\n\
             \x20 \"reasoning\": \"Your detailed analysis and reasoning\",\n\
             \x20 \"confidenceScore\": 0.0-1.0,\n\
             \x20 \"actions\": [\n\
             \x20   {\n\
             \x20     \"type\": \"One of: MONITOR, ALERT, TRACK, ANALYZE_FURTHER, CROSS_REFERENCE, PREDICT, RECOMMEND\",\n\
             \x20     \"description\": \"Description of the action\",\n\
             \x20     \"confidence\": 0.0-1.0,\n\
             \x20     \"parameters\": {}\n\
             \x20   }\n\
             \x20 ]\n\
             }\n",
        );

        prompt
    }

    fn system_prompt(&self) -> &'static str {
        match self.request_type {
            RequestType::AnomalyAnalysis => {
                "You are an AI security analyst specializing in anomaly detection. \
                 Analyze security camera anomalies and provide clear assessment of threats."
            }
            RequestType::SituationAssessment => {
                "You are an AI security situation analyst. \
                 Assess overall security situations from camera feeds and provide comprehensive situation awareness."
            }
            RequestType::ResponsePlanning => {
                "You are an AI security response planner. \
                 Create strategic response plans for security situations that balance caution with appropriate action."
            }
            RequestType::PredictiveAnalysis => {
                "You are an AI security predictive analyst. \
                 Predict future behaviors and potential security implications based on observed patterns."
            }
            RequestType::CrossCameraAnalysis => {
                "You are an AI security correlation specialist. \
                 Analyze information across multiple cameras to identify connections and coordinated activities."
            }
        }
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleActionType {
    Monitor,
    Alert,
    Track,
    AnalyzeFurther,
    CrossReference,
    Predict,
    Recommend,
}

impl OracleActionType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "ALERT" => OracleActionType::Alert,
            "TRACK" => OracleActionType::Track,
            "ANALYZE_FURTHER" => OracleActionType::AnalyzeFurther,
            "CROSS_REFERENCE" => OracleActionType::CrossReference,
            "PREDICT" => OracleActionType::Predict,
            "RECOMMEND" => OracleActionType::Recommend,
            _ => OracleActionType::Monitor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleAction {
    pub action_type: OracleActionType,
    pub description: String,
    pub confidence: f32,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    pub reasoning: String,
    pub actions: Vec<OracleAction>,
    pub confidence_score: f32,
    pub response_time_us: i64,
    pub success: bool,
    pub error_message: String,
}

impl OracleResponse {
    /// Low-confidence failure response used by every degraded path
    pub fn failure(message: &str) -> Self {
        Self {
            reasoning: String::new(),
            actions: Vec::new(),
            confidence_score: 0.0,
            response_time_us: now_us(),
            success: false,
            error_message: message.to_string(),
        }
    }

    /// Parse raw oracle output: prefer a fenced JSON block, else the whole
    /// text. Parse failures become `success=false`, never an error.
    pub fn parse(output: &str) -> Self {
        let json_str = FENCED_JSON
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(output);

        let parsed: serde_json::Value = match serde_json::from_str(json_str) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to parse oracle response: {}", e);
                return Self::failure(&format!("Failed to parse oracle response: {}", e));
            }
        };

        let reasoning = parsed
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let confidence_score = parsed
            .get("confidenceScore")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as f32;

        let mut actions = Vec::new();
        if let Some(list) = parsed.get("actions").and_then(|v| v.as_array()) {
            for entry in list {
                let tag = entry.get("type").and_then(|v| v.as_str()).unwrap_or("");
                actions.push(OracleAction {
                    action_type: OracleActionType::from_tag(tag),
                    description: entry
                        .get("description")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    confidence: entry
                        .get("confidence")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.5) as f32,
                    parameters: entry
                        .get("parameters")
                        .cloned()
                        .unwrap_or(serde_json::Value::Null),
                });
            }
        }

        Self {
            reasoning,
            actions,
            confidence_score,
            response_time_us: now_us(),
            success: true,
            error_message: String::new(),
        }
    }
}

// ============================================================================
// ORACLE MANAGER
// ============================================================================

struct OracleJob {
    request: OracleRequest,
    reply: mpsc::SyncSender<OracleResponse>,
}

/// Drains oracle requests on a dedicated worker thread. Dropping the manager
/// closes the queue and joins the worker.
pub struct OracleManager {
    sender: Mutex<Option<mpsc::Sender<OracleJob>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    timeout: Duration,
}

impl OracleManager {
    pub fn new(settings: &GlobalSettings) -> Self {
        let (sender, receiver) = mpsc::channel::<OracleJob>();
        let endpoint = settings.oracle_endpoint.clone();
        let api_key = settings.oracle_api_key.clone();
        let model = settings.oracle_model.clone();
        let max_tokens = settings.oracle_max_tokens;
        let temperature = settings.oracle_temperature;
        let timeout = Duration::from_secs(settings.oracle_timeout_secs.max(1));

        let worker = thread::spawn(move || {
            log::info!("Oracle worker started (model: {})", model);
            while let Ok(job) = receiver.recv() {
                let response = Self::execute(
                    &job.request,
                    &endpoint,
                    &api_key,
                    &model,
                    max_tokens,
                    temperature,
                    timeout,
                );
                // Caller may have timed out already; nothing to do then
                let _ = job.reply.send(response);
            }
            log::info!("Oracle worker stopped");
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            timeout,
        }
    }

    /// Submit a request and block until a response or the configured timeout.
    /// Every failure mode degrades to a `success=false` response.
    pub fn submit(&self, request: OracleRequest) -> OracleResponse {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);

        {
            let sender = self.sender.lock();
            let sender = match sender.as_ref() {
                Some(sender) => sender,
                None => return OracleResponse::failure("Oracle is shut down"),
            };
            if sender
                .send(OracleJob {
                    request,
                    reply: reply_tx,
                })
                .is_err()
            {
                return OracleResponse::failure("Oracle worker is gone");
            }
        }

        match reply_rx.recv_timeout(self.timeout + Duration::from_secs(1)) {
            Ok(response) => response,
            Err(_) => OracleResponse::failure("Oracle request timed out"),
        }
    }

    /// Stop the worker. Pending requests receive failure responses via their
    /// dropped reply channels.
    pub fn shutdown(&self) {
        *self.sender.lock() = None;
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    fn execute(
        request: &OracleRequest,
        endpoint: &str,
        api_key: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> OracleResponse {
        if api_key.is_empty() {
            return OracleResponse::failure("No oracle API key configured");
        }

        let prompt = request.generate_prompt();
        let body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "system": request.system_prompt(),
            "messages": [{ "role": "user", "content": prompt }],
        });

        let result = ureq::post(endpoint)
            .timeout(timeout)
            .set("Content-Type", "application/json")
            .set("x-api-key", api_key)
            .set("anthropic-version", "2023-06-01")
            .send_json(body);

        let text = match result {
            Ok(response) => match response.into_json::<serde_json::Value>() {
                Ok(value) => value
                    .get("content")
                    .and_then(|c| c.as_array())
                    .and_then(|c| c.first())
                    .and_then(|c| c.get("text"))
                    .and_then(|t| t.as_str())
                    .map(String::from),
                Err(e) => {
                    log::error!("Error parsing oracle API response: {}", e);
                    None
                }
            },
            Err(e) => {
                log::error!("Oracle request failed: {}", e);
                None
            }
        };

        match text {
            Some(text) => OracleResponse::parse(&text),
            None => OracleResponse::failure("Oracle request failed"),
        }
    }
}

impl Drop for OracleManager {
    fn drop(&mut self) {
        *self.sender.lock() = None;
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// CONTEXT STORE
// ============================================================================

/// Rolling store of context items for oracle reasoning
pub struct ContextStore {
    items: Mutex<Vec<ContextItem>>,
}

const MAX_CONTEXT_ITEMS: usize = 1000;

impl ContextStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, item: ContextItem) {
        let mut items = self.items.lock();
        items.push(item);
        if items.len() > MAX_CONTEXT_ITEMS {
            items.remove(0);
        }
    }

    pub fn recent(&self, max_items: usize) -> Vec<ContextItem> {
        let items = self.items.lock();
        let start = items.len().saturating_sub(max_items);
        items[start..].to_vec()
    }

    pub fn clear_older_than(&self, cutoff_us: i64) {
        self.items.lock().retain(|item| item.timestamp_us >= cutoff_us);
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
