use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::record::{lenient_opt_resources, lenient_string, LessonRecord, Resource};
use crate::stages::{raw_stages, Stage, StageList};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no generation endpoint is configured")]
    Unavailable,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GenerateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "generation_unavailable",
            Self::Rejected { .. } => "generation_rejected",
            Self::Transport(_) => "generation_failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub plan_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objectives: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_knowledge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_vocabulary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differentiation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_needs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl GenerationRequest {
    pub fn from_record(record: &LessonRecord) -> Self {
        Self {
            plan_type: record.mode.plan_type().to_string(),
            topic: record.topic.clone(),
            subject: record.subject.clone(),
            year_group: record.year_group.clone(),
            student_name: record.student_name.clone(),
            objectives: record.objectives.clone(),
            outcomes: record.outcomes.clone(),
            prior_knowledge: record.prior_knowledge.clone(),
            key_vocabulary: record.key_vocabulary.clone(),
            differentiation: record.differentiation.clone(),
            assessment_strategy: record.assessment_strategy.clone(),
            student_needs: record.student_needs.clone(),
            duration: record.duration.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    #[serde(default, alias = "learning_objectives", deserialize_with = "lenient_string")]
    pub objectives: Option<String>,
    #[serde(default, alias = "learning_outcomes", deserialize_with = "lenient_string")]
    pub outcomes: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub homework: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub evaluation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(default, alias = "prior_knowledge", deserialize_with = "lenient_string")]
    pub prior_knowledge: Option<String>,
    #[serde(default, alias = "key_vocabulary", deserialize_with = "lenient_string")]
    pub key_vocabulary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub differentiation: Option<String>,
    #[serde(default, alias = "assessment_strategy", deserialize_with = "lenient_string")]
    pub assessment_strategy: Option<String>,
    #[serde(default, alias = "student_needs", deserialize_with = "lenient_string")]
    pub student_needs: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_resources")]
    pub resources: Option<Vec<Resource>>,
    #[serde(default, alias = "lesson_structure", deserialize_with = "lenient_stages")]
    pub lesson_structure: Option<Vec<Stage>>,
}

/// Null or an unusable shape means the endpoint did not supply stages.
fn lenient_stages<'de, D>(deserializer: D) -> Result<Option<Vec<Stage>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(v.and_then(raw_stages))
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl GenerationResponse {
    /// Overwrites only what the response supplies. Blank strings count as absent.
    pub fn merge_into(self, record: &mut LessonRecord) {
        let pairs = [
            (self.objectives, &mut record.objectives),
            (self.outcomes, &mut record.outcomes),
            (self.homework, &mut record.homework),
            (self.evaluation, &mut record.evaluation),
            (self.notes, &mut record.notes),
            (self.prior_knowledge, &mut record.prior_knowledge),
            (self.key_vocabulary, &mut record.key_vocabulary),
            (self.differentiation, &mut record.differentiation),
            (self.assessment_strategy, &mut record.assessment_strategy),
            (self.student_needs, &mut record.student_needs),
        ];
        for (incoming, slot) in pairs {
            if let Some(v) = present(incoming) {
                *slot = Some(v);
            }
        }
        if let Some(resources) = self.resources {
            record.resources = resources;
        }
        if let Some(stages) = self.lesson_structure {
            record.lesson_structure = StageList::normalize(stages);
        }
    }
}

/// The AI-generation collaborator.
pub trait Generator {
    fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GenerateError>;
}

/// Posts the request as JSON. Timeouts are left to the client defaults.
pub struct HttpGenerator {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Generator for HttpGenerator {
    fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GenerateError> {
        log::debug!("generation request planType={} to {}", req.plan_type, self.endpoint);
        let resp = self.client.post(&self.endpoint).json(req).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(GenerateError::Rejected {
                status: status.as_u16(),
                message: error_message_from_body(&body)
                    .unwrap_or_else(|| format!("generation request failed with status {}", status.as_u16())),
            });
        }
        Ok(resp.json::<GenerationResponse>()?)
    }
}

/// Pulls a human message out of `{"error": "..."}`, `{"error": {"message": "..."}}`
/// or `{"message": "..."}`.
pub fn error_message_from_body(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidate = match v.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.as_str()),
        Some(obj) => obj.get("message").and_then(|m| m.as_str()),
        None => None,
    }
    .or_else(|| v.get("message").and_then(|m| m.as_str()));
    candidate
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
