use serde::{Deserialize, Deserializer, Serialize};

use crate::mode::Mode;
use crate::stages::StageList;

/// Accepts strings, numbers and booleans as text; null as absent.
/// Stored rows and generated payloads are not consistent about this.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(_) => None,
    })
}

/// An array, or an array that was stored as JSON text.
pub(crate) fn json_array(v: serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match v {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::String(text) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

fn resource_items(v: serde_json::Value) -> Option<Vec<Resource>> {
    let items = json_array(v)?;
    Some(
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Resource>(item).ok())
            .collect(),
    )
}

/// Null or an unusable shape loads as no resources; malformed entries are dropped.
pub fn lenient_resources<'de, D>(deserializer: D) -> Result<Vec<Resource>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(v.and_then(resource_items).unwrap_or_default())
}

/// Like `lenient_resources`, but keeps "not supplied" apart from an empty list.
pub fn lenient_opt_resources<'de, D>(deserializer: D) -> Result<Option<Vec<Resource>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(v.and_then(resource_items))
}

/// Scalar fields of a lesson or session that forms read and write by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LessonField {
    Topic,
    Subject,
    YearGroup,
    ExamBoard,
    Date,
    Time,
    Duration,
    Objectives,
    Outcomes,
    Homework,
    Evaluation,
    Notes,
    StudentName,
    StudentNeeds,
    PriorKnowledge,
    KeyVocabulary,
    Differentiation,
    AssessmentStrategy,
}

impl LessonField {
    pub const ALL: [LessonField; 18] = [
        Self::Topic,
        Self::Subject,
        Self::YearGroup,
        Self::ExamBoard,
        Self::Date,
        Self::Time,
        Self::Duration,
        Self::Objectives,
        Self::Outcomes,
        Self::Homework,
        Self::Evaluation,
        Self::Notes,
        Self::StudentName,
        Self::StudentNeeds,
        Self::PriorKnowledge,
        Self::KeyVocabulary,
        Self::Differentiation,
        Self::AssessmentStrategy,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Subject => "subject",
            Self::YearGroup => "yearGroup",
            Self::ExamBoard => "examBoard",
            Self::Date => "date",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Objectives => "objectives",
            Self::Outcomes => "outcomes",
            Self::Homework => "homework",
            Self::Evaluation => "evaluation",
            Self::Notes => "notes",
            Self::StudentName => "studentName",
            Self::StudentNeeds => "studentNeeds",
            Self::PriorKnowledge => "priorKnowledge",
            Self::KeyVocabulary => "keyVocabulary",
            Self::Differentiation => "differentiation",
            Self::AssessmentStrategy => "assessmentStrategy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == s)
    }
}

/// A lesson plan or tutoring session as persisted. Every scalar is optional
/// because stored rows come from several form generations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: Option<String>,
    #[serde(default, alias = "year_group", deserialize_with = "lenient_string")]
    pub year_group: Option<String>,
    #[serde(default, alias = "exam_board", deserialize_with = "lenient_string")]
    pub exam_board: Option<String>,
    #[serde(default, alias = "lesson_date", deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, alias = "lesson_time", deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
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
    #[serde(default, alias = "student_name", deserialize_with = "lenient_string")]
    pub student_name: Option<String>,
    #[serde(default, alias = "student_needs", deserialize_with = "lenient_string")]
    pub student_needs: Option<String>,
    #[serde(default, alias = "prior_knowledge", deserialize_with = "lenient_string")]
    pub prior_knowledge: Option<String>,
    #[serde(default, alias = "key_vocabulary", deserialize_with = "lenient_string")]
    pub key_vocabulary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub differentiation: Option<String>,
    #[serde(default, alias = "assessment_strategy", deserialize_with = "lenient_string")]
    pub assessment_strategy: Option<String>,
    #[serde(default, deserialize_with = "lenient_resources")]
    pub resources: Vec<Resource>,
    #[serde(default, alias = "lesson_structure")]
    pub lesson_structure: StageList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl LessonRecord {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    fn slot(&self, field: LessonField) -> &Option<String> {
        match field {
            LessonField::Topic => &self.topic,
            LessonField::Subject => &self.subject,
            LessonField::YearGroup => &self.year_group,
            LessonField::ExamBoard => &self.exam_board,
            LessonField::Date => &self.date,
            LessonField::Time => &self.time,
            LessonField::Duration => &self.duration,
            LessonField::Objectives => &self.objectives,
            LessonField::Outcomes => &self.outcomes,
            LessonField::Homework => &self.homework,
            LessonField::Evaluation => &self.evaluation,
            LessonField::Notes => &self.notes,
            LessonField::StudentName => &self.student_name,
            LessonField::StudentNeeds => &self.student_needs,
            LessonField::PriorKnowledge => &self.prior_knowledge,
            LessonField::KeyVocabulary => &self.key_vocabulary,
            LessonField::Differentiation => &self.differentiation,
            LessonField::AssessmentStrategy => &self.assessment_strategy,
        }
    }

    fn slot_mut(&mut self, field: LessonField) -> &mut Option<String> {
        match field {
            LessonField::Topic => &mut self.topic,
            LessonField::Subject => &mut self.subject,
            LessonField::YearGroup => &mut self.year_group,
            LessonField::ExamBoard => &mut self.exam_board,
            LessonField::Date => &mut self.date,
            LessonField::Time => &mut self.time,
            LessonField::Duration => &mut self.duration,
            LessonField::Objectives => &mut self.objectives,
            LessonField::Outcomes => &mut self.outcomes,
            LessonField::Homework => &mut self.homework,
            LessonField::Evaluation => &mut self.evaluation,
            LessonField::Notes => &mut self.notes,
            LessonField::StudentName => &mut self.student_name,
            LessonField::StudentNeeds => &mut self.student_needs,
            LessonField::PriorKnowledge => &mut self.prior_knowledge,
            LessonField::KeyVocabulary => &mut self.key_vocabulary,
            LessonField::Differentiation => &mut self.differentiation,
            LessonField::AssessmentStrategy => &mut self.assessment_strategy,
        }
    }

    pub fn get(&self, field: LessonField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Empty strings are stored as absent.
    pub fn set(&mut self, field: LessonField, value: Option<String>) {
        *self.slot_mut(field) = value.filter(|s| !s.is_empty());
    }

    pub fn is_blank(&self, field: LessonField) -> bool {
        self.get(field).map(|s| s.trim().is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_empty_structure_as_two_anchors() {
        let raw = serde_json::json!({
            "topic": "Fractions",
            "year_group": "Year 7",
            "lesson_structure": []
        });
        let rec: LessonRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(rec.year_group.as_deref(), Some("Year 7"));
        assert_eq!(rec.lesson_structure, StageList::new());
        assert_eq!(rec.mode, Mode::Teacher);
    }

    #[test]
    fn loads_record_with_missing_structure_key() {
        let rec: LessonRecord = serde_json::from_str("{}").expect("record");
        assert_eq!(rec.lesson_structure.len(), 2);
        assert!(rec.resources.is_empty());
    }

    #[test]
    fn loads_null_structure_and_resources() {
        let raw = serde_json::json!({
            "topic": "Forces",
            "lesson_structure": null,
            "resources": null
        });
        let rec: LessonRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(rec.lesson_structure, StageList::new());
        assert!(rec.resources.is_empty());
    }

    #[test]
    fn loads_structure_and_resources_stored_as_text() {
        let raw = serde_json::json!({
            "lessonStructure": r#"[{"name":"Stage 1"},{"name":"Plenary","learningNote":"exit ticket"}]"#,
            "resources": r#"[{"title":"Slides","url":"https://example.org/s"}]"#
        });
        let rec: LessonRecord = serde_json::from_value(raw).expect("record");
        let names: Vec<_> = rec
            .lesson_structure
            .stages()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Starter", "Stage 1", "Plenary"]);
        assert_eq!(rec.lesson_structure.stages()[2].learning_note, "exit ticket");
        assert_eq!(rec.resources[0].title, "Slides");
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let raw = serde_json::json!({
            "lessonStructure": [null, { "name": "Stage 1" }, "oops"],
            "resources": [null, { "title": "Worksheet", "url": "" }, { "title": 3 }, "x"]
        });
        let rec: LessonRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(rec.lesson_structure.middle_count(), 1);
        assert_eq!(
            rec.resources,
            vec![Resource {
                title: "Worksheet".into(),
                url: String::new()
            }]
        );
    }

    #[test]
    fn lenient_fields_accept_numbers() {
        let raw = serde_json::json!({ "duration": 60, "notes": null });
        let rec: LessonRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(rec.duration.as_deref(), Some("60"));
        assert_eq!(rec.notes, None);
    }

    #[test]
    fn field_keys_round_trip() {
        for f in LessonField::ALL {
            assert_eq!(LessonField::parse(f.key()), Some(f));
        }
        assert_eq!(LessonField::parse("nope"), None);
    }

    #[test]
    fn set_treats_empty_as_absent() {
        let mut rec = LessonRecord::new(Mode::Tutor);
        rec.set(LessonField::StudentName, Some("Sam".into()));
        assert_eq!(rec.get(LessonField::StudentName), Some("Sam"));
        rec.set(LessonField::StudentName, Some(String::new()));
        assert!(rec.is_blank(LessonField::StudentName));
    }
}
