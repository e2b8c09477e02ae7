use serde::{Deserialize, Serialize};

use crate::record::LessonField;
use crate::stages::StageEditorOptions;

/// Which form variant and field schema applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Teacher,
    TeacherExtended,
    Tutor,
    Student,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "teacher" => Some(Self::Teacher),
            "teacherExtended" => Some(Self::TeacherExtended),
            "tutor" => Some(Self::Tutor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::TeacherExtended => "teacherExtended",
            Self::Tutor => "tutor",
            Self::Student => "student",
        }
    }

    /// `planType` sent to the generation endpoint.
    pub fn plan_type(self) -> &'static str {
        match self {
            Self::Teacher => "standard",
            Self::TeacherExtended => "advanced",
            Self::Tutor => "tutor",
            Self::Student => "student",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExamBand {
    Gcse,
    ALevel,
}

/// `"Year 10"` -> GCSE, `"Year 12"` -> A-level. Anything else has no band.
pub fn exam_band(year_group: &str) -> Option<ExamBand> {
    let s = year_group.trim();
    let head = s.get(..4)?;
    if !head.eq_ignore_ascii_case("year") {
        return None;
    }
    let n: u32 = s[4..].trim().parse().ok()?;
    match n {
        10..=11 => Some(ExamBand::Gcse),
        12..=13 => Some(ExamBand::ALevel),
        _ => None,
    }
}

pub fn exam_board_required(year_group: Option<&str>) -> bool {
    year_group.and_then(exam_band).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Optional,
    Always,
    /// Only when the year group falls in a GCSE or A-level band.
    ExamYears,
}

/// How a field is treated by the bullet helper and the create-path formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Category,
    Text,
    Bullets,
    Date,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub field: LessonField,
    pub kind: FieldKind,
    pub requirement: Requirement,
}

const fn f(field: LessonField, kind: FieldKind, requirement: Requirement) -> FieldSchema {
    FieldSchema {
        field,
        kind,
        requirement,
    }
}

use FieldKind as K;
use LessonField as L;
use Requirement as R;

const TEACHER_FIELDS: &[FieldSchema] = &[
    f(L::Topic, K::Title, R::Always),
    f(L::Subject, K::Category, R::Always),
    f(L::YearGroup, K::Category, R::Always),
    f(L::ExamBoard, K::Category, R::ExamYears),
    f(L::Date, K::Date, R::Always),
    f(L::Time, K::Time, R::Always),
    f(L::Duration, K::Text, R::Optional),
    f(L::Objectives, K::Bullets, R::Always),
    f(L::Outcomes, K::Bullets, R::Optional),
    f(L::Homework, K::Text, R::Optional),
    f(L::Evaluation, K::Text, R::Optional),
    f(L::Notes, K::Text, R::Optional),
];

const TEACHER_EXTENDED_FIELDS: &[FieldSchema] = &[
    f(L::Topic, K::Title, R::Always),
    f(L::Subject, K::Category, R::Always),
    f(L::YearGroup, K::Category, R::Always),
    f(L::ExamBoard, K::Category, R::ExamYears),
    f(L::Date, K::Date, R::Always),
    f(L::Time, K::Time, R::Always),
    f(L::Duration, K::Text, R::Optional),
    f(L::Objectives, K::Bullets, R::Always),
    f(L::Outcomes, K::Bullets, R::Always),
    f(L::PriorKnowledge, K::Text, R::Optional),
    f(L::KeyVocabulary, K::Text, R::Optional),
    f(L::Differentiation, K::Text, R::Optional),
    f(L::AssessmentStrategy, K::Text, R::Optional),
    f(L::Homework, K::Text, R::Optional),
    f(L::Evaluation, K::Text, R::Optional),
    f(L::Notes, K::Text, R::Optional),
];

const TUTOR_FIELDS: &[FieldSchema] = &[
    f(L::StudentName, K::Title, R::Always),
    f(L::Topic, K::Title, R::Always),
    f(L::Subject, K::Category, R::Always),
    f(L::YearGroup, K::Category, R::Optional),
    f(L::ExamBoard, K::Category, R::ExamYears),
    f(L::Date, K::Date, R::Always),
    f(L::Time, K::Time, R::Always),
    f(L::Duration, K::Text, R::Optional),
    f(L::Objectives, K::Bullets, R::Always),
    f(L::Outcomes, K::Bullets, R::Optional),
    f(L::StudentNeeds, K::Text, R::Optional),
    f(L::Homework, K::Text, R::Optional),
    f(L::Evaluation, K::Text, R::Optional),
    f(L::Notes, K::Text, R::Optional),
];

const STUDENT_FIELDS: &[FieldSchema] = &[
    f(L::Topic, K::Title, R::Always),
    f(L::Subject, K::Category, R::Always),
    f(L::Date, K::Date, R::Always),
    f(L::Time, K::Time, R::Always),
    f(L::Duration, K::Text, R::Optional),
    f(L::Objectives, K::Bullets, R::Always),
    f(L::Outcomes, K::Bullets, R::Optional),
    f(L::Homework, K::Text, R::Optional),
    f(L::Notes, K::Text, R::Optional),
];

/// One parameterized form instead of a copy per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormConfig {
    pub mode: Mode,
    pub fields: &'static [FieldSchema],
    pub stage_renumbering: bool,
    pub enforce_stage_prefix: bool,
    pub capitalize_on_create: bool,
}

impl FormConfig {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Teacher => Self {
                mode,
                fields: TEACHER_FIELDS,
                stage_renumbering: true,
                enforce_stage_prefix: false,
                capitalize_on_create: true,
            },
            Mode::TeacherExtended => Self {
                mode,
                fields: TEACHER_EXTENDED_FIELDS,
                stage_renumbering: true,
                enforce_stage_prefix: true,
                capitalize_on_create: true,
            },
            // Tutors name their own stages; nothing is renumbered.
            Mode::Tutor => Self {
                mode,
                fields: TUTOR_FIELDS,
                stage_renumbering: false,
                enforce_stage_prefix: false,
                capitalize_on_create: true,
            },
            Mode::Student => Self {
                mode,
                fields: STUDENT_FIELDS,
                stage_renumbering: true,
                enforce_stage_prefix: false,
                capitalize_on_create: false,
            },
        }
    }

    pub fn schema(&self, field: LessonField) -> Option<&'static FieldSchema> {
        self.fields.iter().find(|s| s.field == field)
    }

    pub fn stage_options(&self) -> StageEditorOptions {
        StageEditorOptions {
            renumber: self.stage_renumbering,
            enforce_stage_prefix: self.enforce_stage_prefix,
        }
    }
}
