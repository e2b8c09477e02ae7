use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::record::{json_array, lenient_string};

pub const STARTER: &str = "Starter";
pub const PLENARY: &str = "Plenary";
const STAGE_PREFIX: &str = "Stage ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,
    pub duration: String,
    pub teaching_note: String,
    pub learning_note: String,
    pub assessing_note: String,
    pub adapting_note: String,
}

impl Stage {
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.name == STARTER || self.name == PLENARY
    }

    fn clear(&mut self) {
        self.duration.clear();
        self.teaching_note.clear();
        self.learning_note.clear();
        self.assessing_note.clear();
        self.adapting_note.clear();
    }
}

/// A stage as it arrives from storage or from the generation endpoint.
/// Older records used `stage` for the name and bare note keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStage {
    #[serde(default, alias = "stage", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
    #[serde(default, alias = "teaching", alias = "teaching_note", deserialize_with = "lenient_string")]
    pub teaching_note: Option<String>,
    #[serde(default, alias = "learning", alias = "learning_note", deserialize_with = "lenient_string")]
    pub learning_note: Option<String>,
    #[serde(default, alias = "assessing", alias = "assessing_note", deserialize_with = "lenient_string")]
    pub assessing_note: Option<String>,
    #[serde(default, alias = "adapting", alias = "adapting_note", deserialize_with = "lenient_string")]
    pub adapting_note: Option<String>,
}

impl From<RawStage> for Stage {
    fn from(raw: RawStage) -> Self {
        Self {
            name: raw.name.map(|s| s.trim().to_string()).unwrap_or_default(),
            duration: raw.duration.unwrap_or_default(),
            teaching_note: raw.teaching_note.unwrap_or_default(),
            learning_note: raw.learning_note.unwrap_or_default(),
            assessing_note: raw.assessing_note.unwrap_or_default(),
            adapting_note: raw.adapting_note.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Duration,
    TeachingNote,
    LearningNote,
    AssessingNote,
    AdaptingNote,
}

impl StageField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "duration" => Some(Self::Duration),
            "teachingNote" => Some(Self::TeachingNote),
            "learningNote" => Some(Self::LearningNote),
            "assessingNote" => Some(Self::AssessingNote),
            "adaptingNote" => Some(Self::AdaptingNote),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("stage index {index} is out of range (list has {len} stages)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl StageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IndexOutOfRange { .. } => "bad_stage_index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageEditorOptions {
    /// Rename middle stages `Stage 1..K` after a removal.
    pub renumber: bool,
    /// Coerce `stage…` renames to the canonical `Stage ` prefix.
    pub enforce_stage_prefix: bool,
}

/// Ordered stages of a lesson. Always `[Starter, ..middle.., Plenary]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageList {
    stages: Vec<Stage>,
}

impl Default for StageList {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for StageList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.stages().serialize(serializer)
    }
}

/// Never fails: whatever shape was stored is repaired into a valid list.
impl<'de> Deserialize<'de> for StageList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::normalize(v.and_then(raw_stages).unwrap_or_default()))
    }
}

/// Stages from an array, or from an array stored as JSON text. Entries that
/// are not objects are skipped. `None` when there is no usable array at all.
pub fn raw_stages(v: Value) -> Option<Vec<Stage>> {
    let items = json_array(v)?;
    let total = items.len();
    let stages: Vec<Stage> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<RawStage>(item).ok())
        .map(Stage::from)
        .collect();
    if stages.len() < total {
        log::warn!(
            "skipped {} malformed stage entr(ies) while loading",
            total - stages.len()
        );
    }
    Some(stages)
}

impl StageList {
    pub fn new() -> Self {
        Self {
            stages: vec![Stage::blank(STARTER), Stage::blank(PLENARY)],
        }
    }

    /// Repairs any sequence of stages into a valid list. The first Starter
    /// and first Plenary win; later duplicates are dropped. Missing anchors
    /// are added blank. Unnamed middle stages get their positional name.
    pub fn normalize(raw: impl IntoIterator<Item = Stage>) -> Self {
        let mut starter: Option<Stage> = None;
        let mut plenary: Option<Stage> = None;
        let mut middle: Vec<Stage> = Vec::new();
        let mut dropped = 0usize;

        for stage in raw {
            if stage.name == STARTER {
                if starter.is_none() {
                    starter = Some(stage);
                } else {
                    dropped += 1;
                }
            } else if stage.name == PLENARY {
                if plenary.is_none() {
                    plenary = Some(stage);
                } else {
                    dropped += 1;
                }
            } else {
                middle.push(stage);
            }
        }
        if dropped > 0 {
            log::warn!("dropped {} duplicate anchor stage(s) while normalizing", dropped);
        }

        for (i, stage) in middle.iter_mut().enumerate() {
            if stage.name.is_empty() {
                stage.name = format!("{}{}", STAGE_PREFIX, i + 1);
            }
        }

        let mut stages = Vec::with_capacity(middle.len() + 2);
        stages.push(starter.unwrap_or_else(|| Stage::blank(STARTER)));
        stages.extend(middle);
        stages.push(plenary.unwrap_or_else(|| Stage::blank(PLENARY)));
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn middle_count(&self) -> usize {
        self.stages.len() - 2
    }

    fn check_index(&self, index: usize) -> Result<(), StageError> {
        if index >= self.len() {
            return Err(StageError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Inserts a blank stage just before the Plenary. Returns its index.
    pub fn add_middle_stage(&mut self) -> usize {
        let name = format!("{}{}", STAGE_PREFIX, self.middle_count() + 1);
        let at = self.len() - 1;
        self.stages.insert(at, Stage::blank(name));
        at
    }

    /// Removes a middle stage. Anchors are left in place and the call is a no-op.
    pub fn remove_middle_stage(
        &mut self,
        index: usize,
        opts: StageEditorOptions,
    ) -> Result<(), StageError> {
        self.check_index(index)?;
        if self.stages[index].is_anchor() {
            return Ok(());
        }
        self.stages.remove(index);
        if opts.renumber {
            self.renumber();
        }
        Ok(())
    }

    fn renumber(&mut self) {
        let last = self.stages.len() - 1;
        for (i, stage) in self.stages[1..last].iter_mut().enumerate() {
            stage.name = format!("{}{}", STAGE_PREFIX, i + 1);
        }
    }

    /// Blanks every note and the duration. Works on anchors too; the name stays.
    pub fn clear_stage(&mut self, index: usize) -> Result<(), StageError> {
        self.check_index(index)?;
        self.stages[index].clear();
        Ok(())
    }

    /// Renames a middle stage. Anchors cannot be renamed; the call is a no-op.
    pub fn rename_stage(
        &mut self,
        index: usize,
        new_name: &str,
        opts: StageEditorOptions,
    ) -> Result<(), StageError> {
        self.check_index(index)?;
        if self.stages[index].is_anchor() {
            return Ok(());
        }
        let name = if opts.enforce_stage_prefix {
            canonical_stage_prefix(new_name)
        } else {
            new_name.to_string()
        };
        // A middle stage renamed to an anchor name would break the list shape.
        if name == STARTER || name == PLENARY {
            return Ok(());
        }
        self.stages[index].name = name;
        Ok(())
    }

    pub fn edit_field(
        &mut self,
        index: usize,
        field: StageField,
        value: impl Into<String>,
    ) -> Result<(), StageError> {
        self.check_index(index)?;
        let stage = &mut self.stages[index];
        let slot = match field {
            StageField::Duration => &mut stage.duration,
            StageField::TeachingNote => &mut stage.teaching_note,
            StageField::LearningNote => &mut stage.learning_note,
            StageField::AssessingNote => &mut stage.assessing_note,
            StageField::AdaptingNote => &mut stage.adapting_note,
        };
        *slot = value.into();
        Ok(())
    }
}

/// `stage3` / `STAGE  3` -> `Stage 3`. Anything not starting with "stage" is kept.
pub fn canonical_stage_prefix(input: &str) -> String {
    let head_matches = input
        .get(..5)
        .map(|h| h.eq_ignore_ascii_case("stage"))
        .unwrap_or(false);
    if !head_matches {
        return input.to_string();
    }
    format!("{}{}", STAGE_PREFIX, input[5..].trim_start())
}
