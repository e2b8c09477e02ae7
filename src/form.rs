//! One form session over a lesson or tutoring record.
//!
//! A form starts `Ready` (new record) or passes through `Loading` (edit).
//! Save and generate run through their intermediate phases and always settle
//! back in a phase the user can keep editing from.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::generate::{GenerateError, GenerationRequest, Generator};
use crate::mode::{exam_board_required, FieldKind, FormConfig, Mode, Requirement};
use crate::record::{LessonField, LessonRecord, Resource};
use crate::stages::{StageError, StageField};
use crate::store::{LessonStore, StoreError};
use crate::text::{
    capitalize_first_letter, capitalize_multiline_text, capitalize_text, ensure_bullet_prefix,
    is_blank_bullets, proper_title_case,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormPhase {
    Loading,
    Ready,
    Validating,
    Invalid,
    Saving,
    Saved,
    SaveFailed,
    Generating,
    GeneratedMerged,
    GenerationFailed,
}

impl FormPhase {
    fn can_move_to(self, to: FormPhase) -> bool {
        use FormPhase::*;
        matches!(
            (self, to),
            (Loading, Ready)
                | (Ready | Invalid | Saved, Validating)
                | (Validating, Ready | Invalid | Saving | Generating)
                | (Saving, Saved | SaveFailed)
                | (SaveFailed, Ready)
                | (Generating, GeneratedMerged | GenerationFailed)
                | (GeneratedMerged | GenerationFailed, Ready)
                | (Invalid | Saved, Ready)
        )
    }

    /// Phases from which the user can edit, save or generate.
    fn is_settled(self) -> bool {
        matches!(self, FormPhase::Ready | FormPhase::Invalid | FormPhase::Saved)
    }
}

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("form is busy ({0:?})")]
    Busy(FormPhase),
    #[error("field {0} is not part of this form")]
    UnknownField(String),
    #[error("please fix the highlighted fields")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl FormError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy(_) => "form_busy",
            Self::UnknownField(_) => "bad_params",
            Self::Invalid(_) => "validation_failed",
            Self::Stage(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Generate(e) => e.code(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot<'a> {
    pub mode: Mode,
    pub phase: FormPhase,
    pub is_new: bool,
    pub record: &'a LessonRecord,
    pub errors: &'a FieldErrors,
    pub last_error: Option<&'a str>,
}

pub struct LessonForm {
    config: FormConfig,
    capitalize_on_edit: bool,
    phase: FormPhase,
    record: LessonRecord,
    errors: FieldErrors,
    last_error: Option<String>,
}

impl LessonForm {
    fn with_record(app: &AppConfig, mode: Mode, record: LessonRecord, phase: FormPhase) -> Self {
        Self {
            config: FormConfig::for_mode(mode),
            capitalize_on_edit: app.capitalize_on_edit,
            phase,
            record,
            errors: FieldErrors::new(),
            last_error: None,
        }
    }

    /// A new record: fresh `[Starter, Plenary]`, straight to Ready.
    pub fn new(app: &AppConfig, mode: Mode) -> Self {
        Self::with_record(app, mode, LessonRecord::new(mode), FormPhase::Ready)
    }

    /// Loads an existing record for editing. Stage repair happens on load.
    pub fn edit(app: &AppConfig, store: &dyn LessonStore, id: &str) -> Result<Self, FormError> {
        let mut form = Self::with_record(
            app,
            app.mode,
            LessonRecord::new(app.mode),
            FormPhase::Loading,
        );
        let record = store.load(id)?;
        form.config = FormConfig::for_mode(record.mode);
        form.record = record;
        form.transition(FormPhase::Ready);
        Ok(form)
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn record(&self) -> &LessonRecord {
        &self.record
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn snapshot(&self) -> FormSnapshot<'_> {
        FormSnapshot {
            mode: self.config().mode,
            phase: self.phase(),
            is_new: self.record().id.is_none(),
            record: self.record(),
            errors: self.errors(),
            last_error: self.last_error(),
        }
    }

    fn transition(&mut self, to: FormPhase) {
        debug_assert!(
            self.phase.can_move_to(to),
            "illegal form transition {:?} -> {:?}",
            self.phase,
            to
        );
        log::debug!("form {:?} -> {:?}", self.phase, to);
        self.phase = to;
    }

    fn begin_edit(&mut self) -> Result<(), FormError> {
        if !self.phase.is_settled() {
            return Err(FormError::Busy(self.phase));
        }
        if self.phase != FormPhase::Ready {
            self.transition(FormPhase::Ready);
        }
        Ok(())
    }

    pub fn set_field(&mut self, field: LessonField, value: &str) -> Result<(), FormError> {
        let Some(schema) = self.config.schema(field) else {
            return Err(FormError::UnknownField(field.key().to_string()));
        };
        self.begin_edit()?;
        let value = match schema.kind {
            FieldKind::Bullets => ensure_bullet_prefix(value),
            _ => value.to_string(),
        };
        self.record.set(field, Some(value));
        self.errors.remove(field.key());
        Ok(())
    }

    pub fn set_resources(&mut self, resources: Vec<Resource>) -> Result<(), FormError> {
        self.begin_edit()?;
        self.record.resources = resources;
        Ok(())
    }

    pub fn add_stage(&mut self) -> Result<usize, FormError> {
        self.begin_edit()?;
        Ok(self.record.lesson_structure.add_middle_stage())
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<(), FormError> {
        self.begin_edit()?;
        let opts = self.config.stage_options();
        Ok(self.record.lesson_structure.remove_middle_stage(index, opts)?)
    }

    pub fn clear_stage(&mut self, index: usize) -> Result<(), FormError> {
        self.begin_edit()?;
        Ok(self.record.lesson_structure.clear_stage(index)?)
    }

    pub fn rename_stage(&mut self, index: usize, name: &str) -> Result<(), FormError> {
        self.begin_edit()?;
        let opts = self.config.stage_options();
        Ok(self.record.lesson_structure.rename_stage(index, name, opts)?)
    }

    pub fn set_stage_field(
        &mut self,
        index: usize,
        field: StageField,
        value: &str,
    ) -> Result<(), FormError> {
        self.begin_edit()?;
        Ok(self.record.lesson_structure.edit_field(index, field, value)?)
    }

    /// Required-field checks for this mode. Does not change phase.
    pub fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let exam_years = exam_board_required(self.record.year_group.as_deref());
        for schema in self.config.fields {
            let required = match schema.requirement {
                Requirement::Always => true,
                Requirement::ExamYears => exam_years,
                Requirement::Optional => false,
            };
            let value = self.record.get(schema.field).unwrap_or("");
            let blank = match schema.kind {
                FieldKind::Bullets => is_blank_bullets(value),
                _ => value.trim().is_empty(),
            };
            if blank {
                if required {
                    errors.insert(schema.field.key().to_string(), required_message(schema.field));
                }
                continue;
            }
            match schema.kind {
                FieldKind::Date if NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_err() => {
                    errors.insert(
                        schema.field.key().to_string(),
                        "Enter a valid date (YYYY-MM-DD)".to_string(),
                    );
                }
                FieldKind::Time if parse_time(value.trim()).is_none() => {
                    errors.insert(
                        schema.field.key().to_string(),
                        "Enter a valid time (HH:MM)".to_string(),
                    );
                }
                _ => {}
            }
        }
        errors
    }

    /// Validation pass. On failure the form is left Invalid with the field map filled.
    pub fn validate(&mut self) -> Result<(), FormError> {
        if !self.phase.is_settled() {
            return Err(FormError::Busy(self.phase));
        }
        self.transition(FormPhase::Validating);
        self.errors = self.check();
        if self.errors.is_empty() {
            self.transition(FormPhase::Ready);
            return Ok(());
        }
        self.transition(FormPhase::Invalid);
        Err(FormError::Invalid(self.errors.clone()))
    }

    /// A copy of the record with each field formatted for its kind.
    fn capitalized(&self) -> LessonRecord {
        let mut record = self.record.clone();
        for schema in self.config.fields {
            let Some(value) = record.get(schema.field) else {
                continue;
            };
            let formatted = match schema.kind {
                FieldKind::Title => proper_title_case(value),
                FieldKind::Category => capitalize_first_letter(value.trim()),
                FieldKind::Bullets => capitalize_multiline_text(value),
                FieldKind::Text => capitalize_text(value),
                FieldKind::Date | FieldKind::Time => continue,
            };
            record.set(schema.field, Some(formatted));
        }
        record
    }

    /// Validate, format, persist. A store failure lands back in Ready with
    /// `last_error` set.
    pub fn save(&mut self, store: &dyn LessonStore) -> Result<&LessonRecord, FormError> {
        if !self.phase.is_settled() {
            return Err(FormError::Busy(self.phase));
        }
        self.last_error = None;
        self.transition(FormPhase::Validating);
        self.errors = self.check();
        if !self.errors.is_empty() {
            self.transition(FormPhase::Invalid);
            return Err(FormError::Invalid(self.errors.clone()));
        }
        self.transition(FormPhase::Saving);

        let is_new = self.record.id.is_none();
        let capitalize = if is_new {
            self.config.capitalize_on_create
        } else {
            self.capitalize_on_edit
        };
        // The form keeps what the user typed until the store accepts the write.
        let outgoing = if capitalize {
            self.capitalized()
        } else {
            self.record.clone()
        };
        let result = if is_new {
            store.insert(&outgoing)
        } else {
            store.update(&outgoing)
        };
        match result {
            Ok(saved) => {
                self.record = saved;
                self.transition(FormPhase::Saved);
                Ok(&self.record)
            }
            Err(e) => {
                log::warn!("save failed: {}", e);
                self.transition(FormPhase::SaveFailed);
                self.last_error = Some(e.to_string());
                self.transition(FormPhase::Ready);
                Err(e.into())
            }
        }
    }

    /// Ask the generator to fill the plan. Topic and subject must be set first.
    pub fn generate(&mut self, generator: Option<&dyn Generator>) -> Result<(), FormError> {
        if !self.phase.is_settled() {
            return Err(FormError::Busy(self.phase));
        }
        self.last_error = None;
        self.transition(FormPhase::Validating);
        let mut missing = FieldErrors::new();
        for field in [LessonField::Topic, LessonField::Subject] {
            if self.record.is_blank(field) {
                missing.insert(field.key().to_string(), required_message(field));
            }
        }
        if !missing.is_empty() {
            self.errors = missing.clone();
            self.transition(FormPhase::Invalid);
            return Err(FormError::Invalid(missing));
        }
        self.transition(FormPhase::Generating);

        let outcome = match generator {
            Some(g) => g.generate(&GenerationRequest::from_record(&self.record)),
            None => Err(GenerateError::Unavailable),
        };
        match outcome {
            Ok(resp) => {
                resp.merge_into(&mut self.record);
                self.errors.clear();
                self.transition(FormPhase::GeneratedMerged);
                self.transition(FormPhase::Ready);
                Ok(())
            }
            Err(e) => {
                log::warn!("generation failed: {}", e);
                self.transition(FormPhase::GenerationFailed);
                self.last_error = Some(e.to_string());
                self.transition(FormPhase::Ready);
                Err(e.into())
            }
        }
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn required_message(field: LessonField) -> String {
    let label = match field {
        LessonField::Topic => "Topic",
        LessonField::Subject => "Subject",
        LessonField::YearGroup => "Year group",
        LessonField::ExamBoard => "Exam board",
        LessonField::Date => "Date",
        LessonField::Time => "Time",
        LessonField::Objectives => "Learning objectives",
        LessonField::Outcomes => "Learning outcomes",
        LessonField::StudentName => "Student name",
        other => other.key(),
    };
    format!("{} is required", label)
}
