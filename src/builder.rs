use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::ResponseStore;
use crate::error::{AssistantError, AssistantResult};
use crate::models::{AnswerValue, Response};
use crate::schema::{FieldKind, Options, QuestionField, Schema, Variant};

/// State scoped to one pass through the questionnaire.
#[derive(Debug, Clone)]
pub struct Session {
    started_at: DateTime<Local>,
    submitted: Option<i64>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            submitted: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Record id this session was stored under, once submitted.
    pub fn submitted_as(&self) -> Option<i64> {
        self.submitted
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ResponseBuilder {
    schema: &'static Schema,
    session: Session,
    answers: BTreeMap<String, AnswerValue>,
}

impl ResponseBuilder {
    pub fn new(variant: Variant, session: Session) -> Self {
        Self {
            schema: variant.schema(),
            session,
            answers: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn answer(&self, field_id: &str) -> Option<&AnswerValue> {
        self.answers.get(field_id)
    }

    fn lookup(&self, field_id: &str) -> AssistantResult<&'static QuestionField> {
        self.schema
            .field(field_id)
            .ok_or_else(|| AssistantError::UnknownField(field_id.to_string()))
    }

    fn field_active(&self, field: &QuestionField) -> bool {
        match field.depends_on {
            None => true,
            Some(dep) => dep.condition.holds(self.answers.get(dep.field)),
        }
    }

    pub fn is_active(&self, field_id: &str) -> AssistantResult<bool> {
        let field = self.lookup(field_id)?;
        Ok(self.field_active(field))
    }

    /// Options currently allowed for a choice field.
    pub fn options_for(&self, field_id: &str) -> AssistantResult<&'static [&'static str]> {
        let field = self.lookup(field_id)?;
        Ok(self.resolve_options(field))
    }

    fn resolve_options(&self, field: &QuestionField) -> &'static [&'static str] {
        match field.options {
            Options::None => &[],
            Options::Fixed(opts) => opts,
            Options::ByEducationLevel => self
                .answers
                .get("education_level")
                .and_then(AnswerValue::as_text)
                .map(Schema::fields_of_study_for)
                .unwrap_or(&[]),
        }
    }

    pub fn set_answer(&mut self, field_id: &str, value: AnswerValue) -> AssistantResult<()> {
        let field = self.lookup(field_id)?;
        if !self.field_active(field) {
            return Err(AssistantError::FieldNotActive(field_id.to_string()));
        }

        let value = validate(field, value, self.resolve_options(field))?;
        debug!(field = field_id, value = %value.display(), "answer set");
        self.answers.insert(field_id.to_string(), value);

        if field_id == "education_level" {
            self.prune_fields_of_study();
        }
        Ok(())
    }

    /// Sets a batch of answers in question order so that controlling fields
    /// are answered before the fields that depend on them.
    pub fn apply(&mut self, mut answers: BTreeMap<String, AnswerValue>) -> AssistantResult<()> {
        if let Some(unknown) = answers.keys().find(|id| self.schema.field(id).is_none()) {
            return Err(AssistantError::UnknownField(unknown.clone()));
        }
        for field in self.schema.fields() {
            if let Some(value) = answers.remove(field.id) {
                self.set_answer(field.id, value)?;
            }
        }
        Ok(())
    }

    // Selections outside the new education level's option set are dropped.
    fn prune_fields_of_study(&mut self) {
        let Some(field) = self.schema.field("fields_of_study") else {
            return;
        };
        let allowed = self.resolve_options(field);
        let Some(AnswerValue::List(items)) = self.answers.get_mut("fields_of_study") else {
            return;
        };
        let before = items.len();
        items.retain(|item| allowed.contains(&item.as_str()));
        if items.len() != before {
            debug!(dropped = before - items.len(), "fields of study no longer offered");
        }
        if items.is_empty() {
            self.answers.remove("fields_of_study");
        }
    }

    fn is_answered(&self, field: &QuestionField) -> bool {
        match self.answers.get(field.id) {
            None => false,
            Some(AnswerValue::List(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Ids of active required fields that still have no answer.
    pub fn missing(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .filter(|f| f.required && self.field_active(f) && !self.is_answered(f))
            .map(|f| f.id.to_string())
            .collect()
    }

    /// Freezes the current answers. Inactive fields are left out entirely so
    /// they persist as NULL, whatever was typed while they were visible.
    pub fn finalize(&self) -> AssistantResult<Response> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(AssistantError::IncompleteResponse { missing });
        }

        let mut frozen = BTreeMap::new();
        for field in self.schema.fields() {
            if !self.field_active(field) {
                continue;
            }
            match self.answers.get(field.id) {
                Some(value) => {
                    frozen.insert(field.id.to_string(), value.clone());
                }
                None if field.kind == FieldKind::MultiChoice => {
                    frozen.insert(field.id.to_string(), AnswerValue::List(Vec::new()));
                }
                None => {}
            }
        }
        Ok(Response::new(self.schema.variant(), frozen))
    }

    /// Finalizes and appends the response. A session is stored at most once.
    pub fn submit(&mut self, store: &ResponseStore) -> AssistantResult<i64> {
        if let Some(id) = self.session.submitted {
            return Err(AssistantError::AlreadySubmitted(id));
        }
        let response = self.finalize()?;
        let id = store.append(response)?;
        self.session.submitted = Some(id);
        Ok(id)
    }
}

fn validate(
    field: &QuestionField,
    value: AnswerValue,
    options: &[&str],
) -> AssistantResult<AnswerValue> {
    match (field.kind, value) {
        (FieldKind::SingleChoice, AnswerValue::Text(choice)) => {
            if field.placeholder == Some(choice.as_str()) {
                return Err(AssistantError::invalid(field.id, "please choose an option"));
            }
            if !options.contains(&choice.as_str()) {
                return Err(AssistantError::invalid(
                    field.id,
                    format!("'{}' is not one of: {}", choice, options.join(", ")),
                ));
            }
            Ok(AnswerValue::Text(choice))
        }
        (FieldKind::MultiChoice, AnswerValue::List(items)) => {
            if options.is_empty() && !items.is_empty() {
                return Err(AssistantError::invalid(
                    field.id,
                    "no options are available yet, answer the question it depends on first",
                ));
            }
            for (idx, item) in items.iter().enumerate() {
                if !options.contains(&item.as_str()) {
                    return Err(AssistantError::invalid(
                        field.id,
                        format!("'{}' is not one of: {}", item, options.join(", ")),
                    ));
                }
                if items[..idx].contains(item) {
                    return Err(AssistantError::invalid(
                        field.id,
                        format!("'{}' was selected twice", item),
                    ));
                }
            }
            Ok(AnswerValue::List(items))
        }
        (FieldKind::FreeText, AnswerValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(AssistantError::invalid(field.id, "must not be blank"));
            }
            Ok(AnswerValue::Text(trimmed.to_string()))
        }
        (FieldKind::Integer, AnswerValue::Integer(n)) => {
            if let Some((min, max)) = field.range {
                if n < min || n > max {
                    return Err(AssistantError::invalid(
                        field.id,
                        format!("{} is outside {}..={}", n, min, max),
                    ));
                }
            }
            Ok(AnswerValue::Integer(n))
        }
        (kind, other) => Err(AssistantError::invalid(
            field.id,
            format!("expected {:?} answer, got {:?}", kind, other),
        )),
    }
}
