use rusqlite::types::Value;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::schema::{FieldKind, Schema, Variant};

/// One collected answer. Absent answers are represented by the key being missing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Human-readable form; lists are joined with ", ".
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Integer(n) => n.to_string(),
            AnswerValue::Text(t) => t.clone(),
            AnswerValue::List(items) => items.join(", "),
        }
    }
}

pub fn join_list(items: &[String], delimiter: &str) -> String {
    items.join(delimiter)
}

pub fn split_list(stored: &str, delimiter: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(delimiter).map(str::to_string).collect()
}

/// A finalized submission. Only the builder creates one and only the store
/// consumes it, so it cannot change once frozen.
#[derive(Debug, Clone)]
pub struct Response {
    variant: Variant,
    answers: BTreeMap<String, AnswerValue>,
}

impl Response {
    pub(crate) fn new(variant: Variant, answers: BTreeMap<String, AnswerValue>) -> Self {
        Self { variant, answers }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn get(&self, field_id: &str) -> Option<&AnswerValue> {
        self.answers.get(field_id)
    }

    fn text_or_empty(&self, field_id: &str) -> String {
        self.get(field_id).map(AnswerValue::display).unwrap_or_default()
    }

    /// Single-line input handed to the recommendation model.
    pub fn summary(&self) -> String {
        format!(
            "Age Group: {}, Marital Status: {}, Education: {}, Employment: {}, \
             Career Interests: {}",
            self.text_or_empty("age_group"),
            self.text_or_empty("marital_status"),
            self.text_or_empty("education_level"),
            self.text_or_empty("employment_status"),
            self.text_or_empty("career_interests"),
        )
    }

    /// "Label: value" lines for every collected field, in question order.
    pub fn display_lines(&self) -> Vec<String> {
        self.variant
            .schema()
            .fields()
            .iter()
            .filter_map(|field| {
                self.get(field.id)
                    .map(|value| format!("{}: {}", field.label, value.display()))
            })
            .collect()
    }
}

/// A row read back from the response table.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: i64,
    pub columns: Vec<(String, Value)>,
}

impl StoredRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// JSON object of the row. Multi-choice columns are split on the
    /// schema's delimiter and come out as arrays.
    pub fn to_json(&self, schema: &Schema) -> serde_json::Value {
        let delimiter = schema.variant().delimiter();
        let mut map = serde_json::Map::new();
        map.insert("id".to_string(), self.id.into());
        for (name, value) in &self.columns {
            let multi = schema
                .field(name)
                .is_some_and(|f| f.kind == FieldKind::MultiChoice);
            let json = match value {
                Value::Null => serde_json::Value::Null,
                Value::Integer(n) => (*n).into(),
                Value::Real(f) => (*f).into(),
                Value::Text(t) if multi => split_list(t, delimiter).into(),
                Value::Text(t) => t.clone().into(),
                Value::Blob(b) => format!("<{} bytes>", b.len()).into(),
            };
            map.insert(name.clone(), json);
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
impl StoredRecord {
    pub(crate) fn is_null(&self, column: &str) -> bool {
        matches!(self.get(column), Some(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_round_trips_on_its_delimiter() {
        let items = vec!["Science".to_string(), "IT".to_string()];
        let stored = join_list(&items, ", ");
        assert_eq!(stored, "Science, IT");
        assert_eq!(split_list(&stored, ", "), items);

        let stored = join_list(&items, ",");
        assert_eq!(stored, "Science,IT");
        assert_eq!(split_list(&stored, ","), items);
        assert!(split_list("", ", ").is_empty());
    }

    #[test]
    fn test_answer_value_from_json() {
        let parsed: BTreeMap<String, AnswerValue> = serde_json::from_str(
            r#"{"dependants": 2, "age_group": "18 - 22", "languages": ["English", "Urdu"]}"#,
        )
        .unwrap();
        assert_eq!(parsed["dependants"], AnswerValue::Integer(2));
        assert_eq!(parsed["age_group"], AnswerValue::Text("18 - 22".into()));
        assert_eq!(
            parsed["languages"],
            AnswerValue::List(vec!["English".into(), "Urdu".into()])
        );
    }

    #[test]
    fn test_summary_format() {
        let mut answers = BTreeMap::new();
        answers.insert("age_group".to_string(), AnswerValue::Text("22 - 30".into()));
        answers.insert("marital_status".to_string(), AnswerValue::Text("Single".into()));
        answers.insert("education_level".to_string(), AnswerValue::Text("Graduate".into()));
        answers.insert("employment_status".to_string(), AnswerValue::Text("Employed".into()));
        answers.insert(
            "career_interests".to_string(),
            AnswerValue::List(vec!["Technology".into(), "Business".into()]),
        );
        let response = Response::new(Variant::Advisor, answers);
        assert_eq!(
            response.summary(),
            "Age Group: 22 - 30, Marital Status: Single, Education: Graduate, \
             Employment: Employed, Career Interests: Technology, Business"
        );
        assert_eq!(
            response.display_lines(),
            vec![
                "Age Group: 22 - 30",
                "Marital Status: Single",
                "Education Level: Graduate",
                "Employment Status: Employed",
                "Career Interests: Technology, Business",
            ]
        );
    }

    #[test]
    fn test_stored_record_json_keeps_nulls() {
        let record = StoredRecord {
            id: 3,
            columns: vec![
                ("age_group".into(), Value::Text("65+".into())),
                ("dependants".into(), Value::Null),
                ("fields_of_study".into(), Value::Text("Science,IT".into())),
                ("soft_skills".into(), Value::Text("".into())),
            ],
        };
        let json = record.to_json(Variant::Advisor.schema());
        assert_eq!(json["id"], 3);
        assert_eq!(json["age_group"], "65+");
        assert!(json["dependants"].is_null());
        assert_eq!(json["fields_of_study"], serde_json::json!(["Science", "IT"]));
        assert_eq!(json["soft_skills"], serde_json::json!([]));
        assert!(record.is_null("dependants"));
        assert!(!record.is_null("missing_column"));
    }
}
