//! Health risk assessment sections.
//!
//! The assistant answers with a JSON object (often wrapped in prose, and
//! sometimes with Python literals) shaped like:
//!
//! ```json
//! {
//!   "Candidate Name": "James Hernandez",
//!   "Date of Birth": "1990-05-12",
//!   "Inmate Number": "CA0001",
//!   "Adult Suicide Risk Scale": [ { "Screening ID": 1, "Wish You Were Dead": false } ]
//! }
//! ```
//!
//! [`parse_assistant_reply`] recovers the object; [`build_assessment`]
//! turns it into a base-info table plus one section per array entry,
//! ready for a document renderer.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::value_text;

/// Heading of the rendered document.
pub const ASSESSMENT_TITLE: &str = "Health Risk Assessment";

/// Heading of the base-info table.
pub const BASE_INFO_TITLE: &str = "Candidate Information";

/// Person-level attributes repeated at the top of every section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseInfoField {
    Candidate,
    DateOfBirth,
    InmateNumber,
}

impl BaseInfoField {
    pub fn label(&self) -> &'static str {
        match self {
            BaseInfoField::Candidate => "Candidate",
            BaseInfoField::DateOfBirth => "Date of Birth",
            BaseInfoField::InmateNumber => "Inmate Number",
        }
    }

    /// Looks up a top-level key of the reply, ignoring case and padding.
    pub fn lookup(key: &str) -> Option<BaseInfoField> {
        let folded = key.trim().to_lowercase();
        BASE_INFO_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(&folded))
            .map(|(_, field)| *field)
    }
}

static BASE_INFO_ALIASES: &[(&str, BaseInfoField)] = &[
    ("candidate name", BaseInfoField::Candidate),
    ("candidate", BaseInfoField::Candidate),
    ("name", BaseInfoField::Candidate),
    ("date of birth", BaseInfoField::DateOfBirth),
    ("dob", BaseInfoField::DateOfBirth),
    ("birth date", BaseInfoField::DateOfBirth),
    ("inmate number", BaseInfoField::InmateNumber),
    ("inmate id", BaseInfoField::InmateNumber),
    ("booking number", BaseInfoField::InmateNumber),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentRow {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentSection {
    pub title: String,
    pub rows: Vec<AssessmentRow>,
}

/// Renderer-ready assessment: base info first, then every section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub title: String,
    pub base_info: AssessmentSection,
    pub sections: Vec<AssessmentSection>,
}

/// Extracts the outermost JSON object from free text.
///
/// Everything before the first `{` and after the last `}` is ignored.
/// Python literals `True`, `False` and `None`, single-quoted strings and
/// trailing commas are accepted outside string literals.
pub fn parse_assistant_reply(text: &str) -> Result<Value> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(Error::InvalidInput(
            "reply does not contain a JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(Error::InvalidInput(
            "reply does not contain a JSON object".to_string(),
        ));
    }

    let candidate = &text[start..=end];
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    serde_json::from_str(&python_to_json(candidate))
        .map_err(|e| Error::InvalidInput(format!("reply is not a valid object: {}", e)))
}

/// Rewrites Python literal syntax into JSON. String contents are left
/// untouched apart from quoting.
fn python_to_json(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    out.push(c);
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => {}
                        },
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            ',' => {
                let mut ahead = chars.clone();
                while ahead.peek().is_some_and(|c| c.is_whitespace()) {
                    ahead.next();
                }
                if !matches!(ahead.peek(), Some('}') | Some(']')) {
                    out.push(',');
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            other => out.push(other),
        }
    }

    out
}

/// Maps the strings `"true"`, `"false"` and `"null"` (any case, trimmed)
/// onto their JSON values. Everything else is returned unchanged.
pub fn normalize_str_value(value: &Value) -> Value {
    if let Value::String(s) = value {
        match s.trim().to_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            "null" => return Value::Null,
            _ => {}
        }
    }
    value.clone()
}

/// Text shown in a table cell: null renders empty.
pub fn cell_text(value: &Value) -> String {
    value_text(&normalize_str_value(value))
}

/// Builds the base-info table and one section per entry of every
/// top-level array of objects.
///
/// Entry fields follow the base info; an entry field with the same label
/// as a base-info row replaces that row's value in place.
pub fn build_assessment(reply: &Value) -> Result<Assessment> {
    let object = reply.as_object().ok_or_else(|| {
        Error::InvalidInput("assessment reply must be a JSON object".to_string())
    })?;

    let base_rows = base_info(object);
    let mut sections = Vec::new();

    for (key, value) in object {
        let Value::Array(entries) = value else {
            continue;
        };
        if !entries.iter().all(Value::is_object) {
            debug!(section = %key, "skipping array that is not a list of objects");
            continue;
        }
        for entry in entries.iter().filter_map(Value::as_object) {
            let mut rows = base_rows.clone();
            for (field, value) in entry {
                let text = cell_text(value);
                match rows.iter_mut().find(|r| r.field == *field) {
                    Some(row) => row.value = text,
                    None => rows.push(AssessmentRow {
                        field: field.clone(),
                        value: text,
                    }),
                }
            }
            sections.push(AssessmentSection {
                title: key.clone(),
                rows,
            });
        }
    }

    Ok(Assessment {
        title: ASSESSMENT_TITLE.to_string(),
        base_info: AssessmentSection {
            title: BASE_INFO_TITLE.to_string(),
            rows: base_rows,
        },
        sections,
    })
}

fn base_info(object: &Map<String, Value>) -> Vec<AssessmentRow> {
    let mut found: Vec<(BaseInfoField, String)> = Vec::new();

    for (key, value) in object {
        if value.is_array() || value.is_object() {
            continue;
        }
        match BaseInfoField::lookup(key) {
            Some(field) => match found.iter_mut().find(|(f, _)| *f == field) {
                Some(slot) => slot.1 = cell_text(value),
                None => found.push((field, cell_text(value))),
            },
            None => debug!(key = %key, "top-level key is not base info, ignoring"),
        }
    }

    found
        .into_iter()
        .map(|(field, value)| AssessmentRow {
            field: field.label().to_string(),
            value,
        })
        .collect()
}
