//! Email payload normalization.
//!
//! The draft and refactor services return emails in two encodings:
//!
//! ```text
//! {"To": "a@b.com", "subject": "Hi", "body": "..."}     structured
//! "Subject: Hi\n..."                                   legacy string
//! ```
//!
//! A legacy string may itself contain serialized JSON. Everything funnels
//! through [`normalize_email`] so no display or edit site deals with the
//! encodings.

use serde_json::{Map, Value};

use crate::models::{value_to_text, EmailDraft};

const SUBJECT_PREFIX: &str = "Subject:";

/// Normalize any email payload into an [`EmailDraft`]. Never fails.
pub fn normalize_email(payload: &Value) -> EmailDraft {
    match payload {
        Value::Object(map) => from_object(map),
        Value::String(raw) => normalize_email_str(raw),
        other => EmailDraft {
            body: value_to_text(other),
            ..EmailDraft::default()
        },
    }
}

/// Normalize an email that arrived as a string.
///
/// JSON objects encoded in the string are honoured; anything else is read as
/// the legacy `Subject: <subject>\n<body>` form.
pub fn normalize_email_str(raw: &str) -> EmailDraft {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => from_object(&map),
        _ => parse_legacy(raw),
    }
}

fn from_object(map: &Map<String, Value>) -> EmailDraft {
    let field = |key: &str| map.get(key).map(value_to_text).unwrap_or_default();

    let to = match map.get("To") {
        Some(value) => value_to_text(value),
        None => field("to"),
    };

    EmailDraft {
        to,
        subject: field("subject"),
        body: field("body"),
    }
}

fn parse_legacy(raw: &str) -> EmailDraft {
    let (first, rest) = match raw.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (raw, ""),
    };

    match first.strip_prefix(SUBJECT_PREFIX) {
        Some(subject) => EmailDraft {
            to: String::new(),
            subject: subject.trim().to_string(),
            body: rest.trim().to_string(),
        },
        None => EmailDraft {
            to: String::new(),
            subject: String::new(),
            body: raw.to_string(),
        },
    }
}
