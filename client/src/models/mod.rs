//! Domain models shared by the session, the HTTP client and the mock server.
//!
//! - [`LeadRecord`] - Prospect data supplied by the draft service (read-only)
//! - [`EmailDraft`] - Normalized `{to, subject, body}` email
//! - [`LeadDraft`] - One row of a result set: a lead and its drafted email
//! - [`EmailField`] - Editable field of an [`EmailDraft`]
//!
//! Request/response bodies of the three endpoints live here as well.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Lead
// =============================================================================

/// A prospective contact as returned by the draft service.
///
/// All fields are opaque display strings. Spreadsheet cells may come back as
/// numbers or `null`, so every field accepts any JSON scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default, deserialize_with = "opaque_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub company_name: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub job_title: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub industry: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub lead_type: String,
    #[serde(default, deserialize_with = "opaque_string")]
    pub notes_event: String,
}

impl LeadRecord {
    /// "First Last", trimmed when either part is missing.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Text form of an arbitrary JSON value: strings as-is, `null` as empty.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn opaque_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

// =============================================================================
// Email
// =============================================================================

/// An email in the one shape the rest of the crate works with.
///
/// Build it from service payloads with [`crate::email::normalize_email`];
/// the draft service may send either an object or a legacy string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    #[serde(default, alias = "To")]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl EmailDraft {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Current value of a field.
    pub fn get(&self, field: EmailField) -> &str {
        match field {
            EmailField::To => &self.to,
            EmailField::Subject => &self.subject,
            EmailField::Body => &self.body,
        }
    }

    /// Overwrite a field. No validation: empty strings and odd addresses are kept.
    pub fn set(&mut self, field: EmailField, value: impl Into<String>) {
        let value = value.into();
        match field {
            EmailField::To => self.to = value,
            EmailField::Subject => self.subject = value,
            EmailField::Body => self.body = value,
        }
    }
}

/// One of the user-editable fields of an [`EmailDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailField {
    To,
    Subject,
    Body,
}

impl EmailField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailField::To => "to",
            EmailField::Subject => "subject",
            EmailField::Body => "body",
        }
    }
}

impl fmt::Display for EmailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to" | "recipient" => Ok(EmailField::To),
            "subject" => Ok(EmailField::Subject),
            "body" => Ok(EmailField::Body),
            other => Err(format!("Unknown email field '{}' (expected to, subject or body)", other)),
        }
    }
}

// =============================================================================
// Result rows
// =============================================================================

/// A lead paired with the email drafted for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadDraft {
    pub lead: LeadRecord,
    pub draft: EmailDraft,
}

// =============================================================================
// Wire types
// =============================================================================

/// One element of the draft service's `Response` array, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftItem {
    #[serde(default)]
    pub lead_data: LeadRecord,
    #[serde(default)]
    pub drafted_email: Value,
}

/// Body of a refactor request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorRequest {
    pub original_email: EmailDraft,
    pub user_prompt: String,
}

/// Body of a refactor response. The email may be an object or a string.
#[derive(Debug, Clone, Deserialize)]
pub struct RefactorResponse {
    pub rewritten_email: Value,
}

/// Body of a send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub email_data: EmailDraft,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_accepts_numbers_and_nulls() {
        let lead: LeadRecord = serde_json::from_value(json!({
            "first_name": "Ada",
            "last_name": null,
            "company_name": 42,
            "job_title": "CTO"
        }))
        .unwrap();

        assert_eq!(lead.first_name, "Ada");
        assert_eq!(lead.last_name, "");
        assert_eq!(lead.company_name, "42");
        assert_eq!(lead.industry, "");
        assert_eq!(lead.full_name(), "Ada");
    }

    #[test]
    fn test_email_field_parse() {
        assert_eq!("Body".parse::<EmailField>().unwrap(), EmailField::Body);
        assert_eq!("to".parse::<EmailField>().unwrap(), EmailField::To);
        assert!("cc".parse::<EmailField>().is_err());
    }

    #[test]
    fn test_set_accepts_anything() {
        let mut email = EmailDraft::new("a@b.com", "Hi", "text");
        email.set(EmailField::To, "not an address");
        email.set(EmailField::Subject, "");
        assert_eq!(email.get(EmailField::To), "not an address");
        assert_eq!(email.get(EmailField::Subject), "");
    }

    #[test]
    fn test_send_request_shape() {
        let request = SendRequest {
            email_data: EmailDraft::new("a@b.com", "Hi", "text"),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"email_data": {"to": "a@b.com", "subject": "Hi", "body": "text"}})
        );
    }
}
