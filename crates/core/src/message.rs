use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session::validate_session_token;
use crate::user::ComplexityLevel;

/// One question/answer exchange. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    /// Session token; not a foreign key, may name a session that does not exist.
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    /// Raw JSON text as stored.
    pub sources: Option<String>,
    pub complexity_level: Option<ComplexityLevel>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Decode the stored `sources` JSON.
    ///
    /// # Errors
    /// Returns `MalformedSources` when the column holds text that is not JSON
    /// of the requested shape (possible for rows written outside this crate).
    pub fn decode_sources<T: DeserializeOwned>(&self) -> Result<Option<T>, ValidationError> {
        self.sources
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    ValidationError::MalformedSources(format!("message {}: {e}", self.id))
                })
            })
            .transpose()
    }

    /// Sources as the list of strings the bot writes; empty when absent.
    ///
    /// # Errors
    /// See [`Message::decode_sources`].
    pub fn source_list(&self) -> Result<Vec<String>, ValidationError> {
        Ok(self.decode_sources::<Vec<String>>()?.unwrap_or_default())
    }

    /// Sources entries that follow the `"<title>: <url>"` shape.
    ///
    /// # Errors
    /// See [`Message::decode_sources`].
    pub fn source_refs(&self) -> Result<Vec<SourceRef>, ValidationError> {
        Ok(self.source_list()?.iter().filter_map(|entry| SourceRef::parse(entry)).collect())
    }
}

/// Insert payload for [`Message`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    /// Encoded JSON; checked again by [`NewMessage::validate`] before insert.
    pub sources: Option<String>,
    pub complexity_level: Option<ComplexityLevel>,
}

impl NewMessage {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            sources: None,
            complexity_level: None,
        }
    }

    /// Attach a list of sources. An empty list is stored as NULL.
    ///
    /// # Errors
    /// Returns `MalformedSources` if the list cannot be serialized.
    pub fn with_sources<S: AsRef<str>>(mut self, sources: &[S]) -> Result<Self, ValidationError> {
        self.sources = if sources.is_empty() {
            None
        } else {
            let entries: Vec<&str> = sources.iter().map(AsRef::as_ref).collect();
            Some(
                serde_json::to_string(&entries)
                    .map_err(|e| ValidationError::MalformedSources(e.to_string()))?,
            )
        };
        Ok(self)
    }

    /// Attach pre-encoded sources JSON.
    ///
    /// # Errors
    /// Returns `MalformedSources` unless `raw` is a JSON array or object.
    pub fn with_raw_sources(mut self, raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        validate_sources_json(&raw)?;
        self.sources = Some(raw);
        Ok(self)
    }

    #[must_use]
    pub const fn with_complexity(mut self, level: ComplexityLevel) -> Self {
        self.complexity_level = Some(level);
        self
    }

    /// # Errors
    /// Returns an error for a blank or overlong token, or sources that are not
    /// a JSON array or object.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_session_token(&self.session_id)?;
        self.sources.as_deref().map_or(Ok(()), validate_sources_json)
    }
}

fn validate_sources_json(raw: &str) -> Result<(), ValidationError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ValidationError::MalformedSources(e.to_string()))?;
    if value.is_array() || value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::MalformedSources("expected a JSON array or object".to_owned()))
    }
}

/// A citation rendered by the bot as `"<title>: <url>"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

impl SourceRef {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }

    /// Split on the last `": "` so titles may contain colons.
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let (title, url) = entry.rsplit_once(": ")?;
        let (title, url) = (title.trim(), url.trim());
        if title.is_empty() || url.is_empty() {
            return None;
        }
        Some(Self::new(title, url))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(sources: Option<&str>) -> Message {
        Message {
            id: 7,
            session_id: "sess-1".to_owned(),
            user_message: "hi".to_owned(),
            bot_response: "hello".to_owned(),
            sources: sources.map(str::to_owned),
            complexity_level: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_source_list_is_stored_as_null() {
        let msg = NewMessage::new("s", "q", "a").with_sources::<&str>(&[]).unwrap();
        assert_eq!(msg.sources, None);
    }

    #[test]
    fn source_list_is_encoded_as_json_array() {
        let msg = NewMessage::new("s", "q", "a").with_sources(&["doc1", "doc2"]).unwrap();
        assert_eq!(msg.sources.as_deref(), Some(r#"["doc1","doc2"]"#));
    }

    #[test]
    fn raw_sources_must_be_array_or_object() {
        assert!(NewMessage::new("s", "q", "a").with_raw_sources(r#"["doc1"]"#).is_ok());
        assert!(NewMessage::new("s", "q", "a").with_raw_sources(r#"{"a":1}"#).is_ok());
        assert!(matches!(
            NewMessage::new("s", "q", "a").with_raw_sources("not json"),
            Err(ValidationError::MalformedSources(_))
        ));
        assert!(matches!(
            NewMessage::new("s", "q", "a").with_raw_sources("42"),
            Err(ValidationError::MalformedSources(_))
        ));
    }

    #[test]
    fn validate_catches_sources_set_directly() {
        let mut msg = NewMessage::new("s", "q", "a");
        msg.sources = Some("oops".to_owned());
        assert!(msg.validate().is_err());
    }

    #[test]
    fn malformed_stored_sources_surface_on_decode() {
        let msg = stored(Some("not json"));
        assert!(matches!(msg.source_list(), Err(ValidationError::MalformedSources(_))));
        assert_eq!(stored(None).source_list().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn source_refs_parse_title_and_url() {
        let msg = stored(Some(r#"["Case: Retail bot: https://example.com/retail", "doc1"]"#));
        let refs = msg.source_refs().unwrap();
        assert_eq!(refs, vec![SourceRef::new("Case: Retail bot", "https://example.com/retail")]);
        assert_eq!(refs[0].to_string(), "Case: Retail bot: https://example.com/retail");
    }
}
