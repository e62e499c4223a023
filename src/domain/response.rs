//! Aggregated outcome of a refresh operation
//!
//! Every stage of the pipeline reports through a [`MetadataEventResponse`]
//! rather than failing. Responses combine by order-preserving concatenation
//! of their messages and errors, with the empty response as identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a soft error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Unknown project coordinate
    NotFound,
    /// Upstream listing or lookup failed
    Repository,
    /// Requested version or coordinates are not valid upstream
    Validation,
    /// No content handler for a configured artifact type
    Content,
    /// Anything else raised inside a guarded unit of work
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not-found",
            Self::Repository => "repository",
            Self::Validation => "validation",
            Self::Content => "content",
            Self::Unexpected => "unexpected",
        };
        write!(f, "{}", name)
    }
}

/// A structured soft error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EventError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Informational messages and soft errors collected by a refresh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEventResponse {
    pub messages: Vec<String>,
    pub errors: Vec<EventError>,
}

impl MetadataEventResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.push(message.into());
        self
    }

    pub fn add_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> &mut Self {
        self.errors.push(EventError::new(kind, message));
        self
    }

    /// Append `other`'s messages and errors after this response's own
    pub fn merge(&mut self, other: MetadataEventResponse) -> &mut Self {
        self.messages.extend(other.messages);
        self.errors.extend(other.errors);
        self
    }

    /// By-value form of [`merge`](Self::merge)
    pub fn combine(mut self, other: MetadataEventResponse) -> Self {
        self.merge(other);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True for the response of a skipped (already running) refresh
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}

impl FromIterator<MetadataEventResponse> for MetadataEventResponse {
    fn from_iter<I: IntoIterator<Item = MetadataEventResponse>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::combine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(messages: &[&str], errors: &[&str]) -> MetadataEventResponse {
        let mut r = MetadataEventResponse::new();
        for m in messages {
            r.add_message(*m);
        }
        for e in errors {
            r.add_error(ErrorKind::Unexpected, *e);
        }
        r
    }

    #[test]
    fn combine_concatenates_in_order() {
        let a = response(&["a1", "a2"], &["ae1"]);
        let b = response(&["b1"], &["be1", "be2"]);

        let combined = a.clone().combine(b.clone());

        assert_eq!(combined.messages, vec!["a1", "a2", "b1"]);
        assert_eq!(combined.error_messages(), vec!["ae1", "be1", "be2"]);
        assert_eq!(combined.messages.len(), a.messages.len() + b.messages.len());
    }

    #[test]
    fn empty_is_identity() {
        let a = response(&["m"], &["e"]);
        assert_eq!(MetadataEventResponse::new().combine(a.clone()), a);
        assert_eq!(a.clone().combine(MetadataEventResponse::new()), a);
    }

    #[test]
    fn has_errors_tracks_error_list() {
        let mut r = response(&["only a message"], &[]);
        assert!(!r.has_errors());
        r.add_error(ErrorKind::Validation, "bad version");
        assert!(r.has_errors());
    }

    #[test]
    fn collects_from_iterator() {
        let parts = vec![response(&["1"], &[]), response(&["2"], &["x"])];
        let total: MetadataEventResponse = parts.into_iter().collect();
        assert_eq!(total.messages, vec!["1", "2"]);
        assert_eq!(total.errors.len(), 1);
    }

    #[test]
    fn error_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EventError::new(ErrorKind::NotFound, "x")).unwrap();
        assert!(json.contains("\"not-found\""));
    }
}
