//! Document module - the input text and the processes found in it

use crate::process::Process;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Title used when the caller does not supply one
pub const UNTITLED: &str = "Untitled Document";

/// An uploaded document together with the processes extracted from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// UUIDv7 identifier
    pub id: String,
    /// Document title
    pub title: String,
    /// Original text content
    pub content: String,
    /// Extracted (and possibly elaborated) processes
    #[serde(default)]
    pub processes: Vec<Process>,
    /// Creation time (seconds since Unix epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Last update time (seconds since Unix epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
    /// Document version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Document {
    /// Create a document with a fresh UUIDv7 id and no processes
    ///
    /// # Examples
    ///
    /// ```
    /// use processflow_domain::Document;
    ///
    /// let doc = Document::new(None, "Step 1: Open inventory.");
    /// assert_eq!(doc.title, "Untitled Document");
    /// assert!(doc.processes.is_empty());
    /// ```
    pub fn new(title: Option<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            content: content.into(),
            processes: Vec::new(),
            created_at: Some(unix_now()),
            updated_at: None,
            version: None,
            tags: Vec::new(),
        }
    }

    /// Replace the processes and stamp `updated_at`
    pub fn set_processes(&mut self, processes: Vec<Process>) {
        self.processes = processes;
        self.updated_at = Some(unix_now());
    }
}

/// Current time in seconds since the Unix epoch (0 if the clock is before it)
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new(Some("Manual".to_string()), "text");
        assert_eq!(doc.title, "Manual");
        assert_eq!(doc.content, "text");
        assert!(doc.created_at.is_some());
        assert!(doc.updated_at.is_none());
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Document::new(None, "a");
        let b = Document::new(None, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_set_processes_stamps_update() {
        let mut doc = Document::new(None, "a");
        doc.set_processes(Vec::new());
        assert!(doc.updated_at.is_some());
    }

    #[test]
    fn test_json_shape() {
        let doc = Document::new(None, "content");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["title"], UNTITLED);
        assert!(json["processes"].as_array().unwrap().is_empty());
        assert!(json["tags"].is_array());
    }
}
