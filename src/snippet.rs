use chrono::{DateTime, Utc};
use nu_ansi_term::{Color, Style};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

lazy_static::lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// A stored, named command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to change on an existing snippet; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetPatch {
    pub command: Option<String>,
    pub description: Option<String>,
}

impl SnippetPatch {
    pub fn is_empty(&self) -> bool {
        self.command.is_none() && self.description.is_none()
    }
}

pub fn is_valid_id(id: &str) -> bool {
    ID_RE.is_match(id)
}

pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

impl Snippet {
    pub fn new(id: impl Into<String>, command: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            command: command.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: SnippetPatch) {
        if let Some(command) = patch.command {
            self.command = command;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.updated_at = Utc::now();
    }

    /// `[id] command` with the description on the next line.
    pub fn display_text(&self, color: bool) -> String {
        let (id_style, desc_style) = if color {
            (Color::Cyan.bold(), Style::new().dimmed())
        } else {
            (Style::new(), Style::new())
        };

        let head = format!("{} {}", id_style.paint(format!("[{}]", self.id)), self.command);
        if self.description.is_empty() {
            head
        } else {
            format!("{head}\n{}", desc_style.paint(&self.description))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_pattern() {
        for ok in ["deploy", "git-log_2", "A", "0"] {
            assert!(is_valid_id(ok), "{ok}");
        }
        for bad in ["", "has space", "dot.ted", "slash/id", "ünï"] {
            assert!(!is_valid_id(bad), "{bad}");
        }
        assert!(matches!(validate_id("x y"), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn display_without_color() {
        let snippet = Snippet::new("ll", "ls -la", "long listing");
        assert_eq!(snippet.display_text(false), "[ll] ls -la\nlong listing");

        let bare = Snippet::new("ll", "ls -la", "");
        assert_eq!(bare.display_text(false), "[ll] ls -la");
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let mut snippet = Snippet::new("ll", "ls -la", "long listing");
        let before = snippet.updated_at;
        snippet.apply(SnippetPatch {
            command: Some("ls -lah".into()),
            description: None,
        });
        assert_eq!(snippet.command, "ls -lah");
        assert_eq!(snippet.description, "long listing");
        assert!(snippet.updated_at >= before);
        assert!(SnippetPatch::default().is_empty());
    }
}
