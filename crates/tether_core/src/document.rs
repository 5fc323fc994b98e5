//! Markdown document model: front matter and content-field extraction.
//!
//! Entity files are markdown with an optional YAML-style front-matter block.
//! The front matter holds locally maintained metadata (status notes,
//! assignee) and is excluded from content hashing, so editing it never
//! registers as a content change to push. Operational state itself lives
//! in the pull-side read cache, not in the files.

use crate::hash::ContentHash;
use std::collections::BTreeMap;

/// Front-matter delimiter line.
const FRONT_MATTER_FENCE: &str = "---";

/// A parsed entity document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Raw front-matter key/value pairs (simple `key: value` lines only).
    pub front_matter: BTreeMap<String, String>,
    /// Everything after the front-matter block.
    pub body: String,
}

impl Document {
    /// Parses a document from raw file contents.
    ///
    /// A front-matter block is recognized only when the very first line is
    /// `---`; an unterminated block is treated as body text rather than
    /// silently swallowing the whole file.
    pub fn parse(raw: &str) -> Self {
        let mut lines = raw.lines();

        if lines.next() != Some(FRONT_MATTER_FENCE) {
            return Self {
                front_matter: BTreeMap::new(),
                body: raw.to_string(),
            };
        }

        let mut front_matter = BTreeMap::new();
        let mut consumed = 1usize;
        let mut terminated = false;

        for line in lines {
            consumed += 1;
            if line.trim_end() == FRONT_MATTER_FENCE {
                terminated = true;
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                front_matter.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if !terminated {
            return Self {
                front_matter: BTreeMap::new(),
                body: raw.to_string(),
            };
        }

        let body: String = raw
            .lines()
            .skip(consumed)
            .collect::<Vec<_>>()
            .join("\n");

        Self { front_matter, body }
    }

    /// Computes the content hash of this document (front matter excluded).
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of_body(self.body.trim())
    }

    /// Extracts the title: the first `# ` heading, or the first non-empty
    /// line as a fallback.
    pub fn title(&self) -> Option<String> {
        for line in self.body.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(heading) = trimmed.strip_prefix("# ") {
                return Some(heading.trim().to_string());
            }
            return Some(trimmed.to_string());
        }
        None
    }

    /// Extracts the description: prose between the title and the first
    /// `##` section heading.
    pub fn description(&self) -> Option<String> {
        let mut out = Vec::new();
        let mut past_title = false;

        for line in self.body.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("## ") {
                break;
            }
            if trimmed.starts_with("# ") {
                past_title = true;
                continue;
            }
            if past_title || !trimmed.is_empty() {
                past_title = true;
                out.push(line);
            }
        }

        let text = out.join("\n").trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Extracts the text of a named `##` section (e.g. "Acceptance Criteria").
    ///
    /// The match is case-insensitive. Returns the section body up to the next
    /// `##` heading, trimmed.
    pub fn section(&self, name: &str) -> Option<String> {
        let wanted = name.to_lowercase();
        let mut collecting = false;
        let mut out = Vec::new();

        for line in self.body.lines() {
            let trimmed = line.trim();
            if let Some(heading) = trimmed.strip_prefix("## ") {
                if collecting {
                    break;
                }
                collecting = heading.trim().to_lowercase() == wanted;
                continue;
            }
            if collecting {
                out.push(line);
            }
        }

        let text = out.join("\n").trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
