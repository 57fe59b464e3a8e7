//! Changelog synthesis.
//!
//! New version sections are inserted above the newest existing section, below
//! the title and preamble. Bytes of earlier sections are never rewritten, and
//! updating with a version that is already present is a no-op.

use crate::config::ChangelogConfig;
use crate::domain::{Category, CommitRecord, Version};
use chrono::NaiveDate;
use serde::Serialize;

const GROUPS: [Category; 3] = [Category::Features, Category::Fixes, Category::Other];
const SECTION_MARKER: &str = "## [";

/// Result of merging a new section into a changelog document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogUpdate {
    /// The full document after the update
    pub document: String,
    /// The inserted section, `None` when nothing was inserted
    pub section: Option<String>,
    pub changed: bool,
}

pub struct ChangelogSynthesizer {
    title: String,
    preamble: String,
}

impl ChangelogSynthesizer {
    pub fn new(config: &ChangelogConfig) -> Self {
        ChangelogSynthesizer {
            title: config.title.clone(),
            preamble: config.preamble.clone(),
        }
    }

    /// Render one version section; groups without entries are omitted.
    pub fn render_section(&self, version: &str, date: NaiveDate, records: &[CommitRecord]) -> String {
        let mut out = format!("## [{}] - {}\n", version, date.format("%Y-%m-%d"));

        for group in GROUPS {
            let entries: Vec<&CommitRecord> = records
                .iter()
                .filter(|r| r.type_category() == group)
                .collect();
            if entries.is_empty() {
                continue;
            }
            out.push_str(&format!("\n### {}\n\n", group.title()));
            for record in entries {
                out.push_str(&format!("- {} ({})\n", record.description, record.short_hash()));
            }
        }
        out
    }

    /// Insert a section for `version` into `existing`.
    pub fn update(
        &self,
        existing: &str,
        version: &str,
        date: NaiveDate,
        records: &[CommitRecord],
    ) -> ChangelogUpdate {
        if records.is_empty() || contains_version(existing, version) {
            return ChangelogUpdate {
                document: existing.to_string(),
                section: None,
                changed: false,
            };
        }

        let section = self.render_section(version, date, records);
        let mut document = if existing.trim().is_empty() {
            self.skeleton()
        } else {
            existing.to_string()
        };

        match find_first_section(&document) {
            Some(offset) => {
                let tail = document.split_off(offset);
                ensure_blank_line(&mut document);
                document.push_str(&section);
                document.push('\n');
                document.push_str(&tail);
            }
            None => {
                ensure_blank_line(&mut document);
                document.push_str(&section);
            }
        }

        tracing::debug!(version, "changelog section inserted");
        ChangelogUpdate {
            document,
            section: Some(section),
            changed: true,
        }
    }

    fn skeleton(&self) -> String {
        let mut doc = format!("# {}\n\n", self.title);
        if !self.preamble.trim().is_empty() {
            doc.push_str(self.preamble.trim_end());
            doc.push_str("\n\n");
        }
        doc
    }
}

/// Whether the document already has a section for `version`
pub fn contains_version(document: &str, version: &str) -> bool {
    let header = format!("{}{}]", SECTION_MARKER, version);
    document.lines().any(|line| line.starts_with(&header))
}

/// Offset of the first `## [<version>]` header; `## [Unreleased]` and other
/// non-version headers stay above new sections.
fn find_first_section(document: &str) -> Option<usize> {
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if is_version_header(line) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn is_version_header(line: &str) -> bool {
    line.strip_prefix(SECTION_MARKER)
        .and_then(|rest| rest.split_once(']'))
        .is_some_and(|(label, _)| Version::parse(label).is_ok())
}

fn ensure_blank_line(head: &mut String) {
    if head.is_empty() {
        return;
    }
    if !head.ends_with('\n') {
        head.push('\n');
    }
    if !head.ends_with("\n\n") {
        head.push('\n');
    }
}
