//! Line-preserving frontmatter codec.
//!
//! A ticket file looks like:
//! ```text
//! ---
//! key: value
//! blocked-by: [a, b]
//! ---
//! # Title
//!
//! Body content...
//! ```
//!
//! [`Document`] keeps every frontmatter line's raw text, so emitting an
//! unmodified document reproduces the input byte for byte, and field-level
//! edits leave all other lines untouched.

use crate::error::{Result, TixError};
use crate::types::{FIELD_BLOCKED_BY, FIELD_STATUS, TicketStatus, format_id_list};

const DELIMITER: &str = "---";

/// Upper bound on frontmatter field lines before the closing delimiter.
pub const MAX_FRONTMATTER_LINES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldLine {
    raw: String,
    key_len: usize,
    value_start: usize,
}

impl FieldLine {
    fn parse(raw: &str, line_no: usize) -> Result<Self> {
        let (key_len, value_start) = if let Some(pos) = raw.rfind(": ") {
            (pos, pos + 2)
        } else if let Some(stripped) = raw.strip_suffix(':') {
            (stripped.len(), raw.len())
        } else {
            return Err(TixError::InvalidLine {
                line_no,
                line: raw.to_string(),
            });
        };

        if key_len == 0 || raw[..key_len].trim().is_empty() {
            return Err(TixError::InvalidLine {
                line_no,
                line: raw.to_string(),
            });
        }

        Ok(FieldLine {
            raw: raw.to_string(),
            key_len,
            value_start,
        })
    }

    fn new(key: &str, value: &str) -> Self {
        FieldLine {
            raw: format!("{key}: {value}"),
            key_len: key.len(),
            value_start: key.len() + 2,
        }
    }

    fn key(&self) -> &str {
        &self.raw[..self.key_len]
    }

    fn value(&self) -> &str {
        &self.raw[self.value_start..]
    }
}

/// A parsed ticket file: ordered frontmatter lines plus the raw remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<FieldLine>,
    /// Everything after the closing `---` (normally starts with `\n`).
    rest: String,
}

impl Document {
    /// Parse a document, enforcing the delimiter and line grammar.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.split('\n');

        match lines.next() {
            Some(first) if first == DELIMITER && content.len() > DELIMITER.len() => {}
            _ => return Err(TixError::NoFrontmatter),
        }

        let mut offset = DELIMITER.len() + 1;
        let mut fields = Vec::new();

        for line in lines {
            if line == DELIMITER {
                let rest = content[offset + DELIMITER.len()..].to_string();
                return Ok(Document {
                    lines: fields,
                    rest,
                });
            }

            if offset == content.len() {
                break;
            }

            if fields.len() == MAX_FRONTMATTER_LINES {
                return Err(TixError::FrontmatterOverflow(MAX_FRONTMATTER_LINES));
            }

            // line numbers are 1-based and count the opening delimiter
            fields.push(FieldLine::parse(line, fields.len() + 2)?);
            offset += line.len() + 1;
        }

        Err(TixError::UnclosedFrontmatter)
    }

    /// Build a document from scratch; fields are emitted in the given order.
    pub fn from_fields<'a, I>(fields: I, body: &str) -> Self
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        Document {
            lines: fields
                .into_iter()
                .map(|(key, value)| FieldLine::new(key, &value))
                .collect(),
            rest: format!("\n{body}"),
        }
    }

    /// Serialize back to file content.
    pub fn emit(&self) -> String {
        let mut out = String::with_capacity(
            self.rest.len() + self.lines.iter().map(|l| l.raw.len() + 1).sum::<usize>() + 8,
        );
        out.push_str(DELIMITER);
        out.push('\n');
        for line in &self.lines {
            out.push_str(&line.raw);
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push_str(&self.rest);
        out
    }

    /// Value of the first line with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.key() == key)
            .map(FieldLine::value)
    }

    /// Keys in file order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(FieldLine::key)
    }

    /// Text after the closing delimiter line.
    pub fn body(&self) -> &str {
        self.rest.strip_prefix('\n').unwrap_or(&self.rest)
    }

    /// Title from the first `# ` heading of the body, if any.
    pub fn title(&self) -> Option<String> {
        self.body()
            .lines()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| line.strip_prefix("# "))
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Replace the value of an existing field in place, or append the field
    /// at the end of the frontmatter.
    pub fn set_field(&mut self, key: &str, value: &str) {
        match self.lines.iter_mut().find(|line| line.key() == key) {
            Some(line) => *line = FieldLine::new(key, value),
            None => self.lines.push(FieldLine::new(key, value)),
        }
    }

    /// Remove every line with this key. Returns whether anything was removed.
    pub fn remove_field(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.key() != key);
        self.lines.len() != before
    }

    pub fn set_status(&mut self, status: TicketStatus) {
        self.set_field(FIELD_STATUS, status.as_str());
    }

    pub fn set_blocked_by(&mut self, ids: &[String]) {
        self.set_field(FIELD_BLOCKED_BY, &format_id_list(ids));
    }
}

/// Whether `key: value` reads back as exactly this key and value.
///
/// The key ends at the last `": "` of a line, so a value containing that
/// sequence would be split into a different key and value.
pub fn is_storable(key: &str, value: &str) -> bool {
    !value.contains(['\n', '\r'])
        && FieldLine::parse(&FieldLine::new(key, value).raw, 0)
            .is_ok_and(|line| line.key() == key && line.value() == value)
}

/// Parse a bracketed id list such as `[a, b]` or `[]`.
pub fn parse_id_list(value: &str) -> Option<Vec<String>> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }

    inner
        .split(',')
        .map(|item| {
            let item = item.trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKET: &str = "---
id: p23x0f4k
schema_version: 1
blocked-by: []
created: 2026-01-04T00:00:00Z
priority: 2
status: open
type: task
---
# Fix flaky test
";

    #[test]
    fn test_round_trip_is_byte_identical() {
        let doc = Document::parse(TICKET).unwrap();
        assert_eq!(doc.emit(), TICKET);
    }

    #[test]
    fn test_round_trip_preserves_odd_spacing_and_unknown_keys() {
        let content = "---\nid: a\nx-custom:   spaced   value\nnote:\n---\n\n# T\n\nbody --- dashes\n---\n";
        let doc = Document::parse(content).unwrap();
        assert_eq!(doc.emit(), content);
        assert_eq!(doc.get("x-custom"), Some("  spaced   value"));
        assert_eq!(doc.get("note"), Some(""));
    }

    #[test]
    fn test_round_trip_without_trailing_newline() {
        let content = "---\nid: a\n---";
        let doc = Document::parse(content).unwrap();
        assert_eq!(doc.emit(), content);
        assert_eq!(doc.body(), "");
    }

    #[test]
    fn test_key_is_longest_prefix_before_separator() {
        let doc = Document::parse("---\na: b: c\n---\n").unwrap();
        assert_eq!(doc.get("a: b"), Some("c"));
        assert_eq!(doc.get("a"), None);
    }

    #[test]
    fn test_missing_opening_delimiter() {
        let result = Document::parse("# No frontmatter\n\nJust content.");
        assert!(matches!(result, Err(TixError::NoFrontmatter)));
    }

    #[test]
    fn test_bare_delimiter_is_not_frontmatter() {
        assert!(matches!(Document::parse("---"), Err(TixError::NoFrontmatter)));
        assert!(matches!(Document::parse(""), Err(TixError::NoFrontmatter)));
    }

    #[test]
    fn test_unclosed_frontmatter() {
        let result = Document::parse("---\nid: a\nstatus: open\n# Title\n");
        assert!(matches!(result, Err(TixError::InvalidLine { .. })));

        let result = Document::parse("---\nid: a\nstatus: open\n");
        assert!(matches!(result, Err(TixError::UnclosedFrontmatter)));
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let result = Document::parse("---\nid: a\nnot a field\n---\n");
        match result {
            Err(TixError::InvalidLine { line_no, line }) => {
                assert_eq!(line_no, 3);
                assert_eq!(line, "not a field");
            }
            other => panic!("expected InvalidLine, got {other:?}"),
        }
    }

    #[test]
    fn test_overflow_boundary() {
        let mut at_limit = String::from("---\n");
        for i in 0..MAX_FRONTMATTER_LINES {
            at_limit.push_str(&format!("k{i}: v\n"));
        }
        let mut over_limit = at_limit.clone();
        at_limit.push_str("---\n");
        assert!(Document::parse(&at_limit).is_ok());

        over_limit.push_str("extra: v\n---\n");
        assert!(matches!(
            Document::parse(&over_limit),
            Err(TixError::FrontmatterOverflow(MAX_FRONTMATTER_LINES))
        ));
    }

    #[test]
    fn test_set_field_preserves_other_lines() {
        let mut doc = Document::parse(TICKET).unwrap();
        doc.set_status(TicketStatus::InProgress);
        let out = doc.emit();

        let before: Vec<&str> = TICKET.lines().collect();
        let after: Vec<&str> = out.lines().collect();
        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(&after) {
            if old.starts_with("status:") {
                assert_eq!(*new, "status: in_progress");
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_set_field_appends_missing_key() {
        let mut doc = Document::parse(TICKET).unwrap();
        doc.set_field("closed", "2026-01-05T00:00:00Z");
        let out = doc.emit();
        assert!(out.contains("type: task\nclosed: 2026-01-05T00:00:00Z\n---\n# Fix flaky test"));
    }

    #[test]
    fn test_remove_field_then_set_restores_bytes() {
        let mut doc = Document::parse(TICKET).unwrap();
        doc.set_field("closed", "2026-01-05T00:00:00Z");
        assert!(doc.remove_field("closed"));
        assert_eq!(doc.emit(), TICKET);
        assert!(!doc.remove_field("closed"));
    }

    #[test]
    fn test_set_blocked_by_emits_literal_brackets() {
        let mut doc = Document::parse(TICKET).unwrap();
        doc.set_blocked_by(&["a1".to_string(), "b2".to_string()]);
        assert_eq!(doc.get("blocked-by"), Some("[a1, b2]"));
        doc.set_blocked_by(&[]);
        assert_eq!(doc.get("blocked-by"), Some("[]"));
        assert_eq!(doc.emit(), TICKET);
    }

    #[test]
    fn test_title_extraction() {
        let doc = Document::parse("---\nid: a\n---\n\n# My title \n\ntext\n").unwrap();
        assert_eq!(doc.title().as_deref(), Some("My title"));

        let doc = Document::parse("---\nid: a\n---\nno heading\n# Later\n").unwrap();
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn test_is_storable() {
        assert!(is_storable("assignee", "Bob Smith"));
        assert!(is_storable("assignee", "ops:oncall"));
        assert!(is_storable("assignee", "Bob:"));
        assert!(!is_storable("assignee", "Bob: Smith"));
        assert!(!is_storable("assignee", "a\nb"));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("[]"), Some(vec![]));
        assert_eq!(parse_id_list("[ ]"), Some(vec![]));
        assert_eq!(
            parse_id_list("[a, b]"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_id_list("[a,,b]"), None);
        assert_eq!(parse_id_list("a, b"), None);
    }
}
