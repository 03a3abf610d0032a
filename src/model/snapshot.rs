//! Persisted editor snapshot types
//!
//! An [`EditorSnapshot`] is the JSON document stored under one namespaced key
//! per tab. Its `code` field is either the raw text or the codec's compressed
//! form, tagged by `compressed`. [`EditorState`] is the decoded, in-memory
//! counterpart the controller works with.

use serde::{Deserialize, Deserializer, Serialize};

/// Current snapshot schema version. Readers discard anything else.
pub const SCHEMA_VERSION: u32 = 1;

/// Selection range as UTF-8 byte offsets into the editor text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Collapsed selection (a bare caret)
    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Caret placed after the last character of `text`
    pub fn end_of(text: &str) -> Self {
        Self::caret(text.len())
    }

    /// Clamp both ends into `[0, text.len()]`, snapping down to char
    /// boundaries, and order them so `start <= end`.
    ///
    /// Stored offsets may come from a longer previous text.
    pub fn clamped_to(self, text: &str) -> Self {
        let end = floor_char_boundary(text, self.end);
        let start = floor_char_boundary(text, self.start).min(end);
        Self { start, end }
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// One persisted unit of editor state, as written to the tab store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    #[serde(alias = "version")]
    pub schema_version: u32,
    /// Raw text, or the codec's encoded form when `compressed` is set
    pub code: String,
    #[serde(default)]
    pub compressed: bool,
    /// Absent in hand-written or older entries; restored as caret-at-end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    /// Browsers may report fractional pixels; rounded on read
    #[serde(default, deserialize_with = "deserialize_scroll_top")]
    pub scroll_top: u32,
    /// Milliseconds since the Unix epoch
    pub updated_at: i64,
    pub session_id: String,
}

impl EditorSnapshot {
    /// Whether this snapshot is older than `ttl_millis` at `now_millis`
    pub fn is_expired(&self, now_millis: i64, ttl_millis: i64) -> bool {
        now_millis.saturating_sub(self.updated_at) > ttl_millis
    }
}

fn deserialize_scroll_top<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value.round().min(f64::from(u32::MAX)) as u32)
}

/// Decoded editor state: text, selection and vertical scroll offset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditorState {
    pub code: String,
    pub selection: Selection,
    pub scroll_top: u32,
}

impl EditorState {
    pub fn new(code: impl Into<String>, selection: Selection, scroll_top: u32) -> Self {
        let code = code.into();
        let selection = selection.clamped_to(&code);
        Self {
            code,
            selection,
            scroll_top,
        }
    }

    /// Wrap bare text (legacy or fallback entries): caret at end, scrolled to top
    pub fn from_text(code: impl Into<String>) -> Self {
        let code = code.into();
        let selection = Selection::end_of(&code);
        Self {
            code,
            selection,
            scroll_top: 0,
        }
    }
}
