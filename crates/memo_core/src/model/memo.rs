//! Memo domain model.
//!
//! # Responsibility
//! - Define the typed memo record read from the document store.
//! - Define the raw document shape and its lenient mapping to `Memo`.
//! - Own text/group/color normalization shared by every write path.
//!
//! # Invariants
//! - `MemoId` is assigned by the store and stable for the document lifetime.
//! - A persisted memo never has empty trimmed text.
//! - `owner_id` is set at creation and never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Collection name holding memo documents.
pub const MEMO_COLLECTION: &str = "memos";

/// Neutral gray used when a memo or group carries no color.
pub const DEFAULT_MEMO_COLOR: &str = "#9ca3af";

/// Colors offered by the detail editor picker, default first.
pub const MEMO_COLOR_PALETTE: &[&str] = &[
    DEFAULT_MEMO_COLOR,
    "#3b82f6",
    "#a855f7",
    "#22c55e",
    "#f97316",
    "#ef4444",
];

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));

/// Store-assigned opaque memo identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoId(String);

impl MemoId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for MemoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MemoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Anonymous session identity; doubles as the memo owner id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Typed memo as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo {
    pub id: MemoId,
    pub text: String,
    /// Empty string means ungrouped.
    pub group_name: String,
    /// `#rrggbb`; `None` displays as [`DEFAULT_MEMO_COLOR`].
    pub color: Option<String>,
    pub owner_id: SessionId,
    /// Store-assigned epoch milliseconds. Only used for ordering.
    pub created_at: i64,
}

impl Memo {
    /// Maps a raw store document to a typed memo.
    ///
    /// Missing string fields default to empty, matching how the store
    /// tolerates partially written documents.
    pub fn from_document(id: MemoId, document: MemoDocument) -> Self {
        Self {
            id,
            text: document.text.unwrap_or_default(),
            group_name: document.group_name.unwrap_or_default(),
            color: document.color,
            owner_id: SessionId::new(document.user_id.unwrap_or_default()),
            created_at: document.created_at.unwrap_or_default(),
        }
    }

    /// Trimmed group name; empty for ungrouped memos.
    pub fn group_key(&self) -> &str {
        self.group_name.trim()
    }

    /// Color for display, falling back to the neutral gray.
    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_MEMO_COLOR)
    }

    pub fn is_owned_by(&self, session: &SessionId) -> bool {
        &self.owner_id == session
    }
}

/// Raw schema-less document body stored in the `memos` collection.
///
/// Field names follow the external document schema (`groupName`, `userId`,
/// `createdAt`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Input for creating a memo document.
///
/// `created_at` is never supplied by the caller; the store assigns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemo {
    pub text: String,
    pub group_name: String,
    pub owner_id: SessionId,
    pub color: Option<String>,
}

impl NewMemo {
    /// Builds a creation request with normalized text and group name.
    pub fn new(
        text: &str,
        group_name: &str,
        owner_id: SessionId,
        color: Option<String>,
    ) -> Result<Self, MemoValidationError> {
        let text = normalize_text(text)?;
        let color = color.map(|value| normalize_color(&value)).transpose()?;
        Ok(Self {
            text,
            group_name: normalize_group_name(group_name),
            owner_id,
            color,
        })
    }
}

/// Full replacement of the user-editable memo fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoPatch {
    pub text: String,
    pub group_name: String,
    pub color: String,
}

impl MemoPatch {
    pub fn new(text: &str, group_name: &str, color: &str) -> Result<Self, MemoValidationError> {
        Ok(Self {
            text: normalize_text(text)?,
            group_name: normalize_group_name(group_name),
            color: normalize_color(color)?,
        })
    }
}

/// Write-boundary validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoValidationError {
    EmptyText,
    InvalidColor(String),
}

impl Display for MemoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "memo text must not be empty"),
            Self::InvalidColor(value) => {
                write!(f, "color must be a `#rrggbb` hex value, got `{value}`")
            }
        }
    }
}

impl std::error::Error for MemoValidationError {}

/// Trims memo text and rejects empty results.
pub fn normalize_text(text: &str) -> Result<String, MemoValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MemoValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Trims a group name. Empty means ungrouped.
pub fn normalize_group_name(group_name: &str) -> String {
    group_name.trim().to_string()
}

/// Validates a `#rrggbb` color and lowercases it.
pub fn normalize_color(color: &str) -> Result<String, MemoValidationError> {
    let trimmed = color.trim();
    if !HEX_COLOR_RE.is_match(trimmed) {
        return Err(MemoValidationError::InvalidColor(color.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}
