//! Group bucketing for the memo list.
//!
//! Two display models exist: aggregated cards (one card per trimmed group
//! name, texts concatenated) and per-memo cards (group shown as a label).
//! The model is chosen by [`GroupDisplayMode`].

use crate::model::memo::{Memo, MemoId, DEFAULT_MEMO_COLOR};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Key of the bucket holding ungrouped memos.
pub const UNGROUPED_KEY: &str = "__none__";

/// Separator between memo texts in an aggregated preview.
pub const PREVIEW_SEPARATOR: &str = "\n\n";

/// List display model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupDisplayMode {
    /// One card per group name.
    Aggregated,
    /// One card per memo.
    #[default]
    PerMemo,
}

/// Aggregated card for every memo sharing one trimmed group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCard {
    /// Selection key: the trimmed group name, or [`UNGROUPED_KEY`].
    pub key: String,
    /// Trimmed group name; empty for the ungrouped bucket.
    pub group_name: String,
    /// First color seen in snapshot order.
    pub color: Option<String>,
    pub texts: Vec<String>,
    /// Constituent memo ids in snapshot order (newest first).
    pub ids: Vec<MemoId>,
}

impl GroupCard {
    /// Texts joined by blank lines.
    pub fn preview(&self) -> String {
        self.texts.join(PREVIEW_SEPARATOR)
    }
}

/// Card for exactly one memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoCard {
    pub id: MemoId,
    pub text: String,
    /// Label chip; empty when ungrouped.
    pub group_name: String,
    pub color: Option<String>,
}

/// One row of the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    Group(GroupCard),
    Memo(MemoCard),
}

impl ListItem {
    /// Selection key, unique within one projection.
    pub fn key(&self) -> &str {
        match self {
            Self::Group(card) => card.key.as_str(),
            Self::Memo(card) => card.id.as_str(),
        }
    }

    /// Memo ids a delete of this row must remove.
    pub fn ids(&self) -> Vec<MemoId> {
        match self {
            Self::Group(card) => card.ids.clone(),
            Self::Memo(card) => vec![card.id.clone()],
        }
    }

    /// Memo opened when the row is tapped: the newest one it holds.
    pub fn primary_id(&self) -> Option<&MemoId> {
        match self {
            Self::Group(card) => card.ids.first(),
            Self::Memo(card) => Some(&card.id),
        }
    }

    pub fn group_name(&self) -> &str {
        match self {
            Self::Group(card) => card.group_name.as_str(),
            Self::Memo(card) => card.group_name.as_str(),
        }
    }

    pub fn preview(&self) -> String {
        match self {
            Self::Group(card) => card.preview(),
            Self::Memo(card) => card.text.clone(),
        }
    }

    pub fn display_color(&self) -> &str {
        let color = match self {
            Self::Group(card) => card.color.as_deref(),
            Self::Memo(card) => card.color.as_deref(),
        };
        color.unwrap_or(DEFAULT_MEMO_COLOR)
    }
}

/// Projects a snapshot into list rows for `mode`.
pub fn project_list(memos: &[Memo], mode: GroupDisplayMode) -> Vec<ListItem> {
    match mode {
        GroupDisplayMode::Aggregated => group_memos(memos)
            .into_iter()
            .map(ListItem::Group)
            .collect(),
        GroupDisplayMode::PerMemo => memos
            .iter()
            .map(|memo| {
                ListItem::Memo(MemoCard {
                    id: memo.id.clone(),
                    text: memo.text.clone(),
                    group_name: memo.group_key().to_string(),
                    color: memo.color.clone(),
                })
            })
            .collect(),
    }
}

/// Buckets memos by trimmed group name, keeping first-seen bucket order.
///
/// A memo id seen twice is only counted once.
pub fn group_memos(memos: &[Memo]) -> Vec<GroupCard> {
    let mut cards: Vec<GroupCard> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut seen_ids: HashSet<&MemoId> = HashSet::new();

    for memo in memos {
        if !seen_ids.insert(&memo.id) {
            continue;
        }

        let key = group_key_for(memo.group_key());
        let index = *index_by_key.entry(key.clone()).or_insert_with(|| {
            cards.push(GroupCard {
                key,
                group_name: memo.group_key().to_string(),
                color: None,
                texts: Vec::new(),
                ids: Vec::new(),
            });
            cards.len() - 1
        });

        let card = &mut cards[index];
        card.texts.push(memo.text.clone());
        card.ids.push(memo.id.clone());
        if card.color.is_none() {
            card.color = memo.color.clone();
        }
    }

    cards
}

/// Distinct trimmed non-empty group names in first-seen order.
pub fn distinct_group_names(memos: &[Memo]) -> Vec<String> {
    let mut seen = HashSet::new();
    memos
        .iter()
        .map(Memo::group_key)
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Group name to the color of the first memo having that name and a color.
pub fn first_group_colors(memos: &[Memo]) -> HashMap<String, String> {
    let mut colors = HashMap::new();
    for memo in memos {
        let name = memo.group_key();
        if name.is_empty() {
            continue;
        }
        if let Some(color) = memo.color.as_ref() {
            colors
                .entry(name.to_string())
                .or_insert_with(|| color.clone());
        }
    }
    colors
}

fn group_key_for(trimmed_group_name: &str) -> String {
    if trimmed_group_name.is_empty() {
        UNGROUPED_KEY.to_string()
    } else {
        trimmed_group_name.to_string()
    }
}
