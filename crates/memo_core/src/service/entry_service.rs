//! Entry (compose) screen use-case.
//!
//! # Responsibility
//! - Hold the text draft and the group picker state.
//! - Resolve the picker into a group name plus append decision.
//! - Submit through [`MemoRepository::save`] and report where to go next.
//!
//! # Invariants
//! - A typed new group name always wins over a selected existing one.
//! - The draft is only cleared after a save actually wrote something.

use crate::error::MemoResult;
use crate::model::memo::normalize_group_name;
use crate::navigation::Route;
use crate::repo::memo_repo::{GroupOption, MemoRepository, SaveOutcome};
use crate::store::RemoteStore;
use log::debug;
use std::sync::Arc;

/// Resolved group picker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChoice {
    /// A name typed into the "new group" field.
    NewGroup(String),
    /// A name picked from the existing groups.
    Existing(String),
    Ungrouped,
}

impl GroupChoice {
    /// Typed new name first, then the selected existing name, else ungrouped.
    pub fn resolve(new_group_name: &str, selected: Option<&str>) -> Self {
        let typed = normalize_group_name(new_group_name);
        if !typed.is_empty() {
            return Self::NewGroup(typed);
        }
        match selected.map(normalize_group_name) {
            Some(name) if !name.is_empty() => Self::Existing(name),
            _ => Self::Ungrouped,
        }
    }

    pub fn group_name(&self) -> &str {
        match self {
            Self::NewGroup(name) | Self::Existing(name) => name.as_str(),
            Self::Ungrouped => "",
        }
    }

    /// Only picking an existing group appends to it.
    pub fn appends_to_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }
}

/// Result of [`EntryComposer::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: SaveOutcome,
    /// `Some(Route::List)` once something was written.
    pub navigate_to: Option<Route>,
}

/// Draft state of the entry screen.
pub struct EntryComposer<S: RemoteStore> {
    repository: Arc<MemoRepository<S>>,
    text: String,
    new_group_name: String,
    selected_group: Option<String>,
}

impl<S: RemoteStore> EntryComposer<S> {
    pub fn new(repository: Arc<MemoRepository<S>>) -> Self {
        Self {
            repository,
            text: String::new(),
            new_group_name: String::new(),
            selected_group: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_new_group_name(&mut self, name: impl Into<String>) {
        self.new_group_name = name.into();
    }

    /// Selects an existing group, or clears the selection with `None`.
    pub fn select_group(&mut self, name: Option<String>) {
        self.selected_group = name;
    }

    pub fn group_choice(&self) -> GroupChoice {
        GroupChoice::resolve(&self.new_group_name, self.selected_group.as_deref())
    }

    /// Groups offered by the picker.
    pub fn group_options(&self) -> Vec<GroupOption> {
        self.repository.group_options()
    }

    /// True while signing in, while a save runs, or with blank text.
    pub fn is_save_disabled(&self) -> bool {
        self.repository.owner().is_none()
            || self.repository.is_saving()
            || self.text.trim().is_empty()
    }

    /// Saves the draft.
    ///
    /// # Errors
    /// Propagates [`MemoRepository::save`] errors; the draft is kept.
    pub fn submit(&mut self) -> MemoResult<Submission> {
        let choice = self.group_choice();
        let outcome = self.repository.save(
            &self.text,
            choice.group_name(),
            choice.appends_to_existing(),
        )?;

        if outcome == SaveOutcome::Skipped {
            debug!("event=entry_submit module=service status=skipped");
            return Ok(Submission {
                outcome,
                navigate_to: None,
            });
        }

        self.clear();
        Ok(Submission {
            outcome,
            navigate_to: Some(Route::List),
        })
    }

    fn clear(&mut self) {
        self.text.clear();
        self.new_group_name.clear();
        self.selected_group = None;
    }
}
