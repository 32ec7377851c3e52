//! Detail editor use-case.
//!
//! # Responsibility
//! - Load one memo for editing, enforcing existence and ownership.
//! - Save edits as an owner-scoped full replacement, or create a new memo.
//!
//! # Invariants
//! - A foreign or missing memo never exposes its content to the editor.
//! - Saving re-checks existence and ownership; nothing is written on failure.
//! - Saved text and group are trimmed; color is always a `#rrggbb` value.

use crate::error::{MemoError, MemoResult};
use crate::model::memo::{
    normalize_color, normalize_text, Memo, MemoId, MemoPatch, NewMemo, SessionId,
    MEMO_COLOR_PALETTE,
};
use crate::navigation::{DetailTarget, Route};
use crate::store::RemoteStore;
use log::{info, warn};
use std::sync::Arc;

/// Editable state of the detail screen.
pub struct DetailEditor<S: RemoteStore> {
    store: Arc<S>,
    session: SessionId,
    target: DetailTarget,
    text: String,
    group_name: String,
    color: String,
}

impl<S: RemoteStore> DetailEditor<S> {
    /// Opens the editor for `target`.
    ///
    /// # Errors
    /// - `NotFound` when the memo does not exist.
    /// - `Permission` when it belongs to another session.
    pub fn open(
        store: Arc<S>,
        session: SessionId,
        target: DetailTarget,
        default_color: &str,
    ) -> MemoResult<Self> {
        let mut editor = Self {
            store,
            session,
            target: target.clone(),
            text: String::new(),
            group_name: String::new(),
            color: default_color.to_string(),
        };

        if let DetailTarget::Existing(id) = &target {
            let memo = editor.load_owned(id)?;
            editor.text = memo.text;
            editor.group_name = memo.group_name;
            // Stored colors outside `#rrggbb` fall back to the default.
            if let Some(color) = memo.color.as_deref().and_then(|c| normalize_color(c).ok()) {
                editor.color = color;
            }
        }
        Ok(editor)
    }

    fn load_owned(&self, id: &MemoId) -> MemoResult<Memo> {
        let Some(memo) = self.store.get_memo(id)? else {
            warn!("event=detail_load module=service status=error reason=not_found doc_id={id}");
            return Err(MemoError::NotFound(id.clone()));
        };
        if !memo.is_owned_by(&self.session) {
            warn!("event=detail_load module=service status=error reason=permission doc_id={id}");
            return Err(MemoError::Permission(id.clone()));
        }
        Ok(memo)
    }

    pub fn target(&self) -> &DetailTarget {
        &self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Colors offered by the picker.
    pub fn palette(&self) -> &'static [&'static str] {
        MEMO_COLOR_PALETTE
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_group_name(&mut self, group_name: impl Into<String>) {
        self.group_name = group_name.into();
    }

    /// # Errors
    /// `Precondition(InvalidColor)` unless `color` is `#rrggbb`.
    pub fn set_color(&mut self, color: &str) -> MemoResult<()> {
        self.color = normalize_color(color)?;
        Ok(())
    }

    pub fn can_save(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Persists the editor state and returns the route to go back to.
    ///
    /// # Errors
    /// - `Precondition(EmptyText)` for blank text.
    /// - `NotFound`/`Permission` when the memo vanished or changed hands.
    pub fn save(&self) -> MemoResult<Route> {
        normalize_text(&self.text)?;

        match &self.target {
            DetailTarget::New => {
                let memo = NewMemo::new(
                    &self.text,
                    &self.group_name,
                    self.session.clone(),
                    Some(self.color.clone()),
                )?;
                let created = self.store.create_memo(&memo)?;
                info!(
                    "event=detail_save module=service status=ok mode=create doc_id={}",
                    created.id
                );
            }
            DetailTarget::Existing(id) => {
                self.load_owned(id)?;
                let patch = MemoPatch::new(&self.text, &self.group_name, &self.color)?;
                self.store.update_memo(id, &self.session, &patch)?;
                info!("event=detail_save module=service status=ok mode=update doc_id={id}");
            }
        }
        Ok(Route::List)
    }
}
