//! Use-case error taxonomy and user-facing alert mapping.
//!
//! # Responsibility
//! - Classify every failure reaching a screen as not-found, permission,
//!   precondition or backend.
//! - Convert errors into a blocking dialog model for the UI shell.
//!
//! # Invariants
//! - No error is retried automatically; callers decide what to show.
//! - Alert messages never include memo text.

use crate::identity::IdentityError;
use crate::model::memo::{MemoId, MemoValidationError};
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MemoResult<T> = Result<T, MemoError>;

/// Input or session state that makes an operation impossible to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// No session identity is available yet.
    NoSession,
    /// Trimmed memo text is empty.
    EmptyText,
    InvalidColor(String),
}

impl Display for PreconditionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "no session identity is available"),
            Self::EmptyText => write!(f, "memo text must not be empty"),
            Self::InvalidColor(value) => write!(f, "invalid memo color: `{value}`"),
        }
    }
}

impl From<MemoValidationError> for PreconditionError {
    fn from(value: MemoValidationError) -> Self {
        match value {
            MemoValidationError::EmptyText => Self::EmptyText,
            MemoValidationError::InvalidColor(color) => Self::InvalidColor(color),
        }
    }
}

/// Error surfaced by memo use-cases.
#[derive(Debug)]
pub enum MemoError {
    /// Document missing on direct fetch.
    NotFound(MemoId),
    /// Document belongs to another session.
    Permission(MemoId),
    Precondition(PreconditionError),
    /// Any store/identity failure.
    Backend(Box<dyn Error + Send + Sync + 'static>),
}

impl MemoError {
    /// Stable machine-readable code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Permission(_) => "permission_denied",
            Self::Precondition(_) => "precondition_failed",
            Self::Backend(_) => "backend_error",
        }
    }

    pub(crate) fn backend(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Backend(message.into())
    }

    /// Dialog model shown for this error.
    pub fn alert(&self) -> UserAlert {
        match self {
            Self::NotFound(_) => UserAlert::back("Error", "The memo could not be found."),
            Self::Permission(_) => {
                UserAlert::back("Error", "You do not have permission to view this memo.")
            }
            Self::Precondition(PreconditionError::NoSession) => {
                UserAlert::stay("Error", "Still signing in. Please try again in a moment.")
            }
            Self::Precondition(PreconditionError::EmptyText) => {
                UserAlert::stay("Error", "Please enter some text before saving.")
            }
            Self::Precondition(PreconditionError::InvalidColor(_)) => {
                UserAlert::stay("Error", "Please choose one of the available colors.")
            }
            Self::Backend(_) => UserAlert::stay("Error", "Something went wrong. Please try again."),
        }
    }

    /// Dialog model for a failed screen load.
    ///
    /// The screen has nothing to show, so backend failures navigate back too.
    pub fn load_alert(&self) -> UserAlert {
        match self {
            Self::Backend(_) => UserAlert::back("Error", "Failed to load the memo."),
            _ => self.alert(),
        }
    }
}

impl Display for MemoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "memo not found: {id}"),
            Self::Permission(id) => write!(f, "permission denied for memo: {id}"),
            Self::Precondition(err) => write!(f, "precondition failed: {err}"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl Error for MemoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<PreconditionError> for MemoError {
    fn from(value: PreconditionError) -> Self {
        Self::Precondition(value)
    }
}

impl From<MemoValidationError> for MemoError {
    fn from(value: MemoValidationError) -> Self {
        Self::Precondition(value.into())
    }
}

impl From<StoreError> for MemoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::PermissionDenied(id) => Self::Permission(id),
            other => Self::Backend(Box::new(other)),
        }
    }
}

impl From<IdentityError> for MemoError {
    fn from(value: IdentityError) -> Self {
        Self::Backend(Box::new(value))
    }
}

/// Blocking dialog with a single acknowledgement action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAlert {
    pub title: String,
    pub message: String,
    /// Whether acknowledging should navigate back.
    pub navigate_back: bool,
}

impl UserAlert {
    fn back(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            navigate_back: true,
        }
    }

    fn stay(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            navigate_back: false,
        }
    }
}
