//! Routes exposed to the UI shell.
//!
//! Three one-way targets: the entry (compose) screen `/`, the list `/list`
//! and the detail editor `/detail/<id>`, where `<id>` may be `new`.

use crate::model::memo::MemoId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Detail id meaning "create a new memo".
pub const NEW_MEMO_SENTINEL: &str = "new";

/// What the detail editor opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailTarget {
    New,
    Existing(MemoId),
}

impl DetailTarget {
    /// Parses a detail route id; `new` maps to [`DetailTarget::New`].
    pub fn from_route_id(id: &str) -> Result<Self, RouteError> {
        let trimmed = id.trim();
        match trimmed {
            "" => Err(RouteError::MissingId),
            NEW_MEMO_SENTINEL => Ok(Self::New),
            other => Ok(Self::Existing(MemoId::from(other))),
        }
    }

    pub fn route_id(&self) -> &str {
        match self {
            Self::New => NEW_MEMO_SENTINEL,
            Self::Existing(id) => id.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Entry,
    List,
    Detail(DetailTarget),
}

impl Route {
    pub fn detail(id: MemoId) -> Self {
        Self::Detail(DetailTarget::Existing(id))
    }

    pub fn path(&self) -> String {
        match self {
            Self::Entry => "/".to_string(),
            Self::List => "/list".to_string(),
            Self::Detail(target) => format!("/detail/{}", target.route_id()),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim().trim_end_matches('/');
        if trimmed.contains('?') {
            return Err(RouteError::Unknown(path.to_string()));
        }
        match trimmed {
            "" => Ok(Self::Entry),
            "/list" => Ok(Self::List),
            other => match other.strip_prefix("/detail/") {
                Some(id) if !id.contains('/') => {
                    DetailTarget::from_route_id(id).map(Self::Detail)
                }
                _ => Err(RouteError::Unknown(path.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    MissingId,
    Unknown(String),
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "detail route requires an id"),
            Self::Unknown(path) => write!(f, "unknown route: `{path}`"),
        }
    }
}

impl Error for RouteError {}

#[cfg(test)]
mod tests {
    use super::{DetailTarget, Route, RouteError};
    use crate::model::memo::MemoId;

    #[test]
    fn parses_every_route() {
        assert_eq!("/".parse::<Route>().unwrap(), Route::Entry);
        assert_eq!("/list".parse::<Route>().unwrap(), Route::List);
        assert_eq!(
            "/detail/new".parse::<Route>().unwrap(),
            Route::Detail(DetailTarget::New)
        );
        assert_eq!(
            "/detail/abc".parse::<Route>().unwrap(),
            Route::detail(MemoId::from("abc"))
        );
    }

    #[test]
    fn rejects_query_strings_and_unknown_paths() {
        assert!(matches!(
            "/list?x=1".parse::<Route>(),
            Err(RouteError::Unknown(_))
        ));
        assert!(matches!(
            "/detail/a/b".parse::<Route>(),
            Err(RouteError::Unknown(_))
        ));
        assert!(matches!(
            "/settings".parse::<Route>(),
            Err(RouteError::Unknown(_))
        ));
    }

    #[test]
    fn path_renders_back_to_parseable_form() {
        let route = Route::detail(MemoId::from("m1"));
        assert_eq!(route.path(), "/detail/m1");
        assert_eq!(route.path().parse::<Route>().unwrap(), route);
    }
}
