use serde::Serialize;

use super::page::{normalize_path, Page};
use super::policy::{allow, dashboard_for, Dashboard};
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Unauthenticated,
    Denied,
    Allowed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RouteDecision {
    Render {
        page: Page,
        path: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        dashboard: Option<Dashboard>,
    },
    Redirect {
        to: &'static str,
        replace: bool,
        state: GuardState,
    },
}

impl RouteDecision {
    fn redirect(to: Page, state: GuardState) -> Self {
        Self::Redirect {
            to: to.path(),
            replace: true,
            state,
        }
    }

    pub fn state(&self) -> GuardState {
        match self {
            Self::Render { .. } => GuardState::Allowed,
            Self::Redirect { state, .. } => *state,
        }
    }
}

/// Resolves a navigation to `path` against the current session.
pub fn resolve(session: &Session, path: &str) -> RouteDecision {
    let user = session.user();

    let Some(page) = Page::from_path(path) else {
        tracing::debug!(path = normalize_path(path), "unknown route");
        return match user {
            Some(_) => RouteDecision::redirect(Page::Home, GuardState::Denied),
            None => RouteDecision::redirect(Page::Login, GuardState::Unauthenticated),
        };
    };

    if page.is_public() {
        return RouteDecision::Render {
            page,
            path: page.path(),
            dashboard: None,
        };
    }

    let Some(user) = user else {
        tracing::debug!(page = page.id(), "no session, sending to login");
        return RouteDecision::redirect(Page::Login, GuardState::Unauthenticated);
    };

    if !allow(Some(user), page) {
        tracing::debug!(page = page.id(), role = %user.role, "route denied");
        return RouteDecision::redirect(Page::Home, GuardState::Denied);
    }

    let dashboard = (page == Page::Home).then(|| dashboard_for(user.role));
    RouteDecision::Render {
        page,
        path: page.path(),
        dashboard,
    }
}
