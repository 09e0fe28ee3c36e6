use serde::Serialize;

use super::page::{Page, PageRule};
use super::role::Role;
use crate::users::User;

/// Dashboard rendered on the home route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    Manager,
    General,
    Teacher,
}

pub fn dashboard_for(role: Role) -> Dashboard {
    match role {
        Role::Manager => Dashboard::Manager,
        Role::Supervisor => Dashboard::General,
        _ => Dashboard::Teacher,
    }
}

/// Decides whether `user` may open `page`.
///
/// Order matters: no session admits public pages only, a manager is admitted
/// everywhere, and everyone else goes through the page's rule. Teachers keep
/// the students page even when `page_students` is revoked.
pub fn allow(user: Option<&User>, page: Page) -> bool {
    let Some(user) = user else {
        return page.is_public();
    };

    if user.role == Role::Manager {
        return true;
    }

    if user.role == Role::Teacher && page == Page::Students {
        return true;
    }

    match page.rule() {
        PageRule::Public | PageRule::Authenticated => true,
        PageRule::Flag(key) => user.permissions.is_granted(key),
        PageRule::Roles(roles) => roles.contains(&user.role),
    }
}
