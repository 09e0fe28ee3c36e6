use serde::Serialize;

use super::page::Page;
use super::policy::allow;
use crate::session::Session;

/// Navigation entries in display order. Dashboard first, profile last.
pub const MENU_ORDER: [Page; 20] = [
    Page::Home,
    Page::MyEarnings,
    Page::StaffEarnings,
    Page::Schedule,
    Page::Students,
    Page::Classes,
    Page::ShariaPrograms,
    Page::Finance,
    Page::Renewal,
    Page::Attendance,
    Page::ClassEval,
    Page::EvaluationsList,
    Page::Teachers,
    Page::Sales,
    Page::Reports,
    Page::Achievements,
    Page::Settings,
    Page::Database,
    Page::Users,
    Page::Profile,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub page: Page,
    pub path: &'static str,
    pub label: &'static str,
}

impl From<Page> for MenuItem {
    fn from(page: Page) -> Self {
        Self {
            page,
            path: page.path(),
            label: page.label(),
        }
    }
}

pub fn build(session: &Session) -> Vec<MenuItem> {
    let user = session.user();
    MENU_ORDER
        .into_iter()
        .filter(|page| allow(user, *page))
        .map(MenuItem::from)
        .collect()
}
