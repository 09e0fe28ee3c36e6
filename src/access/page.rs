use serde::Serialize;

use super::permission::PermissionKey;
use super::role::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    Login,
    Landing,
    About,
    Features,
    Profile,
    Students,
    Teachers,
    Classes,
    Finance,
    Reports,
    Achievements,
    Settings,
    Database,
    Users,
    Schedule,
    Renewal,
    Attendance,
    ClassEval,
    EvaluationsList,
    Sales,
    ShariaPrograms,
    MyEarnings,
    StaffEarnings,
    ManagerDashboard,
    TeacherDashboard,
}

/// How access to a page is decided for a non-manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageRule {
    /// Reachable without a session.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Granted by a permission flag.
    Flag(PermissionKey),
    /// Granted to the listed roles, whatever the flags say.
    Roles(&'static [Role]),
}

const MANAGER_OR_SUPERVISOR: &[Role] = &[Role::Manager, Role::Supervisor];
const MANAGER_ONLY: &[Role] = &[Role::Manager];
const SUPERVISOR_ONLY: &[Role] = &[Role::Supervisor];
const TEACHER_ONLY: &[Role] = &[Role::Teacher];

impl Page {
    pub const ALL: [Page; 26] = [
        Page::Home,
        Page::Login,
        Page::Landing,
        Page::About,
        Page::Features,
        Page::Profile,
        Page::Students,
        Page::Teachers,
        Page::Classes,
        Page::Finance,
        Page::Reports,
        Page::Achievements,
        Page::Settings,
        Page::Database,
        Page::Users,
        Page::Schedule,
        Page::Renewal,
        Page::Attendance,
        Page::ClassEval,
        Page::EvaluationsList,
        Page::Sales,
        Page::ShariaPrograms,
        Page::MyEarnings,
        Page::StaffEarnings,
        Page::ManagerDashboard,
        Page::TeacherDashboard,
    ];

    /// The one table both the route guard and the menu builder consult.
    pub fn rule(self) -> PageRule {
        match self {
            Self::Login | Self::Landing | Self::About | Self::Features => PageRule::Public,
            Self::Home | Self::Profile => PageRule::Authenticated,
            Self::Students => PageRule::Flag(PermissionKey::PageStudents),
            Self::Teachers => PageRule::Flag(PermissionKey::PageTeachers),
            Self::Classes => PageRule::Flag(PermissionKey::PageClasses),
            Self::Finance => PageRule::Flag(PermissionKey::PageFinance),
            Self::Reports => PageRule::Flag(PermissionKey::PageReports),
            Self::Achievements => PageRule::Flag(PermissionKey::PageAchievements),
            Self::Settings => PageRule::Flag(PermissionKey::PageSettings),
            Self::Database => PageRule::Flag(PermissionKey::PageDatabase),
            Self::Users => PageRule::Flag(PermissionKey::PageUsers),
            Self::Schedule => PageRule::Flag(PermissionKey::PageSchedule),
            Self::Renewal | Self::Attendance | Self::ClassEval => {
                PageRule::Roles(MANAGER_OR_SUPERVISOR)
            }
            Self::EvaluationsList
            | Self::Sales
            | Self::StaffEarnings
            | Self::ManagerDashboard => PageRule::Roles(MANAGER_ONLY),
            Self::ShariaPrograms => PageRule::Roles(SUPERVISOR_ONLY),
            Self::MyEarnings | Self::TeacherDashboard => PageRule::Roles(TEACHER_ONLY),
        }
    }

    pub fn is_public(self) -> bool {
        matches!(self.rule(), PageRule::Public)
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::Landing => "landing",
            Self::About => "about",
            Self::Features => "features",
            Self::Profile => "profile",
            Self::Students => "students",
            Self::Teachers => "teachers",
            Self::Classes => "classes",
            Self::Finance => "finance",
            Self::Reports => "reports",
            Self::Achievements => "achievements",
            Self::Settings => "settings",
            Self::Database => "database",
            Self::Users => "users",
            Self::Schedule => "schedule",
            Self::Renewal => "renewal",
            Self::Attendance => "attendance",
            Self::ClassEval => "class_eval",
            Self::EvaluationsList => "evaluations_list",
            Self::Sales => "sales",
            Self::ShariaPrograms => "sharia_programs",
            Self::MyEarnings => "my_earnings",
            Self::StaffEarnings => "staff_earnings",
            Self::ManagerDashboard => "manager_dashboard",
            Self::TeacherDashboard => "teacher_dashboard",
        }
    }

    pub fn parse_id(s: &str) -> Option<Self> {
        // `eval_list` is the older name the UI still sends in places.
        if s == "eval_list" {
            return Some(Self::EvaluationsList);
        }
        Self::ALL.into_iter().find(|p| p.id() == s)
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Landing => "/landing",
            Self::About => "/about",
            Self::Features => "/features",
            Self::Profile => "/profile",
            Self::Students => "/students",
            Self::Teachers => "/teachers",
            Self::Classes => "/classes",
            Self::Finance => "/finance",
            Self::Reports => "/reports",
            Self::Achievements => "/achievements",
            Self::Settings => "/settings",
            Self::Database => "/database",
            Self::Users => "/users",
            Self::Schedule => "/schedule",
            Self::Renewal => "/renewal-followup",
            Self::Attendance => "/teacher-attendance",
            Self::ClassEval => "/class-evaluation",
            Self::EvaluationsList => "/evaluations-list",
            Self::Sales => "/sales-employees",
            Self::ShariaPrograms => "/sharia-programs",
            Self::MyEarnings => "/my-earnings",
            Self::StaffEarnings => "/staff-earnings",
            Self::ManagerDashboard => "/manager-dashboard",
            Self::TeacherDashboard => "/teacher-dashboard",
        }
    }

    /// Looks up a page by URL path. Query string, fragment and a trailing
    /// slash are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = normalize_path(path);
        Self::ALL.into_iter().find(|p| p.path() == path)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Dashboard",
            Self::Login => "Login",
            Self::Landing => "Welcome",
            Self::About => "About",
            Self::Features => "Features",
            Self::Profile => "My Profile",
            Self::Students => "Students",
            Self::Teachers => "Teachers",
            Self::Classes => "Classes",
            Self::Finance => "Finance",
            Self::Reports => "Reports",
            Self::Achievements => "Achievements",
            Self::Settings => "Settings",
            Self::Database => "Database",
            Self::Users => "Users",
            Self::Schedule => "Schedule",
            Self::Renewal => "Renewal Follow-up",
            Self::Attendance => "Teacher Attendance",
            Self::ClassEval => "Class Evaluation",
            Self::EvaluationsList => "Evaluations",
            Self::Sales => "Sales Team",
            Self::ShariaPrograms => "Sharia Programs",
            Self::MyEarnings => "My Earnings",
            Self::StaffEarnings => "Staff Earnings",
            Self::ManagerDashboard => "Manager Dashboard",
            Self::TeacherDashboard => "Teacher Dashboard",
        }
    }
}

impl Serialize for Page {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_and_paths_are_unique() {
        let ids: HashSet<_> = Page::ALL.iter().map(|p| p.id()).collect();
        let paths: HashSet<_> = Page::ALL.iter().map(|p| p.path()).collect();
        assert_eq!(ids.len(), Page::ALL.len());
        assert_eq!(paths.len(), Page::ALL.len());
    }

    #[test]
    fn every_page_round_trips_through_id_and_path() {
        for page in Page::ALL {
            assert_eq!(Page::parse_id(page.id()), Some(page));
            assert_eq!(Page::from_path(page.path()), Some(page));
        }
    }

    #[test]
    fn eval_list_is_an_alias() {
        assert_eq!(Page::parse_id("eval_list"), Some(Page::EvaluationsList));
        assert_eq!(Page::EvaluationsList.id(), "evaluations_list");
    }

    #[test]
    fn paths_are_normalized() {
        assert_eq!(Page::from_path("/students/"), Some(Page::Students));
        assert_eq!(Page::from_path("/students?tab=active"), Some(Page::Students));
        assert_eq!(Page::from_path("/finance#top"), Some(Page::Finance));
        assert_eq!(Page::from_path(""), Some(Page::Home));
        assert_eq!(Page::from_path("//"), Some(Page::Home));
        assert_eq!(Page::from_path("/payroll"), None);
        assert_eq!(Page::from_path("/Students"), None);
    }

    #[test]
    fn public_pages_are_the_four_outer_pages() {
        let public: Vec<_> = Page::ALL.into_iter().filter(|p| p.is_public()).collect();
        assert_eq!(
            public,
            vec![Page::Login, Page::Landing, Page::About, Page::Features]
        );
    }
}
