use serde::{Deserialize, Serialize};

use super::permission::{PermissionKey, PermissionSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Supervisor,
    Teacher,
    Sales,
    GeneralSupervisor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Manager,
        Role::Supervisor,
        Role::Teacher,
        Role::Sales,
        Role::GeneralSupervisor,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Supervisor => "supervisor",
            Self::Teacher => "teacher",
            Self::Sales => "sales",
            Self::GeneralSupervisor => "general_supervisor",
        }
    }

    /// Permission bundle a freshly created user of this role starts with.
    pub fn template(self) -> PermissionSet {
        let granted: &[PermissionKey] = match self {
            Self::Manager => &PermissionKey::ALL,
            Self::Supervisor => &[
                PermissionKey::PageStudents,
                PermissionKey::PageClasses,
                PermissionKey::PageTeachers,
                PermissionKey::PageReports,
                PermissionKey::PageAchievements,
            ],
            Self::Teacher => &[PermissionKey::PageStudents],
            Self::Sales | Self::GeneralSupervisor => &[],
        };

        let mut set = PermissionSet::default();
        for key in granted {
            set.set(*key, true);
        }
        set
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
