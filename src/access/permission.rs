use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Page flags a user can be granted individually.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionKey {
    PageStudents,
    PageTeachers,
    PageClasses,
    PageFinance,
    PageReports,
    PageAchievements,
    PageSettings,
    PageDatabase,
    PageUsers,
    PageSchedule,
}

impl PermissionKey {
    pub const COUNT: usize = 10;

    pub const ALL: [PermissionKey; Self::COUNT] = [
        PermissionKey::PageStudents,
        PermissionKey::PageTeachers,
        PermissionKey::PageClasses,
        PermissionKey::PageFinance,
        PermissionKey::PageReports,
        PermissionKey::PageAchievements,
        PermissionKey::PageSettings,
        PermissionKey::PageDatabase,
        PermissionKey::PageUsers,
        PermissionKey::PageSchedule,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageStudents => "page_students",
            Self::PageTeachers => "page_teachers",
            Self::PageClasses => "page_classes",
            Self::PageFinance => "page_finance",
            Self::PageReports => "page_reports",
            Self::PageAchievements => "page_achievements",
            Self::PageSettings => "page_settings",
            Self::PageDatabase => "page_database",
            Self::PageUsers => "page_users",
            Self::PageSchedule => "page_schedule",
        }
    }

    /// Value a key takes when nobody has set it. Only the schedule is open by
    /// default; it has to be revoked explicitly.
    pub fn default_grant(self) -> bool {
        matches!(self, Self::PageSchedule)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Total mapping from every [`PermissionKey`] to a grant.
///
/// There is no "absent" state: whatever is missing or malformed in the input
/// resolves to [`PermissionKey::default_grant`] when the set is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionSet {
    grants: [bool; PermissionKey::COUNT],
}

impl Default for PermissionSet {
    fn default() -> Self {
        let mut grants = [false; PermissionKey::COUNT];
        for key in PermissionKey::ALL {
            grants[key.index()] = key.default_grant();
        }
        Self { grants }
    }
}

impl PermissionSet {
    pub fn is_granted(&self, key: PermissionKey) -> bool {
        self.grants[key.index()]
    }

    pub fn set(&mut self, key: PermissionKey, value: bool) {
        self.grants[key.index()] = value;
    }

    /// Builds a set from loosely-typed JSON. Only JSON booleans count; any
    /// other value, unknown key, or a non-object input falls back to defaults.
    pub fn from_json(value: &Value) -> Self {
        let mut set = Self::default();
        set.merge_json(value);
        set
    }

    /// Overlays the boolean entries of `value` onto this set.
    pub fn merge_json(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else {
            return;
        };
        for (name, v) in obj {
            let (Some(key), Some(flag)) = (PermissionKey::parse(name), v.as_bool()) else {
                continue;
            };
            self.set(key, flag);
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for key in PermissionKey::ALL {
            obj.insert(key.as_str().to_string(), Value::Bool(self.is_granted(key)));
        }
        Value::Object(obj)
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}
