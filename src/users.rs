//! Staff profiles: the `users` table and the `User` value cached in sessions.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{PermissionSet, Role};
use crate::config::Config;
use crate::password;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: PermissionSet,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub branch: String,
    /// Overrides applied on top of the role template.
    pub permissions: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub branch: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.role.is_none()
            && self.branch.is_none()
            && self.password.is_none()
    }
}

const USER_COLUMNS: &str =
    "id, username, full_name, role, permissions, branch, created_at, updated_at";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

const ROLE_COLUMN: usize = 3;

/// True when a row was rejected because its role is outside the known set.
pub fn is_unknown_role(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::FromSqlConversionFailure(ROLE_COLUMN, Type::Text, _))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(3)?;
    let role = Role::parse(&role_raw).ok_or_else(|| {
        let id = row.get::<_, String>(0).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(
            ROLE_COLUMN,
            Type::Text,
            format!("unknown role {role_raw:?} on user {id}").into(),
        )
    })?;
    // Unparseable permission blobs degrade to the key defaults.
    let perms_raw: String = row.get(4)?;
    let permissions = serde_json::from_str::<serde_json::Value>(&perms_raw)
        .map(|v| PermissionSet::from_json(&v))
        .unwrap_or_default();

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        role,
        permissions,
        branch: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn count_users(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
}

pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY full_name, username"
    ))?;
    let mut users = Vec::new();
    for row in stmt.query_map([], user_from_row)? {
        match row {
            Ok(user) => users.push(user),
            Err(e) if is_unknown_role(&e) => {
                tracing::warn!(error = %e, "skipping user row");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(users)
}

/// Rows with an unknown role read as absent.
pub fn get_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<User>> {
    match conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            [user_id],
            user_from_row,
        )
        .optional()
    {
        Err(e) if is_unknown_role(&e) => {
            tracing::warn!(error = %e, "ignoring user row");
            Ok(None)
        }
        other => other,
    }
}

/// Returns the profile and its stored password hash.
pub fn find_credentials(
    conn: &Connection,
    username: &str,
) -> rusqlite::Result<Option<(User, String)>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?"),
        [username],
        |row| Ok((user_from_row(row)?, row.get::<_, String>(8)?)),
    )
    .optional()
}

pub fn insert_user(conn: &Connection, new: &NewUser, iterations: u32) -> rusqlite::Result<User> {
    let mut permissions = new.role.template();
    if let Some(overrides) = new.permissions.as_ref() {
        permissions.merge_json(overrides);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: new.username.clone(),
        full_name: new.full_name.clone(),
        role: new.role,
        permissions,
        branch: new.branch.clone(),
        created_at: Some(now()),
        updated_at: None,
    };
    let hash = password::hash_password(&new.password, iterations);

    conn.execute(
        "INSERT INTO users(id, username, password_hash, full_name, role, permissions, branch, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &user.id,
            &user.username,
            &hash,
            &user.full_name,
            user.role.as_str(),
            user.permissions.to_json().to_string(),
            &user.branch,
            &user.created_at,
        ),
    )?;
    Ok(user)
}

pub fn update_user(
    conn: &Connection,
    user_id: &str,
    patch: &UserPatch,
    iterations: u32,
) -> rusqlite::Result<Option<User>> {
    let Some(mut user) = get_user(conn, user_id)? else {
        return Ok(None);
    };
    if let Some(v) = patch.full_name.as_ref() {
        user.full_name = v.clone();
    }
    if let Some(v) = patch.role {
        user.role = v;
    }
    if let Some(v) = patch.branch.as_ref() {
        user.branch = v.clone();
    }
    user.updated_at = Some(now());

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE users SET full_name = ?, role = ?, branch = ?, updated_at = ? WHERE id = ?",
        (
            &user.full_name,
            user.role.as_str(),
            &user.branch,
            &user.updated_at,
            &user.id,
        ),
    )?;
    if let Some(pw) = patch.password.as_ref() {
        tx.execute(
            "UPDATE users SET password_hash = ? WHERE id = ?",
            (password::hash_password(pw, iterations), &user.id),
        )?;
    }
    tx.commit()?;
    Ok(Some(user))
}

pub fn set_permissions(
    conn: &Connection,
    user_id: &str,
    permissions: PermissionSet,
) -> rusqlite::Result<Option<User>> {
    let Some(mut user) = get_user(conn, user_id)? else {
        return Ok(None);
    };
    user.permissions = permissions;
    user.updated_at = Some(now());
    conn.execute(
        "UPDATE users SET permissions = ?, updated_at = ? WHERE id = ?",
        (
            user.permissions.to_json().to_string(),
            &user.updated_at,
            &user.id,
        ),
    )?;
    Ok(Some(user))
}

pub fn delete_user(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
    let n = conn.execute("DELETE FROM users WHERE id = ?", [user_id])?;
    Ok(n > 0)
}

/// Inserts the configured manager account into an empty users table so a
/// fresh workspace can be signed into.
pub fn ensure_default_manager(conn: &Connection, cfg: &Config) -> rusqlite::Result<Option<User>> {
    if count_users(conn)? > 0 {
        return Ok(None);
    }
    let new = NewUser {
        username: cfg.default_manager_username.clone(),
        password: cfg.default_manager_password.clone(),
        full_name: cfg.default_manager_full_name.clone(),
        role: Role::Manager,
        branch: cfg.default_branch.clone(),
        permissions: None,
    };
    let user = insert_user(conn, &new, cfg.pbkdf2_iterations)?;
    tracing::info!(username = %user.username, "seeded default manager");
    if cfg.uses_default_manager_password() {
        tracing::warn!(
            username = %user.username,
            "default manager password is in use; set default_manager_password or change it after signing in"
        );
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::permission::PermissionKey;
    use crate::db;
    use serde_json::json;

    fn test_config() -> Config {
        Config {
            pbkdf2_iterations: 10,
            ..Config::default()
        }
    }

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.into(),
            password: "pw".into(),
            full_name: format!("{username} full"),
            role,
            branch: "north".into(),
            permissions: None,
        }
    }

    #[test]
    fn insert_applies_template_and_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");

        let mut new = new_user("t1", Role::Teacher);
        new.permissions = Some(json!({ "page_finance": true, "page_schedule": false }));
        let user = insert_user(&conn, &new, 10).expect("insert");
        assert!(user.permissions.is_granted(PermissionKey::PageStudents));
        assert!(user.permissions.is_granted(PermissionKey::PageFinance));
        assert!(!user.permissions.is_granted(PermissionKey::PageSchedule));

        let loaded = get_user(&conn, &user.id).expect("get").expect("present");
        assert_eq!(loaded, user);
    }

    #[test]
    fn duplicate_username_surfaces_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        insert_user(&conn, &new_user("dup", Role::Sales), 10).expect("first");
        let err = insert_user(&conn, &new_user("dup", Role::Sales), 10).expect_err("second");
        assert!(err.to_string().contains("UNIQUE"), "{err}");
    }

    #[test]
    fn credentials_are_hashed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        insert_user(&conn, &new_user("h1", Role::Sales), 10).expect("insert");
        let (_, hash) = find_credentials(&conn, "h1").expect("query").expect("present");
        assert_ne!(hash, "pw");
        assert!(password::verify_password("pw", &hash).expect("verify"));
    }

    #[test]
    fn update_patch_and_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let user = insert_user(&conn, &new_user("u1", Role::Teacher), 10).expect("insert");

        let patch = UserPatch {
            role: Some(Role::Supervisor),
            password: Some("next".into()),
            ..UserPatch::default()
        };
        let updated = update_user(&conn, &user.id, &patch, 10)
            .expect("update")
            .expect("present");
        assert_eq!(updated.role, Role::Supervisor);
        assert_eq!(updated.full_name, user.full_name);
        let (_, hash) = find_credentials(&conn, "u1").expect("query").expect("present");
        assert!(password::verify_password("next", &hash).expect("verify"));

        assert!(update_user(&conn, "missing", &patch, 10).expect("update").is_none());
    }

    #[test]
    fn permissions_replace_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let user = insert_user(&conn, &new_user("p1", Role::Sales), 10).expect("insert");

        let perms = PermissionSet::from_json(&json!({ "page_users": true }));
        let updated = set_permissions(&conn, &user.id, perms)
            .expect("set")
            .expect("present");
        assert!(updated.permissions.is_granted(PermissionKey::PageUsers));

        assert!(delete_user(&conn, &user.id).expect("delete"));
        assert!(!delete_user(&conn, &user.id).expect("delete again"));
        assert!(get_user(&conn, &user.id).expect("get").is_none());
    }

    #[test]
    fn unknown_role_row_does_not_break_reads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let kept = insert_user(&conn, &new_user("s1", Role::Sales), 10).expect("insert");
        conn.execute(
            "INSERT INTO users(id, username, password_hash, full_name, role)
             VALUES('legacy', 'root', 'x', 'Legacy Admin', 'admin')",
            [],
        )
        .expect("insert legacy");

        let listed = list_users(&conn).expect("list");
        assert_eq!(listed, vec![kept]);
        assert!(get_user(&conn, "legacy").expect("get").is_none());

        let patch = UserPatch {
            full_name: Some("Renamed".into()),
            ..UserPatch::default()
        };
        assert!(update_user(&conn, "legacy", &patch, 10).expect("update").is_none());
        assert!(delete_user(&conn, "legacy").expect("delete"));
    }

    #[test]
    fn malformed_permission_blob_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let user = insert_user(&conn, &new_user("m1", Role::Sales), 10).expect("insert");
        conn.execute(
            "UPDATE users SET permissions = 'not json' WHERE id = ?",
            [&user.id],
        )
        .expect("corrupt");
        let loaded = get_user(&conn, &user.id).expect("get").expect("present");
        assert_eq!(loaded.permissions, PermissionSet::default());
    }

    #[test]
    fn default_manager_seeded_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let cfg = test_config();
        let seeded = ensure_default_manager(&conn, &cfg).expect("seed").expect("inserted");
        assert_eq!(seeded.role, Role::Manager);
        assert_eq!(seeded.username, "admin");
        assert!(ensure_default_manager(&conn, &cfg).expect("seed").is_none());
        assert_eq!(count_users(&conn).expect("count"), 1);
    }
}
