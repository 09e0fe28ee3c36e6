use rusqlite::Connection;
use thiserror::Error;

use crate::password;
use crate::users::{self, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("stored password hash is malformed")]
    MalformedHash,

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

/// Checks a username/password pair against the users table.
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User, AuthError> {
    let found = match users::find_credentials(conn, username) {
        Ok(found) => found,
        Err(e) if users::is_unknown_role(&e) => {
            tracing::warn!(username, error = %e, "login refused");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let Some((user, hash)) = found else {
        return Err(AuthError::InvalidCredentials);
    };
    if password::verify_password(password, &hash)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::db;
    use crate::users::NewUser;

    #[test]
    fn right_and_wrong_passwords() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let new = NewUser {
            username: "mona".into(),
            password: "open sesame".into(),
            full_name: "Mona".into(),
            role: Role::Teacher,
            branch: "main".into(),
            permissions: None,
        };
        let created = users::insert_user(&conn, &new, 10).expect("insert");

        let user = authenticate(&conn, "mona", "open sesame").expect("login");
        assert_eq!(user, created);

        assert!(matches!(
            authenticate(&conn, "mona", "open"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&conn, "nobody", "open sesame"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn plaintext_rows_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        conn.execute(
            "INSERT INTO users(id, username, password_hash, full_name, role)
             VALUES('legacy', 'old', 'hunter2', 'Old Row', 'sales')",
            [],
        )
        .expect("insert");
        assert!(matches!(
            authenticate(&conn, "old", "hunter2"),
            Err(AuthError::MalformedHash)
        ));
    }

    #[test]
    fn unknown_role_row_is_a_failed_login() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let hash = crate::password::hash_password("pw", 10);
        conn.execute(
            "INSERT INTO users(id, username, password_hash, full_name, role)
             VALUES('legacy', 'root', ?, 'Legacy Admin', 'admin')",
            [&hash],
        )
        .expect("insert");
        assert!(matches!(
            authenticate(&conn, "root", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
