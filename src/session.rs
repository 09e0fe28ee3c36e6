//! The signed-in user and where it is persisted between reloads.
//!
//! [`Session`] is a plain value owned by the request loop and handed by
//! reference to the route guard and menu builder. A [`SessionStore`] keeps the
//! serialized user under a single key; the presence of that key is what makes
//! a reopened workspace count as signed in.

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

use crate::users::User;

pub const CURRENT_USER_KEY: &str = "current_user";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Who is signed in. Authentication is derived from the user being present,
/// so the two cannot disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn sign_in(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) -> Option<User> {
        self.user.take()
    }
}

/// Persistence for the current user.
pub trait SessionStore {
    /// Returns the stored user, or `None` when signed out.
    fn load(&self) -> Result<Option<User>, SessionError>;

    fn save(&self, user: &User) -> Result<(), SessionError>;

    fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the current user in the workspace's `session_state` table.
pub struct SqliteSessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn load(&self) -> Result<Option<User>, SessionError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?",
                [CURRENT_USER_KEY],
                |r| r.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, user: &User) -> Result<(), SessionError> {
        let raw = serde_json::to_string(user)?;
        self.conn.execute(
            "INSERT INTO session_state(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (CURRENT_USER_KEY, raw),
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.conn.execute(
            "DELETE FROM session_state WHERE key = ?",
            [CURRENT_USER_KEY],
        )?;
        Ok(())
    }
}

pub fn login(
    session: &mut Session,
    store: &impl SessionStore,
    user: User,
) -> Result<(), SessionError> {
    store.save(&user)?;
    session.sign_in(user);
    Ok(())
}

pub fn logout(session: &mut Session, store: &impl SessionStore) -> Result<(), SessionError> {
    store.clear()?;
    session.sign_out();
    Ok(())
}

/// Rebuilds the session from the store. An unreadable entry is dropped and
/// the session starts signed out.
pub fn restore(store: &impl SessionStore) -> Result<Session, SessionError> {
    match store.load() {
        Ok(Some(user)) => Ok(Session { user: Some(user) }),
        Ok(None) => Ok(Session::default()),
        Err(SessionError::Serialization(e)) => {
            tracing::warn!(error = %e, "discarding unreadable stored session");
            store.clear()?;
            Ok(Session::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::policy::tests::user_with;
    use crate::access::Role;
    use crate::db;
    use serde_json::json;

    #[test]
    fn authenticated_tracks_user_presence() {
        let mut session = Session::default();
        assert!(!session.is_authenticated());
        session.sign_in(user_with(Role::Sales, json!({})));
        assert!(session.is_authenticated());
        assert!(session.sign_out().is_some());
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn login_survives_reopen_and_logout_clears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let user = user_with(Role::Supervisor, json!({ "page_reports": true }));

        {
            let conn = db::open_db(dir.path()).expect("open db");
            let store = SqliteSessionStore::new(&conn);
            let mut session = Session::default();
            login(&mut session, &store, user.clone()).expect("login");
        }

        let conn = db::open_db(dir.path()).expect("reopen db");
        let store = SqliteSessionStore::new(&conn);
        let mut session = restore(&store).expect("restore");
        assert!(session.is_authenticated());
        assert_eq!(session.user(), Some(&user));

        logout(&mut session, &store).expect("logout");
        assert!(!session.is_authenticated());
        assert!(store.load().expect("load").is_none());
        assert!(!restore(&store).expect("restore").is_authenticated());
    }

    #[test]
    fn corrupt_entry_restores_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        conn.execute(
            "INSERT INTO session_state(key, value) VALUES(?, '{broken')",
            [CURRENT_USER_KEY],
        )
        .expect("insert");
        let store = SqliteSessionStore::new(&conn);
        let session = restore(&store).expect("restore");
        assert!(!session.is_authenticated());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_overwrites_previous_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = db::open_db(dir.path()).expect("open db");
        let store = SqliteSessionStore::new(&conn);
        store.save(&user_with(Role::Sales, json!({}))).expect("save");
        let manager = user_with(Role::Manager, json!({}));
        store.save(&manager).expect("save");
        assert_eq!(store.load().expect("load"), Some(manager));
    }
}
