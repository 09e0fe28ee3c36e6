use crate::auth::{self, AuthError};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_db, required_str, session_json, Reply};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, SqliteSessionStore};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> Reply {
    let conn = require_db(&state.db, req)?;
    let username = required_str(req, "username")?.trim();
    let password = required_str(req, "password")?;

    let user = match auth::authenticate(conn, username, password) {
        Ok(u) => u,
        Err(AuthError::Storage(e)) => {
            tracing::error!(error = %e, "credential lookup failed");
            return Err(err(&req.id, "db_query_failed", e.to_string(), None));
        }
        Err(AuthError::MalformedHash) => {
            tracing::error!(username, "stored password hash is malformed");
            return Err(err(
                &req.id,
                "invalid_credentials",
                AuthError::InvalidCredentials.to_string(),
                None,
            ));
        }
        Err(e @ AuthError::InvalidCredentials) => {
            tracing::warn!(username, "failed login");
            return Err(err(&req.id, "invalid_credentials", e.to_string(), None));
        }
    };

    let store = SqliteSessionStore::new(conn);
    if let Err(e) = session::login(&mut state.session, &store, user) {
        return Err(err(&req.id, "session_write_failed", e.to_string(), None));
    }
    tracing::info!(username, "signed in");

    Ok(ok(&req.id, json!({ "user": state.session.user() })))
}

fn handle_logout(state: &mut AppState, req: &Request) -> Reply {
    let was = state.session.user().map(|u| u.username.clone());
    match state.db.as_ref() {
        Some(conn) => {
            let store = SqliteSessionStore::new(conn);
            if let Err(e) = session::logout(&mut state.session, &store) {
                return Err(err(&req.id, "session_write_failed", e.to_string(), None));
            }
        }
        None => {
            state.session.sign_out();
        }
    }
    if let Some(username) = was {
        tracing::info!(%username, "signed out");
    }
    Ok(ok(&req.id, json!({ "isAuthenticated": false })))
}

fn handle_session_get(state: &mut AppState, req: &Request) -> Reply {
    Ok(ok(&req.id, session_json(state)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "auth.login" => handle_login(state, req),
        "auth.logout" => handle_logout(state, req),
        "session.get" => handle_session_get(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
