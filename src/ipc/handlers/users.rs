use crate::access::{Page, PermissionSet, Role};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, require_db, require_page, required_str, Reply};
use crate::ipc::types::{AppState, Request};
use crate::session::{SessionStore, SqliteSessionStore};
use crate::users::{self, NewUser, User, UserPatch};
use serde_json::{json, Value};

fn parse_role(req: &Request, raw: &str) -> Result<Role, Value> {
    Role::parse(raw).ok_or_else(|| err(&req.id, "bad_params", format!("unknown role: {raw}"), None))
}

fn non_empty(req: &Request, key: &str, v: &str) -> Result<String, Value> {
    let v = v.trim();
    if v.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{key} must not be empty"),
            None,
        ));
    }
    Ok(v.to_string())
}

fn not_found(req: &Request) -> Value {
    err(&req.id, "not_found", "user not found", None)
}

/// Keeps the cached session copy in step when the signed-in user's own row
/// changes. The row is already committed, so a failed store write only warns.
fn refresh_session(state: &mut AppState, updated: &User) {
    let is_self = state.session.user().map(|u| u.id == updated.id).unwrap_or(false);
    if !is_self {
        return;
    }
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = SqliteSessionStore::new(conn).save(updated) {
            tracing::warn!(user_id = %updated.id, error = %e, "persisted session left stale");
        }
    }
    state.session.sign_in(updated.clone());
}

fn parse_patch(req: &Request, patch: &Value, admin: bool) -> Result<UserPatch, Value> {
    if !patch.is_object() {
        return Err(err(&req.id, "bad_params", "missing params.patch", None));
    }
    let mut out = UserPatch::default();
    if let Some(v) = optional_str(req, patch, "fullName")? {
        out.full_name = Some(non_empty(req, "fullName", v)?);
    }
    if let Some(v) = optional_str(req, patch, "password")? {
        if v.is_empty() {
            return Err(err(&req.id, "bad_params", "password must not be empty", None));
        }
        out.password = Some(v.to_string());
    }
    if admin {
        if let Some(v) = optional_str(req, patch, "role")? {
            out.role = Some(parse_role(req, v)?);
        }
        if let Some(v) = optional_str(req, patch, "branch")? {
            out.branch = Some(v.trim().to_string());
        }
    }
    if out.is_empty() {
        return Err(err(&req.id, "bad_params", "patch has no editable fields", None));
    }
    Ok(out)
}

fn handle_users_list(state: &mut AppState, req: &Request) -> Reply {
    require_page(state, req, Page::Users)?;
    let conn = require_db(&state.db, req)?;
    match users::list_users(conn) {
        Ok(rows) => Ok(ok(&req.id, json!({ "users": rows }))),
        Err(e) => {
            tracing::error!(error = %e, "users.list failed");
            Err(err(&req.id, "db_query_failed", e.to_string(), None))
        }
    }
}

fn handle_users_get(state: &mut AppState, req: &Request) -> Reply {
    require_page(state, req, Page::Users)?;
    let conn = require_db(&state.db, req)?;
    let user_id = required_str(req, "userId")?;
    match users::get_user(conn, user_id) {
        Ok(Some(user)) => Ok(ok(&req.id, json!({ "user": user }))),
        Ok(None) => Err(not_found(req)),
        Err(e) => Err(err(&req.id, "db_query_failed", e.to_string(), None)),
    }
}

fn handle_users_create(state: &mut AppState, req: &Request) -> Reply {
    require_page(state, req, Page::Users)?;
    let conn = require_db(&state.db, req)?;

    let username = non_empty(req, "username", required_str(req, "username")?)?;
    let password = required_str(req, "password")?;
    if password.is_empty() {
        return Err(err(&req.id, "bad_params", "password must not be empty", None));
    }
    let role = parse_role(req, required_str(req, "role")?)?;
    let full_name = match optional_str(req, &req.params, "fullName")? {
        Some(v) => non_empty(req, "fullName", v)?,
        None => username.clone(),
    };
    let branch = optional_str(req, &req.params, "branch")?
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| state.config.default_branch.clone());
    let permissions = req.params.get("permissions").cloned();

    let new = NewUser {
        username,
        password: password.to_string(),
        full_name,
        role,
        branch,
        permissions,
    };
    match users::insert_user(conn, &new, state.config.pbkdf2_iterations) {
        Ok(user) => {
            tracing::info!(username = %user.username, role = %user.role, "user created");
            Ok(ok(&req.id, json!({ "userId": user.id, "user": user })))
        }
        Err(e) => Err(err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        )),
    }
}

fn handle_users_update(state: &mut AppState, req: &Request) -> Reply {
    require_page(state, req, Page::Users)?;
    let user_id = required_str(req, "userId")?;
    let patch = parse_patch(req, req.params.get("patch").unwrap_or(&Value::Null), true)?;

    let conn = require_db(&state.db, req)?;
    let updated = match users::update_user(conn, user_id, &patch, state.config.pbkdf2_iterations) {
        Ok(Some(u)) => u,
        Ok(None) => return Err(not_found(req)),
        Err(e) => {
            return Err(err(
                &req.id,
                "db_update_failed",
                e.to_string(),
                Some(json!({ "table": "users" })),
            ))
        }
    };
    refresh_session(state, &updated);
    Ok(ok(&req.id, json!({ "user": updated })))
}

fn handle_users_set_permissions(state: &mut AppState, req: &Request) -> Reply {
    require_page(state, req, Page::Users)?;
    let user_id = required_str(req, "userId")?;
    let Some(raw) = req.params.get("permissions").filter(|v| v.is_object()) else {
        return Err(err(&req.id, "bad_params", "missing params.permissions", None));
    };
    let permissions = PermissionSet::from_json(raw);

    let conn = require_db(&state.db, req)?;
    let updated = match users::set_permissions(conn, user_id, permissions) {
        Ok(Some(u)) => u,
        Ok(None) => return Err(not_found(req)),
        Err(e) => {
            return Err(err(
                &req.id,
                "db_update_failed",
                e.to_string(),
                Some(json!({ "table": "users" })),
            ))
        }
    };
    refresh_session(state, &updated);
    Ok(ok(&req.id, json!({ "user": updated })))
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> Reply {
    let me = require_page(state, req, Page::Users)?.id.clone();
    let user_id = required_str(req, "userId")?;
    if user_id == me {
        return Err(err(
            &req.id,
            "bad_params",
            "cannot delete the signed-in user",
            None,
        ));
    }

    let conn = require_db(&state.db, req)?;
    match users::delete_user(conn, user_id) {
        Ok(true) => {
            tracing::info!(user_id, "user deleted");
            Ok(ok(&req.id, json!({ "ok": true })))
        }
        Ok(false) => Err(not_found(req)),
        Err(e) => Err(err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        )),
    }
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> Reply {
    let me = require_page(state, req, Page::Profile)?.id.clone();
    let patch = parse_patch(req, req.params.get("patch").unwrap_or(&Value::Null), false)?;

    let conn = require_db(&state.db, req)?;
    let updated = match users::update_user(conn, &me, &patch, state.config.pbkdf2_iterations) {
        Ok(Some(u)) => u,
        Ok(None) => return Err(not_found(req)),
        Err(e) => {
            return Err(err(
                &req.id,
                "db_update_failed",
                e.to_string(),
                Some(json!({ "table": "users" })),
            ))
        }
    };
    refresh_session(state, &updated);
    Ok(ok(&req.id, json!({ "user": updated })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "users.list" => handle_users_list(state, req),
        "users.get" => handle_users_get(state, req),
        "users.create" => handle_users_create(state, req),
        "users.update" => handle_users_update(state, req),
        "users.setPermissions" => handle_users_set_permissions(state, req),
        "users.delete" => handle_users_delete(state, req),
        "profile.update" => handle_profile_update(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
