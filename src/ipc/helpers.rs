use rusqlite::Connection;
use serde_json::{json, Value};

use crate::access::{allow, Page};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::users::User;

/// Handler outcome; the error side is already a complete error response.
pub type Reply = Result<Value, Value>;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{key}"), None))
}

pub fn optional_str<'a>(req: &'a Request, obj: &'a Value, key: &str) -> Result<Option<&'a str>, Value> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{key} must be a string"),
            None,
        )),
    }
}

pub fn require_db<'a>(db: &'a Option<Connection>, req: &Request) -> Result<&'a Connection, Value> {
    db.as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Applies the same predicate as the route guard to an IPC call.
pub fn require_page<'a>(state: &'a AppState, req: &Request, page: Page) -> Result<&'a User, Value> {
    let Some(user) = state.session.user() else {
        return Err(err(
            &req.id,
            "unauthenticated",
            "sign in first",
            Some(json!({ "redirect": Page::Login.path() })),
        ));
    };
    if !allow(Some(user), page) {
        tracing::debug!(method = %req.method, page = page.id(), role = %user.role, "ipc call denied");
        return Err(err(
            &req.id,
            "forbidden",
            format!("no access to {}", page.id()),
            Some(json!({ "redirect": Page::Home.path() })),
        ));
    }
    Ok(user)
}

pub fn session_json(state: &AppState) -> Value {
    json!({
        "isAuthenticated": state.session.is_authenticated(),
        "user": state.session.user(),
    })
}
