use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::session_json;
use crate::ipc::types::{AppState, Request};
use crate::session::{self, SqliteSessionStore};
use crate::users;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "workspace open failed");
            return err(&req.id, "db_open_failed", format!("{e:#}"), None);
        }
    };

    let seeded = match users::ensure_default_manager(&conn, &state.config) {
        Ok(v) => v.is_some(),
        Err(e) => {
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "users" })),
            )
        }
    };

    let restored = match session::restore(&SqliteSessionStore::new(&conn)) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "session_read_failed", e.to_string(), None),
    };
    if let Some(user) = restored.user() {
        tracing::info!(username = %user.username, "session restored");
    }

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.session = restored;

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "seededManager": seeded,
            "session": session_json(state),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
