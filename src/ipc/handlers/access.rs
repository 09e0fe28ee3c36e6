use crate::access::page::PageRule;
use crate::access::{allow, guard, menu, Page};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, Reply};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn rule_json(rule: PageRule) -> Value {
    match rule {
        PageRule::Public => json!({ "kind": "public" }),
        PageRule::Authenticated => json!({ "kind": "authenticated" }),
        PageRule::Flag(key) => json!({
            "kind": "flag",
            "key": key.as_str(),
            "defaultGrant": key.default_grant(),
        }),
        PageRule::Roles(roles) => json!({ "kind": "roles", "roles": roles }),
    }
}

fn handle_access_check(state: &mut AppState, req: &Request) -> Reply {
    let raw = required_str(req, "page")?;
    let Some(page) = Page::parse_id(raw) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("unknown page: {raw}"),
            None,
        ));
    };
    let allowed = allow(state.session.user(), page);
    Ok(ok(&req.id, json!({ "page": page, "allowed": allowed })))
}

fn handle_route_resolve(state: &mut AppState, req: &Request) -> Reply {
    let path = required_str(req, "path")?;
    let decision = guard::resolve(&state.session, path);
    tracing::debug!(path, state = ?decision.state(), "route resolved");
    Ok(ok(&req.id, json!(decision)))
}

fn handle_menu_build(state: &mut AppState, req: &Request) -> Reply {
    let items = menu::build(&state.session);
    Ok(ok(&req.id, json!({ "items": items })))
}

fn handle_pages_list(_state: &mut AppState, req: &Request) -> Reply {
    let pages: Vec<Value> = Page::ALL
        .into_iter()
        .map(|p| {
            json!({
                "page": p,
                "path": p.path(),
                "label": p.label(),
                "rule": rule_json(p.rule()),
            })
        })
        .collect();
    Ok(ok(&req.id, json!({ "pages": pages })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "access.check" => handle_access_check(state, req),
        "route.resolve" => handle_route_resolve(state, req),
        "menu.build" => handle_menu_build(state, req),
        "pages.list" => handle_pages_list(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
