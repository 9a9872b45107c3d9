use crate::ipc::helpers::{get_count, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use rusqlite::Connection;
use serde_json::json;

fn settings_get(
    conn: &mut Connection,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let s = settings::load(conn)?;
    Ok(json!({ "threshold": s.threshold }))
}

fn settings_update(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let threshold = get_count(params, "threshold")?;
    let s = settings::set_threshold(conn, threshold)?;
    Ok(json!({ "threshold": s.threshold }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(with_db(state, req, settings_get)),
        "settings.update" => Some(with_db(state, req, settings_update)),
        _ => None,
    }
}
