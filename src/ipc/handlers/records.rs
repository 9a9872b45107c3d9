use crate::engine;
use crate::error::AttendError;
use crate::ipc::helpers::{
    get_count, get_record_id, get_roll_no, outcome_json, record_json, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn records_list(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let records = store::list_daily_records(conn, &roll_no)?;
    let rows: Vec<serde_json::Value> = records.iter().map(record_json).collect();
    Ok(json!({ "rollNo": roll_no, "records": rows }))
}

fn records_get(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_record_id(params)?;
    let record = store::get_daily_record_by_id(conn, id)?
        .ok_or_else(|| AttendError::NotFound(format!("record {}", id)))?;
    Ok(record_json(&record))
}

fn records_edit(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = get_record_id(params)?;
    let total = get_count(params, "total")?;
    let attended = get_count(params, "attended")?;
    let outcome = engine::edit_record(conn, id, total, attended)?;
    Ok(outcome_json(&outcome))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.list" => Some(with_db(state, req, records_list)),
        "records.get" => Some(with_db(state, req, records_get)),
        "records.edit" => Some(with_db(state, req, records_edit)),
        _ => None,
    }
}
