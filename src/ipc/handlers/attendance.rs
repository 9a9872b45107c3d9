use crate::engine;
use crate::error::AttendError;
use crate::ipc::helpers::{
    audit_json, get_count, get_date_or_today, get_roll_no, outcome_json, record_json,
    shortfall_json, student_json, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use crate::shortfall;
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn attendance_submit(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let date = get_date_or_today(params)?;
    let total = get_count(params, "total")?;
    let attended = get_count(params, "attended")?;
    let outcome = engine::submit_or_edit(conn, &roll_no, date, total, attended)?;
    Ok(outcome_json(&outcome))
}

fn attendance_today(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let today = chrono::Local::now().date_naive();
    let record = store::get_daily_record(conn, &roll_no, today)?;
    Ok(json!({
        "date": store::format_date(today),
        "record": record.as_ref().map(record_json),
    }))
}

fn attendance_summary(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let student = store::get_student(conn, &roll_no)?
        .ok_or_else(|| AttendError::NotFound(format!("student {}", roll_no)))?;
    let threshold = settings::load(conn)?.threshold;
    let result = shortfall::evaluate(student.total_classes, student.attended_classes, threshold)?;
    Ok(json!({
        "student": student_json(&student),
        "shortfall": shortfall_json(&result, threshold),
    }))
}

fn attendance_audit(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let report = engine::audit(conn, &roll_no)?;
    Ok(audit_json(&report))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.submit" => Some(with_db(state, req, attendance_submit)),
        "attendance.today" => Some(with_db(state, req, attendance_today)),
        "attendance.summary" => Some(with_db(state, req, attendance_summary)),
        "attendance.audit" => Some(with_db(state, req, attendance_audit)),
        _ => None,
    }
}
