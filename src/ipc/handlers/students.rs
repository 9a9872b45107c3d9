use crate::engine;
use crate::error::AttendError;
use crate::ipc::helpers::{get_roll_no, student_json, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn students_login(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let (student, created) = engine::login(conn, &roll_no)?;
    Ok(json!({
        "student": student_json(&student),
        "created": created,
    }))
}

fn students_get(
    conn: &mut Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_roll_no(params)?;
    let student = store::get_student(conn, &roll_no)?
        .ok_or_else(|| AttendError::NotFound(format!("student {}", roll_no)))?;
    Ok(student_json(&student))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.login" => Some(with_db(state, req, students_login)),
        "students.get" => Some(with_db(state, req, students_get)),
        _ => None,
    }
}
