use crate::engine::{AuditReport, SubmitOutcome};
use crate::error::AttendError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::shortfall::Shortfall;
use crate::store::{self, DailyRecord, Student, DATE_FORMAT};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<AttendError> for HandlerErr {
    fn from(e: AttendError) -> Self {
        let details = match &e {
            AttendError::InvalidAttendance { total, attended } => {
                Some(json!({ "total": total, "attended": attended }))
            }
            AttendError::DuplicateDate { roll_no, date } => {
                Some(json!({ "rollNo": roll_no, "date": date }))
            }
            _ => None,
        };
        if matches!(e, AttendError::Storage(_) | AttendError::CorruptAggregate { .. }) {
            log::error!("{}", e);
        }
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

impl From<anyhow::Error> for HandlerErr {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<AttendError>() {
            Ok(domain) => domain.into(),
            Err(other) => {
                log::error!("{:#}", other);
                HandlerErr {
                    code: "db_error",
                    message: format!("{:#}", other),
                    details: None,
                }
            }
        }
    }
}

/// Runs `f` against the open workspace and wraps the result in a response envelope.
pub fn with_db<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&mut Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_roll_no(params: &serde_json::Value) -> Result<String, HandlerErr> {
    let raw = get_required_str(params, "rollNo")?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HandlerErr::bad_params("rollNo must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn get_count(params: &serde_json::Value, key: &str) -> Result<u32, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key)))
}

pub fn get_record_id(params: &serde_json::Value) -> Result<i64, HandlerErr> {
    params
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing id"))
}

/// `date` is optional and defaults to the local calendar day.
pub fn get_date_or_today(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    match params.get("date") {
        None | Some(serde_json::Value::Null) => Ok(chrono::Local::now().date_naive()),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| HandlerErr::bad_params("date must be a string"))?;
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))
        }
    }
}

pub fn student_json(s: &Student) -> serde_json::Value {
    json!({
        "rollNo": s.roll_no,
        "totalClasses": s.total_classes,
        "attendedClasses": s.attended_classes,
    })
}

pub fn record_json(r: &DailyRecord) -> serde_json::Value {
    json!({
        "id": r.id,
        "rollNo": r.roll_no,
        "date": store::format_date(r.date),
        "totalClasses": r.total_classes,
        "attendedClasses": r.attended_classes,
    })
}

pub fn outcome_json(o: &SubmitOutcome) -> serde_json::Value {
    json!({
        "record": record_json(&o.record),
        "student": student_json(&o.student),
        "created": o.created,
    })
}

pub fn shortfall_json(shortfall: &Shortfall, threshold: u32) -> serde_json::Value {
    match shortfall {
        Shortfall::NoData => json!({
            "status": "no_data",
            "threshold": threshold,
        }),
        Shortfall::Evaluated(e) => json!({
            "status": if e.meets_threshold { "safe" } else { "shortage" },
            "threshold": threshold,
            "percent": e.percent,
            "meetsThreshold": e.meets_threshold,
            "classesNeeded": e.classes_needed,
            "gauge": e.gauge(),
        }),
    }
}

pub fn audit_json(a: &AuditReport) -> serde_json::Value {
    json!({
        "rollNo": a.roll_no,
        "storedTotal": a.stored_total,
        "storedAttended": a.stored_attended,
        "summedTotal": a.summed_total,
        "summedAttended": a.summed_attended,
        "recordCount": a.record_count,
        "consistent": a.consistent(),
    })
}
