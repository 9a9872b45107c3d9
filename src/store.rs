use crate::error::{AttendError, AttendResult};
use chrono::NaiveDate;
use rusqlite::{types::Type, Connection, ErrorCode, OptionalExtension, Row};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub roll_no: String,
    pub total_classes: u32,
    pub attended_classes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRecord {
    pub id: i64,
    pub roll_no: String,
    pub date: NaiveDate,
    pub total_classes: u32,
    pub attended_classes: u32,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        roll_no: r.get(0)?,
        total_classes: r.get(1)?,
        attended_classes: r.get(2)?,
    })
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<DailyRecord> {
    let raw_date: String = r.get(2)?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(DailyRecord {
        id: r.get(0)?,
        roll_no: r.get(1)?,
        date,
        total_classes: r.get(3)?,
        attended_classes: r.get(4)?,
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation
    )
}

pub fn get_student(conn: &Connection, roll_no: &str) -> AttendResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT roll_no, total_classes, attended_classes FROM students WHERE roll_no = ?",
            [roll_no],
            student_from_row,
        )
        .optional()?;
    Ok(student)
}

pub fn create_student(conn: &Connection, roll_no: &str) -> AttendResult<Student> {
    match conn.execute(
        "INSERT INTO students(roll_no, total_classes, attended_classes) VALUES(?, 0, 0)",
        [roll_no],
    ) {
        Ok(_) => Ok(Student {
            roll_no: roll_no.to_string(),
            total_classes: 0,
            attended_classes: 0,
        }),
        Err(e) if is_constraint_violation(&e) => Err(AttendError::AlreadyExists(roll_no.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub fn get_daily_record(
    conn: &Connection,
    roll_no: &str,
    date: NaiveDate,
) -> AttendResult<Option<DailyRecord>> {
    let record = conn
        .query_row(
            "SELECT id, roll_no, date, total_classes, attended_classes
             FROM records
             WHERE roll_no = ? AND date = ?",
            (roll_no, format_date(date)),
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

pub fn get_daily_record_by_id(conn: &Connection, id: i64) -> AttendResult<Option<DailyRecord>> {
    let record = conn
        .query_row(
            "SELECT id, roll_no, date, total_classes, attended_classes FROM records WHERE id = ?",
            [id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

pub fn insert_daily_record(
    conn: &Connection,
    roll_no: &str,
    date: NaiveDate,
    total: u32,
    attended: u32,
) -> AttendResult<i64> {
    let date_text = format_date(date);
    match conn.execute(
        "INSERT INTO records(roll_no, date, total_classes, attended_classes) VALUES(?, ?, ?, ?)",
        (roll_no, &date_text, total, attended),
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_constraint_violation(&e) => Err(AttendError::DuplicateDate {
            roll_no: roll_no.to_string(),
            date: date_text,
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn update_daily_record(conn: &Connection, id: i64, total: u32, attended: u32) -> AttendResult<()> {
    let changed = conn.execute(
        "UPDATE records SET total_classes = ?, attended_classes = ? WHERE id = ?",
        (total, attended, id),
    )?;
    if changed == 0 {
        return Err(AttendError::NotFound(format!("record {}", id)));
    }
    Ok(())
}

pub fn update_student_totals(
    conn: &Connection,
    roll_no: &str,
    total: u32,
    attended: u32,
) -> AttendResult<()> {
    let changed = conn.execute(
        "UPDATE students SET total_classes = ?, attended_classes = ? WHERE roll_no = ?",
        (total, attended, roll_no),
    )?;
    if changed == 0 {
        return Err(AttendError::NotFound(format!("student {}", roll_no)));
    }
    Ok(())
}

/// Newest first. Each call runs a fresh query.
pub fn list_daily_records(conn: &Connection, roll_no: &str) -> AttendResult<Vec<DailyRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, roll_no, date, total_classes, attended_classes
         FROM records
         WHERE roll_no = ?
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([roll_no], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
