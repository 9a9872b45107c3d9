//! Keeps each student's aggregate totals equal to the sum of their daily records.
//!
//! Every mutation runs in a single transaction: the daily record write and the
//! aggregate write commit together or not at all. Aggregates are adjusted by the
//! delta between old and new values rather than re-summed.

use crate::error::{AttendError, AttendResult};
use crate::store::{self, DailyRecord, Student};
use chrono::NaiveDate;
use rusqlite::Connection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub record: DailyRecord,
    pub student: Student,
    /// True when a new daily record was inserted rather than overwritten.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub roll_no: String,
    pub stored_total: i64,
    pub stored_attended: i64,
    pub summed_total: i64,
    pub summed_attended: i64,
    pub record_count: i64,
}

impl AuditReport {
    pub fn consistent(&self) -> bool {
        self.stored_total == self.summed_total && self.stored_attended == self.summed_attended
    }
}

fn validate_counts(total: u32, attended: u32) -> AttendResult<()> {
    if attended > total {
        return Err(AttendError::InvalidAttendance { total, attended });
    }
    Ok(())
}

fn apply_delta(
    conn: &Connection,
    roll_no: &str,
    delta_total: i64,
    delta_attended: i64,
) -> AttendResult<Student> {
    let Some(student) = store::get_student(conn, roll_no)? else {
        log::warn!("aggregate update for unknown student {}", roll_no);
        return Err(AttendError::NotFound(format!("student {}", roll_no)));
    };
    let total = i64::from(student.total_classes) + delta_total;
    let attended = i64::from(student.attended_classes) + delta_attended;
    let corrupt = || AttendError::CorruptAggregate {
        roll_no: roll_no.to_string(),
        total,
        attended,
    };
    if attended > total {
        return Err(corrupt());
    }
    let total_u = u32::try_from(total).map_err(|_| corrupt())?;
    let attended_u = u32::try_from(attended).map_err(|_| corrupt())?;
    store::update_student_totals(conn, roll_no, total_u, attended_u)?;
    Ok(Student {
        roll_no: student.roll_no,
        total_classes: total_u,
        attended_classes: attended_u,
    })
}

/// Returns the student and whether it was created by this call.
pub fn login(conn: &mut Connection, roll_no: &str) -> AttendResult<(Student, bool)> {
    let tx = conn.transaction()?;
    if let Some(student) = store::get_student(&tx, roll_no)? {
        return Ok((student, false));
    }
    let student = store::create_student(&tx, roll_no)?;
    tx.commit()?;
    log::info!("created student {}", roll_no);
    Ok((student, true))
}

pub fn submit_or_edit(
    conn: &mut Connection,
    roll_no: &str,
    date: NaiveDate,
    total: u32,
    attended: u32,
) -> AttendResult<SubmitOutcome> {
    validate_counts(total, attended)?;

    let tx = conn.transaction()?;
    let outcome = match store::get_daily_record(&tx, roll_no, date)? {
        Some(existing) => {
            store::update_daily_record(&tx, existing.id, total, attended)?;
            let student = apply_delta(
                &tx,
                roll_no,
                i64::from(total) - i64::from(existing.total_classes),
                i64::from(attended) - i64::from(existing.attended_classes),
            )?;
            SubmitOutcome {
                record: DailyRecord {
                    total_classes: total,
                    attended_classes: attended,
                    ..existing
                },
                student,
                created: false,
            }
        }
        None => {
            let id = store::insert_daily_record(&tx, roll_no, date, total, attended)?;
            let student = apply_delta(&tx, roll_no, i64::from(total), i64::from(attended))?;
            SubmitOutcome {
                record: DailyRecord {
                    id,
                    roll_no: roll_no.to_string(),
                    date,
                    total_classes: total,
                    attended_classes: attended,
                },
                student,
                created: true,
            }
        }
    };
    tx.commit()?;

    log::debug!(
        "{} {} for {} on {}: {}/{} -> totals {}/{}",
        if outcome.created { "inserted" } else { "updated" },
        outcome.record.id,
        roll_no,
        store::format_date(date),
        attended,
        total,
        outcome.student.attended_classes,
        outcome.student.total_classes
    );
    Ok(outcome)
}

/// Edit an existing daily record by id, adjusting its owner's aggregate.
pub fn edit_record(
    conn: &mut Connection,
    id: i64,
    total: u32,
    attended: u32,
) -> AttendResult<SubmitOutcome> {
    validate_counts(total, attended)?;

    let tx = conn.transaction()?;
    let Some(existing) = store::get_daily_record_by_id(&tx, id)? else {
        return Err(AttendError::NotFound(format!("record {}", id)));
    };
    store::update_daily_record(&tx, id, total, attended)?;
    let student = apply_delta(
        &tx,
        &existing.roll_no,
        i64::from(total) - i64::from(existing.total_classes),
        i64::from(attended) - i64::from(existing.attended_classes),
    )?;
    tx.commit()?;

    Ok(SubmitOutcome {
        record: DailyRecord {
            total_classes: total,
            attended_classes: attended,
            ..existing
        },
        student,
        created: false,
    })
}

/// Re-sums a student's daily records and compares against the stored aggregate.
pub fn audit(conn: &Connection, roll_no: &str) -> AttendResult<AuditReport> {
    let Some(student) = store::get_student(conn, roll_no)? else {
        return Err(AttendError::NotFound(format!("student {}", roll_no)));
    };
    let (summed_total, summed_attended, record_count): (i64, i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(total_classes), 0), COALESCE(SUM(attended_classes), 0), COUNT(*)
         FROM records
         WHERE roll_no = ?",
        [roll_no],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    let report = AuditReport {
        roll_no: student.roll_no,
        stored_total: i64::from(student.total_classes),
        stored_attended: i64::from(student.attended_classes),
        summed_total,
        summed_attended,
        record_count,
    };
    if !report.consistent() {
        log::warn!(
            "aggregate mismatch for {}: stored {}/{}, summed {}/{}",
            roll_no,
            report.stored_attended,
            report.stored_total,
            report.summed_attended,
            report.summed_total
        );
    }
    Ok(report)
}
