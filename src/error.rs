use thiserror::Error;

pub type AttendResult<T> = Result<T, AttendError>;

#[derive(Error, Debug)]
pub enum AttendError {
    #[error("attended classes ({attended}) cannot exceed total classes ({total})")]
    InvalidAttendance { total: u32, attended: u32 },

    #[error("student already exists: {0}")]
    AlreadyExists(String),

    #[error("a record for {roll_no} on {date} already exists")]
    DuplicateDate { roll_no: String, date: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("aggregate for {roll_no} would become ({total}, {attended})")]
    CorruptAggregate {
        roll_no: String,
        total: i64,
        attended: i64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl AttendError {
    /// Stable code reported to IPC clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendError::InvalidAttendance { .. } => "invalid_attendance",
            AttendError::AlreadyExists(_) => "already_exists",
            AttendError::DuplicateDate { .. } => "duplicate_date",
            AttendError::NotFound(_) => "not_found",
            AttendError::InvalidConfiguration(_) => "invalid_configuration",
            AttendError::CorruptAggregate { .. } => "corrupt_aggregate",
            AttendError::Storage(_) => "db_error",
        }
    }
}
