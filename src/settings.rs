use crate::db;
use crate::shortfall::{validate_threshold, DEFAULT_THRESHOLD};
use anyhow::Context;
use rusqlite::Connection;
use serde_json::json;

const THRESHOLD_KEY: &str = "attendance.threshold";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Reads workspace settings, falling back to defaults for anything unset.
pub fn load(conn: &Connection) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(v) = db::settings_get_json(conn, THRESHOLD_KEY)? {
        let threshold = v
            .get("threshold")
            .and_then(|t| t.as_u64())
            .and_then(|t| u32::try_from(t).ok())
            .with_context(|| format!("setting {} has no usable threshold: {}", THRESHOLD_KEY, v))?;
        settings.threshold = threshold;
    }
    Ok(settings)
}

pub fn set_threshold(conn: &Connection, threshold: u32) -> anyhow::Result<Settings> {
    validate_threshold(threshold)?;
    db::settings_set_json(conn, THRESHOLD_KEY, &json!({ "threshold": threshold }))?;
    log::info!("attendance threshold set to {}", threshold);
    load(conn)
}
