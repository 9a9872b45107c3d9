use anyhow::{anyhow, bail, Context};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

/// Same file name the earlier phone-keyed tracker wrote, so its data is picked up in place.
pub const DB_FILE_NAME: &str = "attendance.db";

/// Version written to `PRAGMA user_version` once the legacy column check passes.
pub const SCHEMA_VERSION: i64 = 1;

const LEGACY_ID_COLUMN: &str = "phone";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    prepare_schema(&conn)?;
    log::info!("opened attendance database at {}", db_path.to_string_lossy());
    Ok(conn)
}

pub fn prepare_schema(conn: &Connection) -> anyhow::Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if version > SCHEMA_VERSION {
        bail!(
            "database schema version {} is newer than supported version {}",
            version,
            SCHEMA_VERSION
        );
    }

    let tx = conn.unchecked_transaction()?;
    let legacy_records = version < SCHEMA_VERSION && table_exists(&tx, "records")?;

    // Older databases identified students by phone number. Only an unversioned
    // database may be renamed; a versioned one must already be in the current shape.
    for table in ["students", "records"] {
        ensure_roll_no_column(&tx, table, version < SCHEMA_VERSION)?;
    }

    tx.execute(
        "CREATE TABLE IF NOT EXISTS students(
            roll_no TEXT PRIMARY KEY,
            total_classes INTEGER NOT NULL DEFAULT 0,
            attended_classes INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    tx.execute(
        "CREATE TABLE IF NOT EXISTS records(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roll_no TEXT NOT NULL,
            date TEXT NOT NULL,
            total_classes INTEGER NOT NULL,
            attended_classes INTEGER NOT NULL,
            UNIQUE(roll_no, date)
        )",
        [],
    )?;
    // Legacy records tables were created without the unique constraint.
    if legacy_records && !has_unique_roll_date(&tx)? {
        tx.execute(
            "CREATE UNIQUE INDEX idx_records_roll_date ON records(roll_no, date)",
            [],
        )
        .context("records table holds more than one row for the same roll number and date")?;
    }

    tx.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    if version < SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        log::info!(
            "schema upgraded from version {} to {}",
            version,
            SCHEMA_VERSION
        );
    }
    tx.commit()?;
    Ok(())
}

fn ensure_roll_no_column(conn: &Connection, table: &str, allow_rename: bool) -> anyhow::Result<()> {
    if !table_exists(conn, table)? {
        return Ok(());
    }
    let has_legacy = table_has_column(conn, table, LEGACY_ID_COLUMN)?;
    let has_roll_no = table_has_column(conn, table, "roll_no")?;
    match (has_legacy, has_roll_no) {
        (false, true) => Ok(()),
        (true, false) if allow_rename => {
            let sql = format!(
                "ALTER TABLE {} RENAME COLUMN {} TO roll_no",
                table, LEGACY_ID_COLUMN
            );
            conn.execute(&sql, [])
                .with_context(|| format!("failed to rename {}.{}", table, LEGACY_ID_COLUMN))?;
            log::info!("renamed {}.{} to roll_no", table, LEGACY_ID_COLUMN);
            Ok(())
        }
        (true, false) => Err(anyhow!(
            "table {} still has legacy column {} at a versioned schema",
            table,
            LEGACY_ID_COLUMN
        )),
        (true, true) => Err(anyhow!(
            "table {} has both {} and roll_no columns; refusing to guess",
            table,
            LEGACY_ID_COLUMN
        )),
        (false, false) => Err(anyhow!(
            "table {} has no roll_no column; unrecognized schema",
            table
        )),
    }
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {} is not valid json", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> anyhow::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |r| r.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// True if some unique index on `records` covers exactly `(roll_no, date)`.
fn has_unique_roll_date(conn: &Connection) -> anyhow::Result<bool> {
    let mut stmt = conn.prepare("PRAGMA index_list(records)")?;
    let unique_indexes = stmt
        .query_map([], |r| Ok((r.get::<_, String>(1)?, r.get::<_, i64>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (name, unique) in unique_indexes {
        if unique == 0 {
            continue;
        }
        let sql = format!("PRAGMA index_info(\"{}\")", name.replace('"', "\"\""));
        let mut cols_stmt = conn.prepare(&sql)?;
        let cols = cols_stmt
            .query_map([], |r| r.get::<_, String>(2))?
            .collect::<Result<Vec<_>, _>>()?;
        if cols == ["roll_no", "date"] {
            return Ok(true);
        }
    }
    Ok(false)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
