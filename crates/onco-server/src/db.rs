//! SQLite persistence for reports and chat history.
//!
//! A report row is written at most twice: `processing` on insert, then
//! exactly one terminal transition. The terminal update is conditional on
//! the row still being in `processing`, so a second writer cannot overwrite
//! a terminal status.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use onco_core::ReportStatus;
use rusqlite::{params, Connection};
use tracing::info;

/// Initializes the database, creating tables if needed.
pub fn init_db(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).context("failed to create db directory")?;
    }
    let conn = Connection::open(path).context("failed to open database")?;
    create_tables(&conn)?;
    info!("Database initialized at {}", path);
    Ok(conn)
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            file_path TEXT NOT NULL,
            status TEXT NOT NULL,
            ai_result TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE TABLE IF NOT EXISTS chat_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            user_message TEXT NOT NULL,
            ai_response TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create tables")?;
    Ok(())
}

/// Inserts a new report in `processing` state, returning its id.
pub fn insert_report(conn: &Connection, user_id: &str, role: &str, file_path: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO reports (user_id, role, file_path, status) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, role, file_path, ReportStatus::Processing.as_str()],
    )
    .context("failed to insert report")?;
    Ok(conn.last_insert_rowid())
}

/// Applies the single terminal transition. Returns false when the row was
/// already terminal (or missing), in which case nothing was written.
pub fn complete_report(
    conn: &Connection,
    report_id: i64,
    status: ReportStatus,
    result: &str,
) -> Result<bool> {
    debug_assert!(status.is_terminal());
    let updated = conn
        .execute(
            "UPDATE reports SET status = ?1, ai_result = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                status.as_str(),
                result,
                report_id,
                ReportStatus::Processing.as_str()
            ],
        )
        .context("failed to update report")?;
    Ok(updated == 1)
}

pub fn insert_chat(conn: &Connection, user_id: &str, message: &str, response: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_history (user_id, user_message, ai_response) VALUES (?1, ?2, ?3)",
        params![user_id, message, response],
    )
    .context("failed to insert chat history")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::OptionalExtension;

    use super::*;

    fn report_state(conn: &Connection, report_id: i64) -> Option<(String, Option<String>)> {
        conn.query_row(
            "SELECT status, ai_result FROM reports WHERE id = ?1",
            params![report_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .unwrap()
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn inserted_report_starts_processing() {
        let conn = test_conn();
        let id = insert_report(&conn, "user-1", "patient", "uploads/user-1_scan.pdf").unwrap();
        let (status, result) = report_state(&conn, id).unwrap();
        assert_eq!(status, "processing");
        assert!(result.is_none());
    }

    #[test]
    fn terminal_transition_happens_exactly_once() {
        let conn = test_conn();
        let id = insert_report(&conn, "user-1", "patient", "uploads/f.pdf").unwrap();

        assert!(complete_report(&conn, id, ReportStatus::Analyzed, "summary text").unwrap());
        let (status, result) = report_state(&conn, id).unwrap();
        assert_eq!(status, "analyzed");
        assert_eq!(result.as_deref(), Some("summary text"));

        // A second terminal write is a no-op.
        assert!(!complete_report(&conn, id, ReportStatus::Failed, "late error").unwrap());
        let (status, result) = report_state(&conn, id).unwrap();
        assert_eq!(status, "analyzed");
        assert_eq!(result.as_deref(), Some("summary text"));
    }

    #[test]
    fn failed_transition_stores_the_error_text() {
        let conn = test_conn();
        let id = insert_report(&conn, "user-2", "doctor", "uploads/g.pdf").unwrap();
        assert!(complete_report(&conn, id, ReportStatus::Failed, "extraction failed").unwrap());
        let (status, result) = report_state(&conn, id).unwrap();
        assert_eq!(status, "failed");
        assert_eq!(result.as_deref(), Some("extraction failed"));
    }

    #[test]
    fn chat_history_rows_are_keyed_by_user() {
        let conn = test_conn();
        insert_chat(&conn, "user-1", "what is TMB?", "TMB is...").unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chat_history WHERE user_id = 'user-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
