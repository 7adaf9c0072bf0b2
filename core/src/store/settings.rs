use super::IngestStore;
use crate::error::IngestResult;
use rusqlite::{params, OptionalExtension};

/// Settings key recording when a file type was last processed.
pub fn last_processed_key(file_type: &str) -> String {
    format!("last_processed.{file_type}")
}

impl IngestStore {
    // ── Settings ──────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> IngestResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> IngestResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
