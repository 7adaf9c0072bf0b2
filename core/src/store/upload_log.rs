use super::IngestStore;
use crate::{error::IngestResult, records::UploadLogEntry};
use rusqlite::params;

impl IngestStore {
    // ── Upload log ────────────────────────────────────────────────

    pub fn append_log(&self, entry: &UploadLogEntry) -> IngestResult<()> {
        self.conn.execute(
            "INSERT INTO upload_log
             (upload_id, file_type, file_name, record_count, status, error_message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.upload_id,
                entry.file_type,
                entry.file_name,
                entry.record_count as i64,
                entry.status,
                entry.error_message,
                entry.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Full audit trail, oldest first.
    pub fn upload_log(&self) -> IngestResult<Vec<UploadLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, upload_id, file_type, file_name, record_count, status,
                    error_message, timestamp
             FROM upload_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(UploadLogEntry {
                    id:            Some(row.get(0)?),
                    upload_id:     row.get(1)?,
                    file_type:     row.get(2)?,
                    file_name:     row.get(3)?,
                    record_count:  row.get::<_, i64>(4)? as usize,
                    status:        row.get(5)?,
                    error_message: row.get(6)?,
                    timestamp:     row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn upload_failure_count(&self) -> IngestResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM upload_log WHERE status = 'error'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
