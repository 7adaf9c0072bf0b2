//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Transformers and the customer builder call store methods and never
//! execute SQL directly.
//!
//! Every domain table has the same shape: a primary key, an optional CIF
//! column (indexed) and the JSON payload of the record.

use crate::{
    error::IngestResult,
    records::Keyed,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

mod settings;
mod upload_log;

pub use settings::last_processed_key;

/// Keyed snapshot tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ProductMapping,
    LoanProductMapping,
    Deposit,
    DepositShadow,
    LoanShadow,
    Loan,
    Ccod,
    Npa,
    Customer,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::ProductMapping,
        Table::LoanProductMapping,
        Table::Deposit,
        Table::DepositShadow,
        Table::LoanShadow,
        Table::Loan,
        Table::Ccod,
        Table::Npa,
        Table::Customer,
    ];

    /// Stable external name.
    pub fn name(self) -> &'static str {
        match self {
            Table::ProductMapping     => "product-mapping",
            Table::LoanProductMapping => "loan-product-mapping",
            Table::Deposit            => "deposit",
            Table::DepositShadow      => "deposit-shadow",
            Table::LoanShadow         => "loan-shadow",
            Table::Loan               => "loan",
            Table::Ccod               => "ccod",
            Table::Npa                => "npa",
            Table::Customer           => "customer",
        }
    }

    fn sql_name(self) -> &'static str {
        match self {
            Table::ProductMapping     => "product_mapping",
            Table::LoanProductMapping => "loan_product_mapping",
            Table::Deposit            => "deposit",
            Table::DepositShadow      => "deposit_shadow",
            Table::LoanShadow         => "loan_shadow",
            Table::Loan               => "loan",
            Table::Ccod               => "ccod",
            Table::Npa                => "npa",
            Table::Customer           => "customer",
        }
    }
}

/// Secondary indexes available to get_by_index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Cif,
}

impl Index {
    fn column(self) -> &'static str {
        match self {
            Index::Cif => "cif",
        }
    }
}

/// A table's full contents, serialized ahead of the write so a
/// replacement of several tables can commit as one transaction.
pub struct TableSnapshot {
    table: Table,
    rows:  Vec<(String, Option<String>, String)>,
}

impl TableSnapshot {
    pub fn of<T: Keyed + Serialize>(table: Table, records: &[T]) -> IngestResult<Self> {
        let rows = records
            .iter()
            .map(|r| -> IngestResult<(String, Option<String>, String)> {
                Ok((
                    r.key().to_string(),
                    r.cif().map(str::to_string),
                    serde_json::to_string(r)?,
                ))
            })
            .collect::<IngestResult<Vec<_>>>()?;
        Ok(Self { table, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct IngestStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl IngestStore {
    pub fn open(path: &str) -> IngestResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> IngestResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> IngestResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> IngestResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Keyed tables ──────────────────────────────────────────────

    /// Insert or replace each record by primary key.
    pub fn put_all<T: Keyed + Serialize>(&self, table: Table, records: &[T]) -> IngestResult<()> {
        let snapshot = TableSnapshot::of(table, records)?;
        let tx = self.conn.unchecked_transaction()?;
        Self::insert_rows(&tx, &snapshot)?;
        tx.commit()?;
        Ok(())
    }

    /// Clear the table and bulk insert `records` in one transaction.
    /// Readers on other connections see either the old or the new snapshot.
    pub fn replace_all<T: Keyed + Serialize>(
        &self,
        table: Table,
        records: &[T],
    ) -> IngestResult<()> {
        self.replace_tables(&[TableSnapshot::of(table, records)?])
    }

    /// Replace several tables in one transaction. Either every table moves
    /// to its new snapshot or none does.
    pub fn replace_tables(&self, snapshots: &[TableSnapshot]) -> IngestResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for snapshot in snapshots {
            tx.execute(&format!("DELETE FROM {}", snapshot.table.sql_name()), [])?;
            Self::insert_rows(&tx, snapshot)?;
        }
        tx.commit()?;
        for snapshot in snapshots {
            log::debug!(
                "replaced {} with {} records",
                snapshot.table.name(),
                snapshot.rows.len()
            );
        }
        Ok(())
    }

    fn insert_rows(conn: &Connection, snapshot: &TableSnapshot) -> IngestResult<()> {
        let mut stmt = conn.prepare(&format!(
            "INSERT OR REPLACE INTO {} (record_key, cif, payload) VALUES (?1, ?2, ?3)",
            snapshot.table.sql_name()
        ))?;
        for (key, cif, payload) in &snapshot.rows {
            stmt.execute(params![key, cif, payload])?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> IngestResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// All records in insertion order.
    pub fn get_all<T: DeserializeOwned>(&self, table: Table) -> IngestResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT payload FROM {} ORDER BY rowid ASC",
            table.sql_name()
        ))?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    pub fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> IngestResult<Option<T>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT payload FROM {} WHERE record_key = ?1", table.sql_name()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_index<T: DeserializeOwned>(
        &self,
        table: Table,
        index: Index,
        value: &str,
    ) -> IngestResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT payload FROM {} WHERE {} = ?1 ORDER BY rowid ASC",
            table.sql_name(),
            index.column()
        ))?;
        let payloads = stmt
            .query_map(params![value], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    /// Primary keys only, without deserializing payloads.
    pub fn keys(&self, table: Table) -> IngestResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT record_key FROM {} ORDER BY rowid ASC",
            table.sql_name()
        ))?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn clear(&self, table: Table) -> IngestResult<()> {
        self.conn
            .execute(&format!("DELETE FROM {}", table.sql_name()), [])?;
        Ok(())
    }

    pub fn count(&self, table: Table) -> IngestResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.sql_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
