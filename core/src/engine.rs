//! The ingest engine: the single upload entry point.
//!
//! FLOW (one upload, start to finish, before the next is accepted):
//!   1. Parse the text into header-keyed rows.
//!   2. Detect the file type from the filename, then the headers.
//!   3. Run the matching transformer; it replaces its target table.
//!   4. Record `last_processed.<file_type>` and an upload log entry.
//!   5. If the file feeds the customer dimension, rebuild it.
//!
//! RULES:
//!   - Every outcome, success or failure, lands in the upload log.
//!   - A detection failure writes nothing to any domain table.
//!   - Upload order never causes an error; missing cross references
//!     (shadow before balance, CC/OD before deposit) default silently.

use crate::{
    clock::{Clock, FixedClock},
    config::PipelineConfig,
    customer,
    detector::{detect, FileType},
    error::{IngestError, IngestResult},
    parser,
    records::UploadLogEntry,
    store::{last_processed_key, IngestStore},
    transform::{self, TransformContext, Transformer},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const CUSTOMER_LOG_TYPE: &str = "customer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub upload_id:         String,
    pub file_type:         FileType,
    pub record_count:      usize,
    /// Customer records written by the follow-up rebuild, if one ran.
    pub customers_rebuilt: Option<usize>,
}

pub struct IngestEngine {
    pub store:    IngestStore,
    pub config:   PipelineConfig,
    clock:        Box<dyn Clock>,
    transformers: Vec<Box<dyn Transformer>>,
}

impl IngestEngine {
    /// Build an engine with every transformer registered.
    /// The store must already be migrated.
    pub fn new(store: IngestStore, config: PipelineConfig, clock: Box<dyn Clock>) -> Self {
        let mut engine = Self {
            store,
            config,
            clock,
            transformers: Vec::new(),
        };
        for t in transform::all() {
            engine.register(t);
        }
        engine
    }

    /// In-memory store, default config, clock pinned to `today`.
    pub fn build_test(today: NaiveDate) -> IngestResult<Self> {
        let store = IngestStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(
            store,
            PipelineConfig::default(),
            Box::new(FixedClock::new(today)),
        ))
    }

    /// Register a transformer. A later registration for the same file type
    /// replaces the earlier one.
    pub fn register(&mut self, transformer: Box<dyn Transformer>) {
        let file_type = transformer.file_type();
        self.transformers.retain(|t| t.file_type() != file_type);
        self.transformers.push(transformer);
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Detect, transform and commit one file.
    pub fn upload(&mut self, file_name: &str, raw_text: &str) -> IngestResult<UploadOutcome> {
        let upload_id = Uuid::new_v4().to_string();
        let parsed = parser::parse(raw_text);

        let file_type = match detect(file_name, &parsed.headers).into_result(file_name) {
            Ok(t) => t,
            Err(e) => {
                self.record(&upload_id, "unknown", file_name, 0, Some(&e));
                log::error!("upload {file_name} rejected: {e}");
                return Err(e);
            }
        };

        if parsed.rows.is_empty() {
            let e = IngestError::EmptyFile {
                file_name: file_name.to_string(),
            };
            self.record(&upload_id, file_type.as_str(), file_name, 0, Some(&e));
            log::error!("upload {file_name} rejected: {e}");
            return Err(e);
        }

        let record_count = match self.run_transformer(file_type, &parsed.rows) {
            Ok(n) => n,
            Err(e) => {
                self.record(&upload_id, file_type.as_str(), file_name, 0, Some(&e));
                log::error!("upload {file_name} failed in {}: {e}", file_type.as_str());
                return Err(e);
            }
        };

        if let Err(e) = self.store.set_setting(
            &last_processed_key(file_type.as_str()),
            &self.clock.now().to_rfc3339(),
        ) {
            self.record(&upload_id, file_type.as_str(), file_name, record_count, Some(&e));
            log::error!("upload {file_name}: data committed, last-processed stamp failed: {e}");
            return Err(e);
        }
        self.record(&upload_id, file_type.as_str(), file_name, record_count, None);
        log::info!(
            "upload {file_name}: {} rows -> {record_count} {} records",
            parsed.rows.len(),
            file_type.as_str()
        );

        // A failed rebuild is logged under its own entry; the upload stands.
        let customers_rebuilt =
            if self.config.auto_rebuild_customers && file_type.feeds_customer_dimension() {
                self.rebuild_customers().ok()
            } else {
                None
            };

        Ok(UploadOutcome {
            upload_id,
            file_type,
            record_count,
            customers_rebuilt,
        })
    }

    /// Rebuild the customer dimension from the current domain tables.
    pub fn rebuild_customers(&mut self) -> IngestResult<usize> {
        let upload_id = Uuid::new_v4().to_string();
        let result = customer::rebuild(&self.store, &self.config).and_then(|n| {
            self.store.set_setting(
                &last_processed_key(CUSTOMER_LOG_TYPE),
                &self.clock.now().to_rfc3339(),
            )?;
            Ok(n)
        });
        match result {
            Ok(n) => {
                self.record(&upload_id, CUSTOMER_LOG_TYPE, "rebuild", n, None);
                Ok(n)
            }
            Err(e) => {
                self.record(&upload_id, CUSTOMER_LOG_TYPE, "rebuild", 0, Some(&e));
                log::error!("customer rebuild failed: {e}");
                Err(e)
            }
        }
    }

    fn run_transformer(&self, file_type: FileType, rows: &[parser::RawRow]) -> IngestResult<usize> {
        let transformer = self
            .transformers
            .iter()
            .find(|t| t.file_type() == file_type)
            .ok_or_else(|| {
                anyhow::anyhow!("no transformer registered for {}", file_type.as_str())
            })?;

        let ctx = TransformContext {
            store:  &self.store,
            config: &self.config,
            today:  self.clock.today(),
        };
        log::debug!("running transformer {} on {} rows", transformer.name(), rows.len());
        transformer.run(rows, &ctx)
    }

    /// Append to the upload log. A failure here is logged, never raised,
    /// so it cannot mask the outcome being recorded.
    fn record(
        &self,
        upload_id: &str,
        file_type: &str,
        file_name: &str,
        record_count: usize,
        error: Option<&IngestError>,
    ) {
        let entry = UploadLogEntry {
            id:            None,
            upload_id:     upload_id.to_string(),
            file_type:     file_type.to_string(),
            file_name:     file_name.to_string(),
            record_count,
            status:        if error.is_some() { "error" } else { "success" }.to_string(),
            error_message: error.map(|e| e.to_string()),
            timestamp:     self.clock.now().to_rfc3339(),
        };
        if let Err(e) = self.store.append_log(&entry) {
            log::error!("could not write upload log for {file_name}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    const DEPOSITS: &str = "ACCOUNT_NO,CIF_NO,CURRENT_BALANCE,AVAILABLE_BALANCE\n1,10,500,500\n";
    const NPA: &str = "ACCOUNT_NO,CIF_NO,IRAC\n7,10,05\n";

    fn engine() -> IngestEngine {
        IngestEngine::build_test(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()).unwrap()
    }

    fn reject_inserts(engine: &IngestEngine, table: &str) {
        engine
            .store
            .execute_batch(&format!(
                "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table}
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn failed_shadow_write_keeps_previous_deposit_snapshot() {
        let mut engine = engine();
        engine.upload("deposit_shadow.csv", DEPOSITS).unwrap();
        reject_inserts(&engine, "deposit_shadow");

        let err = engine
            .upload(
                "deposit_shadow.csv",
                "ACCOUNT_NO,CIF_NO,CURRENT_BALANCE,AVAILABLE_BALANCE\n2,11,700,700\n",
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::Database(_)));

        assert_eq!(engine.store.keys(Table::Deposit).unwrap(), vec!["1"]);
        assert_eq!(engine.store.keys(Table::DepositShadow).unwrap(), vec!["1"]);
        assert_eq!(engine.store.keys(Table::Customer).unwrap(), vec!["10"]);

        let last = engine.store.upload_log().unwrap().pop().unwrap();
        assert_eq!(last.status, "error");
        assert_eq!(last.file_type, "deposit_shadow");
        assert!(last.error_message.unwrap_or_default().contains("disk full"));
    }

    #[test]
    fn failed_rebuild_does_not_fail_the_committed_upload() {
        let mut engine = engine();
        engine.upload("deposit_shadow.csv", DEPOSITS).unwrap();
        reject_inserts(&engine, "customer");

        let outcome = engine.upload("npa_report.csv", NPA).unwrap();
        assert_eq!(outcome.record_count, 1);
        assert_eq!(outcome.customers_rebuilt, None);
        assert_eq!(engine.store.count(Table::Npa).unwrap(), 1);

        let log = engine.store.upload_log().unwrap();
        let (upload, rebuild) = (&log[log.len() - 2], &log[log.len() - 1]);
        assert_eq!((upload.file_type.as_str(), upload.status.as_str()), ("npa_report", "success"));
        assert_eq!((rebuild.file_type.as_str(), rebuild.status.as_str()), ("customer", "error"));
    }

    #[test]
    fn failed_settings_stamp_is_logged() {
        let mut engine = engine();
        reject_inserts(&engine, "settings");

        let err = engine.upload("npa_report.csv", NPA).unwrap_err();
        assert!(matches!(err, IngestError::Database(_)));

        let log = engine.store.upload_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].file_type, "npa_report");
        assert_eq!(log[0].status, "error");
        assert_eq!(log[0].record_count, 1);
    }
}
