use crate::core::collision::{CollisionDetector, CollisionReport};
use crate::core::importer::{BulkImporter, ImportSettings};
use crate::domain::model::{ImportReport, InvalidRow, RangeRow};
use crate::domain::ports::RangeStore;
use crate::utils::error::Result;
use crate::utils::monitor::JobMonitor;

pub const IMPORT_LOG: &str = "import";
pub const DB_CHECK_LOG: &str = "db_check";
pub const DB_FILENAME_LOG: &str = "db_filename";

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub report: ImportReport,
    pub collisions: CollisionReport,
}

/// Runs an import followed by the database check, keeping the `import` and
/// `db_check` logs current so an administrator can follow progress.
pub struct ImportJob<S: RangeStore> {
    store: S,
    settings: ImportSettings,
    monitor: JobMonitor,
}

impl<S: RangeStore> ImportJob<S> {
    pub fn new(store: S, settings: ImportSettings) -> Self {
        Self::new_with_monitoring(store, settings, false)
    }

    pub fn new_with_monitoring(store: S, settings: ImportSettings, monitor_enabled: bool) -> Self {
        Self {
            store,
            settings,
            monitor: JobMonitor::new(monitor_enabled),
        }
    }

    pub fn run<R, I>(&self, source_name: &str, range_rows: R, invalid_rows: I) -> Result<ImportOutcome>
    where
        R: IntoIterator<Item = Result<RangeRow>>,
        I: IntoIterator<Item = Result<InvalidRow>>,
    {
        tracing::info!("🚀 Starting import from {}", source_name);
        self.monitor.log_phase("Import start", 0);

        self.store.write_log(DB_FILENAME_LOG, source_name)?;
        self.store
            .write_log(IMPORT_LOG, "Import started ... logs will appear when it's done")?;
        self.store.write_log(
            DB_CHECK_LOG,
            "DB check will be run after the insert is finished",
        )?;

        let report = match BulkImporter::new(&self.store, self.settings).import(range_rows, invalid_rows) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("❌ Import aborted: {}", e);
                if let Err(log_err) = self
                    .store
                    .write_log(IMPORT_LOG, &format!("Import aborted: {}", e))
                {
                    tracing::warn!("Could not record import failure: {}", log_err);
                }
                return Err(e);
            }
        };

        self.store.write_log(IMPORT_LOG, &report.to_log_text())?;
        self.monitor.log_phase(
            "Import loaded",
            report.ranges_inserted + report.invalids_inserted,
        );
        tracing::info!("✅ {}", report.summary());

        let collisions = self.check_database()?;
        self.monitor.log_final_stats();

        Ok(ImportOutcome { report, collisions })
    }

    /// Collision pass over whatever generation is active right now.
    pub fn check_database(&self) -> Result<CollisionReport> {
        self.store.write_log(
            DB_CHECK_LOG,
            "Database Check started ... wait for results. It may take a while",
        )?;

        let ranges = self.store.all_ranges()?;
        tracing::info!("🔍 Checking {} ranges for collisions", ranges.len());

        let report = CollisionDetector::detect(&ranges);
        self.store.write_log(DB_CHECK_LOG, &report.to_log_text())?;
        self.monitor.log_phase("Database check", ranges.len());

        Ok(report)
    }
}
