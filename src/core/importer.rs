use crate::core::normalizer::Normalizer;
use crate::domain::model::{ImportReport, InvalidRow, RangeRow, SerialRange};
use crate::domain::ports::{ImportSession, RangeStore};
use crate::utils::error::{Result, SerialError};
use chrono::NaiveDate;

pub const RANGES_SHEET: &str = "SERIALS";
pub const INVALIDS_SHEET: &str = "INVALIDS";
pub const TOO_MANY_ERRORS: &str = "Too many errors!";

/// Knobs for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub fixed_length: usize,
    pub max_errors: usize,
    pub commit_interval: usize,
    pub fallback_date: NaiveDate,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            fixed_length: crate::core::normalizer::DEFAULT_FIXED_LENGTH,
            max_errors: 100,
            commit_interval: 1000,
            fallback_date: default_fallback_date(),
        }
    }
}

/// 2 July 2012, used for rows without an issue date.
pub fn default_fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2012, 7, 2).unwrap_or_default()
}

/// Parses the issue-date column as spreadsheets usually export it:
/// ISO dates, `Y/M/D`, or US `M/D/Y` with a two or four digit year.
/// A trailing time of day is ignored.
pub fn parse_issue_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(|c: char| c == ' ' || c == 'T').next()?;

    let format = if date_part.contains('/') {
        let parts: Vec<&str> = date_part.split('/').collect();
        match parts.as_slice() {
            [year, _, _] if year.len() == 4 => "%Y/%m/%d",
            [_, _, year] if year.len() == 2 => "%m/%d/%y",
            [_, _, _] => "%m/%d/%Y",
            _ => return None,
        }
    } else {
        "%Y-%m-%d"
    };

    NaiveDate::parse_from_str(date_part, format).ok()
}

/// Error list that stops growing once the ceiling is hit.
#[derive(Debug)]
struct ErrorLog {
    entries: Vec<String>,
    count: usize,
    cap: usize,
}

impl ErrorLog {
    fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            count: 0,
            cap,
        }
    }

    fn push(&mut self, error: &SerialError) {
        self.count += 1;
        if self.count < self.cap {
            self.entries.push(error.to_string());
        } else if self.count == self.cap {
            self.entries.push(TOO_MANY_ERRORS.to_string());
        }
    }

    fn truncated(&self) -> bool {
        self.count >= self.cap
    }
}

/// Loads both sheets into a fresh import generation.
///
/// Rows are processed strictly in sheet order. A bad row is logged and
/// skipped; only failing to open or close the generation aborts the run.
pub struct BulkImporter<'s, S: RangeStore> {
    store: &'s S,
    settings: ImportSettings,
    normalizer: Normalizer,
}

impl<'s, S: RangeStore> BulkImporter<'s, S> {
    pub fn new(store: &'s S, settings: ImportSettings) -> Self {
        Self {
            store,
            settings,
            normalizer: Normalizer::new(settings.fixed_length),
        }
    }

    pub fn import<R, I>(&self, range_rows: R, invalid_rows: I) -> Result<ImportReport>
    where
        R: IntoIterator<Item = Result<RangeRow>>,
        I: IntoIterator<Item = Result<InvalidRow>>,
    {
        let mut session = self.store.begin_import()?;
        let mut log = ErrorLog::new(self.settings.max_errors);

        let ranges_inserted = self.load_sheet(
            &mut session,
            RANGES_SHEET,
            range_rows,
            &mut log,
            |session, row| {
                let range = self.build_range(row)?;
                session.insert_range(&range)
            },
        );
        tracing::info!("Loaded {} ranges", ranges_inserted);

        let invalids_inserted = self.load_sheet(
            &mut session,
            INVALIDS_SHEET,
            invalid_rows,
            &mut log,
            |session, row: InvalidRow| {
                let serial = row.serial.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
                    SerialError::ProcessingError {
                        message: "missing invalid serial".to_string(),
                    }
                })?;
                let code = self.normalizer.normalize(&serial)?;
                session.insert_invalid(&code)
            },
        );
        tracing::info!("Loaded {} invalid serials", invalids_inserted);

        session.finish()?;

        if log.count > 0 {
            tracing::warn!("Import finished with {} rejected rows", log.count);
        }

        let truncated = log.truncated();
        let total_errors = log.count;
        let mut errors = log.entries;
        errors.reverse();

        Ok(ImportReport {
            ranges_inserted,
            invalids_inserted,
            errors,
            truncated,
            total_errors,
        })
    }

    fn load_sheet<T, It, F>(
        &self,
        session: &mut S::Session,
        sheet: &str,
        rows: It,
        log: &mut ErrorLog,
        mut insert: F,
    ) -> usize
    where
        It: IntoIterator<Item = Result<T>>,
        F: FnMut(&mut S::Session, T) -> Result<()>,
    {
        let mut inserted = 0;
        let mut processed = 0;
        // 尚未提交的成功筆數
        let mut batch = 0;
        let mut line = 1;
        let commit_interval = self.settings.commit_interval.max(1);

        for (index, row) in rows.into_iter().enumerate() {
            // 第一行是標題列
            line = index + 2;
            processed += 1;

            match row.and_then(|row| insert(session, row)) {
                Ok(()) => {
                    inserted += 1;
                    batch += 1;
                }
                Err(e) => {
                    tracing::debug!("Rejected line {} of {}: {}", line, sheet, e);
                    log.push(&SerialError::RowImportError {
                        sheet: sheet.to_string(),
                        line,
                        message: e.to_string(),
                    });
                }
            }

            if processed % commit_interval == 0 {
                inserted -= Self::commit_batch(session, sheet, line, &mut batch, log);
            }
        }

        // 每張表結尾提交，批次不跨表
        if batch > 0 {
            inserted -= Self::commit_batch(session, sheet, line, &mut batch, log);
        }

        inserted
    }

    /// Commits the open batch and returns how many inserted rows it lost.
    fn commit_batch(
        session: &mut S::Session,
        sheet: &str,
        line: usize,
        batch: &mut usize,
        log: &mut ErrorLog,
    ) -> usize {
        let pending = std::mem::take(batch);
        match session.commit() {
            Ok(()) => 0,
            Err(e) => {
                tracing::warn!(
                    "Commit failed at line {} of {}, {} rows discarded: {}",
                    line,
                    sheet,
                    pending,
                    e
                );
                log.push(&SerialError::BatchCommitError {
                    sheet: sheet.to_string(),
                    line,
                    message: e.to_string(),
                });
                pending
            }
        }
    }

    fn build_range(&self, row: RangeRow) -> Result<SerialRange> {
        let start = required(row.start, "start serial")?;
        let end = required(row.end, "end serial")?;

        let issued = match row.issued.filter(|d| !d.trim().is_empty()) {
            Some(text) => parse_issue_date(&text).ok_or_else(|| SerialError::ProcessingError {
                message: format!("unreadable issue date '{}'", text),
            })?,
            None => self.settings.fallback_date,
        };

        Ok(SerialRange {
            id: row.id,
            reference: row.reference.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            start: self.normalizer.normalize(&start)?,
            end: self.normalizer.normalize(&end)?,
            issued,
        })
    }
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SerialError::ProcessingError {
            message: format!("missing {}", what),
        })
}
