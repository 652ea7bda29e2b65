use crate::domain::model::{InvalidRow, RangeRow};
use crate::utils::error::Result;
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Opens a sheet exported as CSV. The first line is a header and is skipped;
/// columns are read by position, never by header name.
fn open_sheet(path: &Path) -> Result<Reader<File>> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?;
    tracing::debug!("Opened sheet {}", path.display());
    Ok(reader)
}

fn positional<T: DeserializeOwned>(record: csv::Result<StringRecord>) -> Result<T> {
    Ok(record?.deserialize(None)?)
}

/// Rows of the ranges sheet: id, reference, description, start, end, date.
///
/// A record that cannot be read yields an `Err` item and iteration goes on,
/// so the importer can count it against the right line.
pub fn range_rows(path: &Path) -> Result<impl Iterator<Item = Result<RangeRow>>> {
    Ok(open_sheet(path)?.into_records().map(positional))
}

/// Rows of the block-list sheet: a single serial column.
pub fn invalid_rows(path: &Path) -> Result<impl Iterator<Item = Result<InvalidRow>>> {
    Ok(open_sheet(path)?.into_records().map(positional))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sheet(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_ranges_by_position() {
        let file = sheet(
            "Row,Reference Number,Description,Start serial,End serial,Date\n\
             1,REF-1,Oil filter,AA100,AA200,2020-01-01\n\
             2,,, BB1 ,BB9,\n",
        );

        let rows: Vec<_> = range_rows(file.path()).unwrap().collect();
        assert_eq!(rows.len(), 2);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.reference.as_deref(), Some("REF-1"));
        assert_eq!(first.start.as_deref(), Some("AA100"));

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.reference, None);
        assert_eq!(second.description, None);
        assert_eq!(second.start.as_deref(), Some("BB1"));
        assert_eq!(second.issued, None);
    }

    #[test]
    fn test_bad_records_do_not_stop_iteration() {
        let file = sheet(
            "Row,Reference Number,Description,Start serial,End serial,Date\n\
             x,REF,Desc,AA1,AA2,2020-01-01\n\
             2,REF\n\
             3,REF,Desc,AA5,AA6,2020-01-01\n",
        );

        let rows: Vec<_> = range_rows(file.path()).unwrap().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_err());
        assert!(rows[1].is_err());
        assert_eq!(rows[2].as_ref().unwrap().id, 3);
    }

    #[test]
    fn test_reads_block_list() {
        let file = sheet("Invalid serial\nAB-123\n\n۱۲۳\n");
        let rows: Vec<_> = invalid_rows(file.path())
            .unwrap()
            .map(|r| r.unwrap().serial)
            .collect();
        assert_eq!(rows, vec![Some("AB-123".to_string()), Some("۱۲۳".to_string())]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(range_rows(Path::new("/nonexistent/ranges.csv")).is_err());
    }
}
