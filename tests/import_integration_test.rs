use serial_check::adapters::sheets;
use serial_check::core::import_job::{DB_CHECK_LOG, DB_FILENAME_LOG, IMPORT_LOG};
use serial_check::domain::ports::RangeStore;
use serial_check::{
    ImportJob, ImportSettings, Normalizer, Resolver, SqliteRangeStore, VerificationStatus,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RANGES_HEADER: &str = "Row,Reference Number,Description,Start serial,End serial,Date\n";

fn write_sheet(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run_import(
    store: &SqliteRangeStore,
    ranges: &Path,
    invalids: &Path,
) -> anyhow::Result<serial_check::ImportOutcome> {
    let job = ImportJob::new(store.clone(), ImportSettings::default());
    let outcome = job.run(
        "test sheets",
        sheets::range_rows(ranges)?,
        sheets::invalid_rows(invalids)?,
    )?;
    Ok(outcome)
}

#[test]
fn test_thousand_row_sheet_with_two_bad_rows() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteRangeStore::open(temp_dir.path().join("serials.db"))?;

    let mut ranges = String::from(RANGES_HEADER);
    for i in 1..=1000u64 {
        match i {
            // non-numeric row id
            300 => ranges.push_str("x,REF-300,Oil filter,AA300000,AA300999,2020-01-01\n"),
            // serial wider than the fixed length
            700 => {
                writeln!(ranges, "700,REF-700,Oil filter,AA{},AA1,2020-01-01", "9".repeat(40))?
            }
            _ => writeln!(
                ranges,
                "{},REF-{},Oil filter,AA{},AA{},2020-01-01",
                i,
                i,
                i * 1000,
                i * 1000 + 999
            )?,
        }
    }
    let ranges = write_sheet(temp_dir.path(), "ranges.csv", &ranges);
    let invalids = write_sheet(temp_dir.path(), "invalids.csv", "Serial\nAA-5500\n");

    let outcome = run_import(&store, &ranges, &invalids)?;

    assert_eq!(outcome.report.ranges_inserted, 998);
    assert_eq!(outcome.report.invalids_inserted, 1);
    assert_eq!(outcome.report.total_errors, 2);
    assert!(outcome.report.errors[0].contains("Row 701 of sheet SERIALS"));
    assert!(outcome.report.errors[1].contains("Row 301 of sheet SERIALS"));
    assert!(outcome.collisions.is_clean());

    assert_eq!(store.all_ranges()?.len(), 998);

    let import_log = store.read_log(IMPORT_LOG)?.unwrap();
    assert!(import_log.starts_with("Inserted 998 serials and 1 invalids"));
    assert_eq!(import_log.lines().count(), 3);
    assert_eq!(
        store.read_log(DB_CHECK_LOG)?.as_deref(),
        Some("No problems found")
    );
    assert_eq!(store.read_log(DB_FILENAME_LOG)?.as_deref(), Some("test sheets"));

    let resolver = Resolver::new(store.clone(), Normalizer::default());
    let ok = resolver.check_serial("09120000000", "aa-1500")?;
    assert_eq!(ok.status, VerificationStatus::Ok);
    assert!(ok.answer.contains("REF-1"));

    let blocked = resolver.check_serial("09120000000", "AA5500")?;
    assert_eq!(blocked.status, VerificationStatus::Failure);

    let missing = resolver.check_serial("09120000000", "AA300500")?;
    assert_eq!(missing.status, VerificationStatus::NotFound);

    Ok(())
}

#[test]
fn test_collisions_are_written_to_db_check_log() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteRangeStore::open(temp_dir.path().join("serials.db"))?;

    let ranges = write_sheet(
        temp_dir.path(),
        "ranges.csv",
        &format!(
            "{}1,R1,A,AA100,AA200,\n2,R2,B,AA150,AA250,\n3,R3,C,BB9,BB1,\n4,R4,D,CC1,DD9,\n",
            RANGES_HEADER
        ),
    );
    let invalids = write_sheet(temp_dir.path(), "invalids.csv", "Serial\n");

    let outcome = run_import(&store, &ranges, &invalids)?;

    assert_eq!(outcome.report.ranges_inserted, 4);
    assert_eq!(outcome.collisions.collisions.len(), 1);
    assert_eq!(outcome.collisions.collisions[0].unordered(), (1, 2));
    assert_eq!(outcome.collisions.inverted, vec![3]);
    assert_eq!(outcome.collisions.mismatched_prefix, vec![4]);

    let db_check = store.read_log(DB_CHECK_LOG)?.unwrap();
    assert!(db_check.contains("there is a collision between row ids"));
    assert!(db_check.contains("Start serial of row 3 is after its end serial"));
    assert!(db_check.contains("row 4 start with different letters"));

    // both overlapping rows claim AA170
    let resolver = Resolver::new(store.clone(), Normalizer::default());
    assert_eq!(
        resolver.check_serial("admin", "AA170")?.status,
        VerificationStatus::Double
    );

    Ok(())
}

#[test]
fn test_reimport_replaces_previous_data() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteRangeStore::open(temp_dir.path().join("serials.db"))?;

    let first = write_sheet(
        temp_dir.path(),
        "first.csv",
        &format!("{}1,R1,A,AA100,AA200,2020-01-01\n", RANGES_HEADER),
    );
    let second = write_sheet(
        temp_dir.path(),
        "second.csv",
        &format!("{}1,R9,Z,ZZ100,ZZ200,2020-01-01\n", RANGES_HEADER),
    );
    let invalids = write_sheet(temp_dir.path(), "invalids.csv", "Serial\nAA150\n");
    let no_invalids = write_sheet(temp_dir.path(), "none.csv", "Serial\n");

    run_import(&store, &first, &invalids)?;
    let resolver = Resolver::new(store.clone(), Normalizer::default());
    assert_eq!(
        resolver.check_serial("admin", "AA150")?.status,
        VerificationStatus::Failure
    );

    run_import(&store, &second, &no_invalids)?;
    assert_eq!(
        resolver.check_serial("admin", "AA150")?.status,
        VerificationStatus::NotFound
    );
    assert_eq!(
        resolver.check_serial("admin", "zz-150")?.status,
        VerificationStatus::Ok
    );
    assert_eq!(store.all_ranges()?.len(), 1);

    Ok(())
}
