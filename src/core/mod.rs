pub mod collision;
pub mod import_job;
pub mod importer;
pub mod normalizer;
pub mod resolver;

pub use crate::domain::model::{
    ImportReport, InvalidRow, NormalizedCode, RangeRow, SerialLookup, SerialRange, Verification,
    VerificationRecord, VerificationStatus,
};
pub use crate::domain::ports::{ImportSession, Notifier, RangeStore};
pub use crate::utils::error::Result;
