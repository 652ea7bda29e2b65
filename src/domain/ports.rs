use crate::domain::model::{NormalizedCode, SerialLookup, SerialRange, VerificationRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistence for ranges, the block-list, named logs and verification records.
pub trait RangeStore: Send + Sync {
    type Session: ImportSession;

    /// Starts a new import generation. The previous generation stays visible
    /// to readers until [`ImportSession::finish`] swaps it out.
    fn begin_import(&self) -> Result<Self::Session>;

    fn all_ranges(&self) -> Result<Vec<SerialRange>>;

    /// Block-list membership plus every range with `start <= code <= end`,
    /// both taken from one snapshot of the active generation.
    fn lookup(&self, code: &NormalizedCode) -> Result<SerialLookup>;

    fn record_verification(&self, record: &VerificationRecord) -> Result<()>;

    fn recent_verifications(&self, limit: usize) -> Result<Vec<VerificationRecord>>;

    fn write_log(&self, name: &str, value: &str) -> Result<()>;

    fn read_log(&self, name: &str) -> Result<Option<String>>;
}

/// Write side of one import generation.
pub trait ImportSession {
    fn insert_range(&mut self, range: &SerialRange) -> Result<()>;

    fn insert_invalid(&mut self, code: &NormalizedCode) -> Result<()>;

    /// Commits pending rows and opens the next batch. On error the pending
    /// rows are discarded.
    fn commit(&mut self) -> Result<()>;

    /// Commits the tail batch and makes this generation the active one.
    fn finish(self) -> Result<()>;
}

/// Outbound text channel back to the person who asked.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, receptor: &str, message: &str) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn send(&self, receptor: &str, message: &str) -> Result<()> {
        (**self).send(receptor, message).await
    }
}
