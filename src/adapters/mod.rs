// Adapters layer: concrete implementations of the domain ports
// (SQLite storage, CSV sheets, SMS gateway).

pub mod notifier;
pub mod sheets;
pub mod sqlite;

pub use notifier::{LogNotifier, SmsNotifier};
pub use sqlite::{SqliteImportSession, SqliteRangeStore};
