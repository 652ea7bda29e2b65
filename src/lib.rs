pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{LogNotifier, SmsNotifier, SqliteRangeStore};
pub use app::{CallbackPayload, VerificationService};
pub use config::{AppConfig, AuthConfig};
pub use core::{
    collision::{CollisionDetector, CollisionReport},
    import_job::{ImportJob, ImportOutcome},
    importer::{BulkImporter, ImportSettings},
    normalizer::{normalize, Normalizer},
    resolver::Resolver,
};
pub use domain::model::{
    ImportReport, NormalizedCode, SerialLookup, SerialRange, Verification, VerificationStatus,
};
pub use utils::error::{Result, SerialError};
