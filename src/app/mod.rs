pub mod verification;

pub use verification::{CallbackPayload, VerificationService};
