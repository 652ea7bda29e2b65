use crate::core::normalizer::Normalizer;
use crate::domain::model::{
    NormalizedCode, SerialRange, Verification, VerificationRecord, VerificationStatus,
};
use crate::domain::ports::RangeStore;
use crate::utils::error::{Result, SerialError};
use chrono::Utc;

fn failure_answer(raw: &str) -> String {
    format!(
        "{} is not a genuine serial. This product is registered as counterfeit.",
        raw
    )
}

fn not_found_answer(raw: &str) -> String {
    format!(
        "{} was not found. Please check the serial and try again.",
        raw
    )
}

fn ok_answer(range: &SerialRange) -> String {
    format!(
        "Genuine product. Reference: {}, {}, issued {}",
        range.reference,
        range.description,
        range.issued.format("%Y-%m-%d")
    )
}

const DOUBLE_ANSWER: &str =
    "This serial matches more than one product record. Please contact support.";

/// Classifies incoming serials against the block-list and the active ranges.
///
/// Every call leaves one [`VerificationRecord`] behind, including calls whose
/// input could not be normalized.
#[derive(Debug, Clone)]
pub struct Resolver<S: RangeStore> {
    store: S,
    normalizer: Normalizer,
}

impl<S: RangeStore> Resolver<S> {
    pub fn new(store: S, normalizer: Normalizer) -> Self {
        Self { store, normalizer }
    }

    pub fn check_serial(&self, sender: &str, raw: &str) -> Result<Verification> {
        let normalized = match self.normalizer.normalize(raw) {
            Ok(code) => Some(code),
            Err(SerialError::LengthOverflow { length, max }) => {
                tracing::debug!("Serial from {} too long ({} > {})", sender, length, max);
                None
            }
            Err(e) => return Err(e),
        };

        let verification = match &normalized {
            Some(code) => self.classify(raw, code)?,
            None => Verification {
                status: VerificationStatus::NotFound,
                answer: not_found_answer(raw),
            },
        };

        self.store.record_verification(&VerificationRecord {
            status: verification.status,
            sender: sender.to_string(),
            raw_message: raw.to_string(),
            normalized: normalized.map(|code| code.to_string()),
            answer: verification.answer.clone(),
            timestamp: Utc::now(),
        })?;

        tracing::info!(
            status = %verification.status,
            sender = sender,
            "Serial checked"
        );
        Ok(verification)
    }

    fn classify(&self, raw: &str, code: &NormalizedCode) -> Result<Verification> {
        // 黑名單與區間必須來自同一個世代
        let lookup = self.store.lookup(code)?;
        if lookup.blocked {
            return Ok(Verification {
                status: VerificationStatus::Failure,
                answer: failure_answer(raw),
            });
        }

        let verification = match lookup.ranges.as_slice() {
            [] => Verification {
                status: VerificationStatus::NotFound,
                answer: not_found_answer(raw),
            },
            [range] => Verification {
                status: VerificationStatus::Ok,
                answer: ok_answer(range),
            },
            several => {
                tracing::warn!(
                    "Serial {} matches {} ranges; collision left unresolved",
                    code,
                    several.len()
                );
                Verification {
                    status: VerificationStatus::Double,
                    answer: DOUBLE_ANSWER.to_string(),
                }
            }
        };
        Ok(verification)
    }
}
