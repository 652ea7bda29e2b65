use crate::domain::model::NormalizedCode;
use crate::utils::error::{Result, SerialError};

pub const DEFAULT_FIXED_LENGTH: usize = 30;

/// Maps Persian (U+06F0..) and Arabic-Indic (U+0660..) digits to ASCII.
fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '\u{06F0}'..='\u{06F9}' => char::from_digit(c as u32 - 0x06F0, 10),
        '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
        _ => None,
    }
}

/// Canonicalizes user-typed serials into a [`NormalizedCode`].
///
/// The importer and the resolver must share one instance configuration,
/// otherwise stored bounds and queried codes are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    fixed_length: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_LENGTH)
    }
}

impl Normalizer {
    pub fn new(fixed_length: usize) -> Self {
        Self { fixed_length }
    }

    pub fn fixed_length(&self) -> usize {
        self.fixed_length
    }

    pub fn normalize(&self, raw: &str) -> Result<NormalizedCode> {
        normalize(raw, self.fixed_length)
    }
}

/// Strips separators, upper-cases letters, folds foreign digits to ASCII and
/// pads between the alphabetic prefix and the digits up to `fixed_length`.
///
/// Letters always move in front of digits, so `"12-ab-3"` and `"AB123"`
/// normalize identically. Inputs with more than `fixed_length` significant
/// characters fail with [`SerialError::LengthOverflow`].
pub fn normalize(raw: &str, fixed_length: usize) -> Result<NormalizedCode> {
    let mut alpha = String::new();
    let mut digits = String::new();

    for c in raw.chars() {
        if c.is_ascii_alphabetic() {
            alpha.push(c.to_ascii_uppercase());
        } else if let Some(d) = ascii_digit(c) {
            digits.push(d);
        }
    }

    let length = alpha.len() + digits.len();
    if length > fixed_length {
        return Err(SerialError::LengthOverflow {
            length,
            max: fixed_length,
        });
    }

    let mut code = String::with_capacity(fixed_length);
    code.push_str(&alpha);
    code.extend(std::iter::repeat('0').take(fixed_length - length));
    code.push_str(&digits);

    Ok(NormalizedCode::from_normalized(code))
}

/// Rebuilds a code read back from storage, keeping its stored width.
pub(crate) fn restore(stored: &str) -> Result<NormalizedCode> {
    normalize(stored, stored.chars().count())
}
