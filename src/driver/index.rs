//! Index validation.

use crate::types::errors::ComputeError;

/// Largest index whose value fits in a `u128`.
pub const MAX_INDEX: u64 = 186;

/// Checks that a signed index is usable.
pub fn validate_index(n: i64) -> Result<u64, ComputeError> {
    let index = u64::try_from(n)
        .map_err(|_| ComputeError::invalid_index(format!("index must be non-negative, got {n}")))?;
    check_index(index)
}

/// Rejects indices past [`MAX_INDEX`] with [`ComputeError::Overflow`].
pub fn check_index(index: u64) -> Result<u64, ComputeError> {
    if index > MAX_INDEX {
        return Err(ComputeError::Overflow(index));
    }
    Ok(index)
}

/// Parses an index supplied as text.
///
/// Only plain decimal integers are accepted. Fractions, exponents, empty input
/// and negative numbers are rejected, and so is anything past [`MAX_INDEX`].
pub fn parse_index(input: &str) -> Result<u64, ComputeError> {
    let trimmed = input.trim();
    let n: i64 = trimmed.parse().map_err(|_| {
        ComputeError::invalid_index(format!("'{trimmed}' is not a valid integer index"))
    })?;
    validate_index(n)
}
