//! Race duration parsing.
//!
//! Race times and gaps are published as `H:MM:SS` strings with an unbounded
//! hour part.

use crate::constants::DURATION_SEPARATOR;
use crate::error::{RaceError, Result};

/// Parse an `H:MM:SS` duration into total seconds
pub fn parse_duration(text: &str) -> Result<u64> {
    let parts: Vec<&str> = text.trim().split(DURATION_SEPARATOR).collect();
    if parts.len() != 3 {
        return Err(RaceError::format(
            text,
            format!("expected H:MM:SS, found {} component(s)", parts.len()),
        ));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u64>()
            .map_err(|e| RaceError::format(text, format!("'{}' is not a number: {}", part, e)))?;
    }

    let [hours, minutes, seconds] = numbers;
    if minutes >= 60 || seconds >= 60 {
        return Err(RaceError::format(text, "minutes and seconds must be below 60"));
    }

    Ok(hours * 3600 + minutes * 60 + seconds)
}
