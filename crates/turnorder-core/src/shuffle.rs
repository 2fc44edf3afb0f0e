#![forbid(unsafe_code)]

//! Count-entry mode: player-count validation and shuffled turn orders.

use std::num::NonZeroUsize;

use crate::random::RandomSource;

/// Unbiased in-place Fisher-Yates shuffle.
pub fn shuffle_in_place<T, R: RandomSource + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        // i + 1 >= 2, never zero.
        let Some(bound) = NonZeroUsize::new(i + 1) else {
            continue;
        };
        let j = rng.next_index(bound);
        items.swap(i, j);
    }
}

/// Shuffled sequence `1..=player_count`.
#[must_use]
pub fn generate_turn_order<R: RandomSource + ?Sized>(player_count: u32, rng: &mut R) -> Vec<u32> {
    let mut order: Vec<u32> = (1..=player_count).collect();
    shuffle_in_place(&mut order, rng);
    order
}

/// Render an order as `"3, 1, 2"`.
#[must_use]
pub fn format_turn_order(order: &[u32]) -> String {
    order
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a typed player count was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCountError {
    Empty,
    NotWholeNumber,
    BelowMinimum { min: u32 },
    AboveMaximum { max: u32 },
}

impl core::fmt::Display for PlayerCountError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("Please enter a number of players"),
            Self::NotWholeNumber => f.write_str("Only whole numbers are accepted"),
            Self::BelowMinimum { min } => write!(f, "Minimum is {min} players"),
            Self::AboveMaximum { max } => write!(f, "Maximum is {max} players"),
        }
    }
}

impl std::error::Error for PlayerCountError {}

/// Parse a typed player count.
///
/// Surrounding whitespace is ignored. The remainder must be the canonical
/// decimal form of the number: `"05"`, `"+3"`, and `"3.0"` are all refused.
pub fn parse_player_count(text: &str, min: u32, max: u32) -> Result<u32, PlayerCountError> {
    let value = text.trim();
    if value.is_empty() {
        return Err(PlayerCountError::Empty);
    }
    let negative = value.starts_with('-');
    let digits = value.strip_prefix('-').unwrap_or(value);
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if !canonical {
        return Err(PlayerCountError::NotWholeNumber);
    }
    if negative {
        return Err(PlayerCountError::BelowMinimum { min });
    }
    // Canonical digit strings too long for u32 are necessarily above max.
    let count = digits
        .parse::<u32>()
        .map_err(|_| PlayerCountError::AboveMaximum { max })?;
    if count < min {
        return Err(PlayerCountError::BelowMinimum { min });
    }
    if count > max {
        return Err(PlayerCountError::AboveMaximum { max });
    }
    Ok(count)
}
