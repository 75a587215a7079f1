//! Countdown arithmetic, quote selection and message rendering.
//!
//! Everything here is a pure function of its inputs. The only randomness is the
//! shuffle in [`pick`], which draws from the caller's RNG.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Raised when an occasion has nothing to choose from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("quote catalog is empty")]
    Empty,
}

/// Today's date in the fixed zone, paired with the target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownContext {
    pub current_date: NaiveDate,
    pub target_date: NaiveDate,
}

impl CountdownContext {
    /// Project `now` into `zone` and keep only the calendar date.
    pub fn new(now: DateTime<Utc>, zone: Tz, target_date: NaiveDate) -> Self {
        Self {
            current_date: now.with_timezone(&zone).date_naive(),
            target_date,
        }
    }

    /// Whole days from today until the target. Negative once the target has passed.
    pub fn days_remaining(&self) -> i64 {
        days_between(self.current_date, self.target_date)
    }
}

/// Whole days from `today` to `target`.
pub fn days_between(today: NaiveDate, target: NaiveDate) -> i64 {
    target.signed_duration_since(today).num_days()
}

/// Index into a catalog of `len` entries for the given day count.
///
/// Out-of-range counts (negative, or past the end) fall back to the last entry.
pub fn clamp_index(days_remaining: i64, len: usize) -> Result<usize, CatalogError> {
    if len == 0 {
        return Err(CatalogError::Empty);
    }
    match usize::try_from(days_remaining) {
        Ok(i) if i < len => Ok(i),
        _ => Ok(len - 1),
    }
}

/// Shuffle a copy of `catalog` and select the entry for `days_remaining`.
pub fn pick<R: Rng + ?Sized>(
    catalog: &[String],
    days_remaining: i64,
    rng: &mut R,
) -> Result<String, CatalogError> {
    let index = clamp_index(days_remaining, catalog.len())?;
    let mut shuffled = catalog.to_vec();
    shuffled.shuffle(rng);
    Ok(shuffled.swap_remove(index))
}

/// Outbound message text: the day count in bold, then the quote on its own line.
pub fn render(days_remaining: i64, quote: &str) -> String {
    format!("Tersisa *{days_remaining}* hari lagi,\n{quote}")
}
