use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

/// Upper bound on elapsed seconds accepted before formatting (well inside chrono's range)
const MAX_ELAPSED_SECS: i64 = 1 << 40;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Clone, Copy)]
#[serde(transparent)]
pub struct Seconds(u64);
impl Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Seconds {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Seconds> for u64 {
    fn from(value: Seconds) -> Self {
        value.0
    }
}

impl From<Seconds> for Duration {
    fn from(value: Seconds) -> Self {
        Duration::from_secs(value.0)
    }
}

/// How long a print job ran, shown to users as `HH:MM:SS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime(chrono::Duration);

impl From<f64> for ElapsedTime {
    /// Fractional seconds are dropped. Negative and non-finite inputs count as zero.
    fn from(secs: f64) -> Self {
        let whole = if secs.is_finite() && secs > 0.0 {
            secs.min(MAX_ELAPSED_SECS as f64) as i64
        } else {
            0
        };
        Self(chrono::Duration::seconds(whole))
    }
}

impl Display for ElapsedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.0.num_seconds();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}
