//! Time normalization.
//!
//! Every time that enters the system (sheet cells, baseline files, published
//! wiki tokens) goes through [`Duration::parse`]. Values are held as integer
//! milliseconds so that `1:08.36` and `68.36` compare exactly; floats only
//! appear at the edge via [`Duration::as_secs_f64`].
//!
//! # Accepted shapes
//!
//! | Input            | Millis  | Timing   |
//! |------------------|---------|----------|
//! | `12.34`          | 12340   | RealTime |
//! | `1:08.36`        | 68360   | RealTime |
//! | `1:08.36 (IGT)`  | 68360   | InGame   |
//! | `9`              | 9000    | RealTime |

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Marker appended to the display form of in-game-time durations.
pub const IGT_MARKER: &str = "(IGT)";

/// Real-time vs in-game-time classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    #[default]
    RealTime,
    InGame,
}

impl Timing {
    pub fn is_in_game(&self) -> bool {
        matches!(self, Timing::InGame)
    }
}

/// A normalized duration plus the text it was parsed from.
///
/// Equality is value + timing. The display text is carried along for
/// rendering and never participates in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    millis: u64,
    timing: Timing,
    display: String,
}

impl Duration {
    /// Parse a textual duration (`12.34`, `1:08.36`, optionally `(IGT)`-suffixed).
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let trimmed = input.trim();
        let (body, timing) = match trimmed.strip_suffix(IGT_MARKER) {
            Some(rest) => (rest.trim_end(), Timing::InGame),
            None => (trimmed, Timing::RealTime),
        };

        let millis = parse_millis(body).ok_or_else(|| SyncError::MalformedDuration {
            input: input.to_string(),
        })?;

        let display = match timing {
            Timing::RealTime => body.to_string(),
            Timing::InGame => format!("{body} {IGT_MARKER}"),
        };

        Ok(Self { millis, timing, display })
    }

    /// Same value, reclassified as in-game time (display gains the marker).
    pub fn into_in_game(self) -> Self {
        if self.timing.is_in_game() {
            return self;
        }
        Self {
            display: format!("{} {IGT_MARKER}", self.display),
            timing: Timing::InGame,
            millis: self.millis,
        }
    }

    pub fn millis(&self) -> u64 {
        self.millis
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Full display form, including the IGT marker when present.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Display form without the IGT marker (`1:08.36` for `1:08.36 (IGT)`).
    pub fn display_bare(&self) -> &str {
        match self.display.strip_suffix(IGT_MARKER) {
            Some(rest) => rest.trim_end(),
            None => &self.display,
        }
    }

    /// Numeric ordering only; timing is ignored.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        self.millis.cmp(&other.millis)
    }

    pub fn is_faster_than(&self, other: &Self) -> bool {
        self.millis < other.millis
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis && self.timing == other.timing
    }
}

impl Eq for Duration {}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl std::str::FromStr for Duration {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Duration {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Duration> for String {
    fn from(value: Duration) -> Self {
        value.display
    }
}

/// `[m:]s[.fff]` to milliseconds, integer math only.
fn parse_millis(body: &str) -> Option<u64> {
    let parts: Vec<&str> = body.split(':').collect();
    match parts.as_slice() {
        [secs] => parse_seconds(secs),
        [mins, secs] => {
            let mins = parse_digits(mins)?;
            let secs = parse_seconds(secs)?;
            if secs >= 60_000 {
                return None;
            }
            mins.checked_mul(60_000)?.checked_add(secs)
        }
        _ => None,
    }
}

fn parse_seconds(s: &str) -> Option<u64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let whole = parse_digits(whole)?;
    let frac_millis = match frac.len() {
        0 => 0,
        1..=3 => {
            let f = parse_digits(frac)?;
            f * 10u64.pow(3 - frac.len() as u32)
        }
        _ => return None,
    };
    whole.checked_mul(1000)?.checked_add(frac_millis)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
