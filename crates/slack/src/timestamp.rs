//! Slack message timestamps (`"1533028651.000211"`): whole seconds plus a
//! six-digit microsecond part.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MICROS_PER_SECOND: i64 = 1_000_000;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("invalid slack timestamp `{0}`")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlackTimestamp {
    micros: i64,
}

impl SlackTimestamp {
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn seconds(&self) -> i64 {
        self.micros.div_euclid(MICROS_PER_SECOND)
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }
}

impl FromStr for SlackTimestamp {
    type Err = TimestampError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TimestampError::Invalid(value.to_owned());
        let trimmed = value.trim();
        let (secs, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if secs.is_empty() || !secs.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 6 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }

        let secs = secs.parse::<i64>().map_err(|_| invalid())?;
        // "5.1" means 5.100000, not 5.000001
        let padded = format!("{fraction:0<6}");
        let fraction = padded.parse::<i64>().map_err(|_| invalid())?;

        secs.checked_mul(MICROS_PER_SECOND)
            .and_then(|micros| micros.checked_add(fraction))
            .map(Self::from_micros)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for SlackTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.micros.div_euclid(MICROS_PER_SECOND),
            self.micros.rem_euclid(MICROS_PER_SECOND)
        )
    }
}
