//! Requested wall-clock time in `HH:MM:SS` form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Run time string that is not strict zero-padded `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid run time '{0}': expected zero-padded hh:mm:ss")]
pub struct InvalidRunTime(pub String);

/// A requested or permitted run time, stored in seconds.
///
/// Hours take at least two digits; minutes and seconds exactly two, each
/// in `00..=59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunTime {
    seconds: u64,
}

impl RunTime {
    /// Largest run time accepted unless configured otherwise.
    pub const DEFAULT_CEILING: RunTime = RunTime {
        seconds: 999 * 3600 + 59 * 60 + 59,
    };

    pub const ZERO: RunTime = RunTime { seconds: 0 };

    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0
    }
}

fn two_digits(part: &str) -> Option<u64> {
    if part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit()) {
        part.parse().ok()
    } else {
        None
    }
}

impl FromStr for RunTime {
    type Err = InvalidRunTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidRunTime(s.to_string());

        let mut parts = s.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if hours.len() < 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hours: u64 = hours.parse().map_err(|_| invalid())?;
        let minutes = two_digits(minutes).filter(|m| *m < 60).ok_or_else(invalid)?;
        let seconds = two_digits(seconds).filter(|s| *s < 60).ok_or_else(invalid)?;

        let total = hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .ok_or_else(invalid)?;
        Ok(Self { seconds: total })
    }
}

impl TryFrom<String> for RunTime {
    type Error = InvalidRunTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunTime> for String {
    fn from(value: RunTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RunTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!("00:00:00".parse::<RunTime>().unwrap(), RunTime::ZERO);
        assert_eq!("01:00:00".parse::<RunTime>().unwrap().as_seconds(), 3600);
        assert_eq!("100:30:15".parse::<RunTime>().unwrap().as_seconds(), 361_815);
        assert_eq!("999:59:59".parse::<RunTime>().unwrap(), RunTime::DEFAULT_CEILING);
    }

    #[test]
    fn test_parse_rejects_loose_forms() {
        for bad in [
            "01", "01:00", "1:0:0", "1:00:00", "01:60:00", "01:00:60", "2 hours", "3600", "",
            "01:00:00:00", "aa:bb:cc", "-1:00:00", "01:0a:00",
        ] {
            assert!(bad.parse::<RunTime>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(RunTime::from_seconds(3661).to_string(), "01:01:01");
        assert_eq!(RunTime::DEFAULT_CEILING.to_string(), "999:59:59");
    }

    #[test]
    fn test_ordering_and_serde() {
        let short: RunTime = "00:30:00".parse().unwrap();
        let long: RunTime = "24:00:00".parse().unwrap();
        assert!(short < long);

        let json = serde_json::to_value(long).unwrap();
        assert_eq!(json, serde_json::json!("24:00:00"));
        let back: RunTime = serde_json::from_value(json).unwrap();
        assert_eq!(back, long);
        assert!(serde_json::from_value::<RunTime>(serde_json::json!("1:00")).is_err());
    }
}
