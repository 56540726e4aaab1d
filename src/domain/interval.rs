//! Candle intervals and their provider-specific spellings

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H4,
        Interval::D1,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            Interval::M1 => 1,
            Interval::M5 => 5,
            Interval::M15 => 15,
            Interval::M30 => 30,
            Interval::H1 => 60,
            Interval::H4 => 240,
            Interval::D1 => 1440,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes() as u64 * 60)
    }

    /// Value of Birdeye's `type` query parameter
    pub fn birdeye_type(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1H",
            Interval::H4 => "4H",
            Interval::D1 => "1D",
        }
    }

    /// Value of Kraken's `interval` query parameter (minutes)
    pub fn kraken_minutes(&self) -> u32 {
        self.minutes()
    }

    /// Start of the interval bucket containing `at`
    pub fn floor(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.minutes() as i64 * 60;
        let ts = at.timestamp();
        let floored = ts - ts.rem_euclid(step);
        Utc.timestamp_opt(floored, 0).single().unwrap_or(at)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::M15
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == normalized)
            .ok_or_else(|| format!("unsupported interval '{}', expected one of 1m 5m 15m 30m 1h 4h 1d", s))
    }
}
