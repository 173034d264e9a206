//! Bar timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of one bar in a data feed.
///
/// Serialized as its short code (`"1h"`, `"1d"`, ...). `1m` is one minute
/// and `1M` one month; every other code is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

const SESSIONS_PER_YEAR: f64 = 252.0;
const SECONDS_PER_DAY: u64 = 86_400;

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        }
    }

    /// Nominal bar length. A month counts as 30 days.
    pub fn seconds(&self) -> u64 {
        const MINUTE: u64 = 60;
        match self {
            Timeframe::Minute1 => MINUTE,
            Timeframe::Minute5 => 5 * MINUTE,
            Timeframe::Minute15 => 15 * MINUTE,
            Timeframe::Minute30 => 30 * MINUTE,
            Timeframe::Hour1 => 60 * MINUTE,
            Timeframe::Hour4 => 240 * MINUTE,
            Timeframe::Daily => SECONDS_PER_DAY,
            Timeframe::Weekly => 7 * SECONDS_PER_DAY,
            Timeframe::Monthly => 30 * SECONDS_PER_DAY,
        }
    }

    /// Bars per year for annualising returns and Sharpe ratios.
    ///
    /// Sub-daily bars assume a round-the-clock market over 252 sessions.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Timeframe::Weekly => 52.0,
            Timeframe::Monthly => 12.0,
            intraday_or_daily => {
                SESSIONS_PER_YEAR * SECONDS_PER_DAY as f64 / intraday_or_daily.seconds() as f64
            }
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let by_code = |code: &str| Self::ALL.into_iter().find(|tf| tf.code() == code);
        if let Some(tf) = by_code(s) {
            return Ok(tf);
        }

        let lower = s.to_ascii_lowercase();
        by_code(&lower)
            .or(match lower.as_str() {
                "1min" | "minute" => Some(Timeframe::Minute1),
                "5min" => Some(Timeframe::Minute5),
                "15min" => Some(Timeframe::Minute15),
                "30min" => Some(Timeframe::Minute30),
                "hour" | "hourly" => Some(Timeframe::Hour1),
                "day" | "daily" => Some(Timeframe::Daily),
                "week" | "weekly" => Some(Timeframe::Weekly),
                "month" | "monthly" => Some(Timeframe::Monthly),
                _ => None,
            })
            .ok_or_else(|| format!("unknown timeframe '{s}' (expected one of 1m 5m 15m 30m 1h 4h 1d 1w 1M)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>(), Ok(tf));
        }
    }

    #[test]
    fn test_minute_and_month_are_distinct() {
        assert_eq!("1m".parse::<Timeframe>(), Ok(Timeframe::Minute1));
        assert_eq!("1M".parse::<Timeframe>(), Ok(Timeframe::Monthly));
        assert_eq!("1H".parse::<Timeframe>(), Ok(Timeframe::Hour1));
        assert_eq!("Daily".parse::<Timeframe>(), Ok(Timeframe::Daily));
        assert!("2h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Timeframe::Hour4).unwrap();
        assert_eq!(json, "\"4h\"");
        let monthly: Timeframe = serde_json::from_str("\"1M\"").unwrap();
        assert_eq!(monthly, Timeframe::Monthly);
    }

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Timeframe::Daily.periods_per_year(), 252.0);
        assert_eq!(Timeframe::Hour1.periods_per_year(), 252.0 * 24.0);
        assert_eq!(Timeframe::Minute15.periods_per_year(), 252.0 * 96.0);
        assert_eq!(Timeframe::Weekly.periods_per_year(), 52.0);
        assert_eq!(Timeframe::Monthly.seconds(), 30 * 86_400);
    }
}
