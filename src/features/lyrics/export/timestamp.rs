//! Timestamp formatting for LRC and SRT output

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fractional digits of an LRC timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// `mm:ss.xx`
    #[default]
    Centis,
    /// `mm:ss.xxx`
    Millis,
}

impl Precision {
    /// Milliseconds per fractional unit
    pub fn unit_ms(&self) -> u64 {
        match self {
            Precision::Centis => 10,
            Precision::Millis => 1,
        }
    }

    fn digits(&self) -> usize {
        match self {
            Precision::Centis => 2,
            Precision::Millis => 3,
        }
    }

    fn units_per_second(&self) -> u64 {
        1000 / self.unit_ms()
    }
}

/// An `mm:ss.ff` / `mm:ss.fff` timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LrcTimestamp {
    minutes: u64,
    seconds: u64,
    fraction: u64,
    precision: Precision,
}

impl LrcTimestamp {
    /// Truncates below the precision's unit
    pub fn from_millis(ms: u64, precision: Precision) -> Self {
        Self {
            minutes: ms / 60_000,
            seconds: (ms / 1000) % 60,
            fraction: (ms % 1000) / precision.unit_ms(),
            precision,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.minutes
            .saturating_mul(60_000)
            .saturating_add(self.seconds * 1000 + self.fraction * self.precision.unit_ms())
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// One fractional unit earlier
    ///
    /// Borrows across seconds and minutes; rolling under zero minutes clamps to 59.
    pub fn decremented(&self) -> Self {
        let mut next = *self;
        if next.fraction > 0 {
            next.fraction -= 1;
            return next;
        }
        next.fraction = self.precision.units_per_second() - 1;
        if next.seconds > 0 {
            next.seconds -= 1;
            return next;
        }
        next.seconds = 59;
        next.minutes = if next.minutes > 0 { next.minutes - 1 } else { 59 };
        next
    }
}

impl fmt::Display for LrcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}.{:0width$}",
            self.minutes,
            self.seconds,
            self.fraction,
            width = self.precision.digits()
        )
    }
}

impl FromStr for LrcTimestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid LRC timestamp: {s}");
        let s = s.trim().trim_start_matches(['[', '<']).trim_end_matches([']', '>']);
        let (minutes, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (seconds, fraction) = rest.split_once(['.', ':']).ok_or_else(invalid)?;
        let precision = match fraction.len() {
            2 => Precision::Centis,
            3 => Precision::Millis,
            _ => return Err(invalid()),
        };

        let timestamp = Self {
            minutes: minutes.parse().map_err(|_| invalid())?,
            seconds: seconds.parse().map_err(|_| invalid())?,
            fraction: fraction.parse().map_err(|_| invalid())?,
            precision,
        };
        if timestamp.seconds >= 60 {
            return Err(invalid());
        }
        Ok(timestamp)
    }
}

/// `mm:ss.ff` or `mm:ss.fff` for `ms`
pub fn format_lrc_time(ms: u64, precision: Precision) -> String {
    LrcTimestamp::from_millis(ms, precision).to_string()
}

/// `HH:MM:SS,mmm` for `ms`
pub fn format_srt_time(ms: u64) -> String {
    let millis = ms % 1000;
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = ms / 3_600_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lrc_time() {
        assert_eq!(format_lrc_time(1120, Precision::Centis), "00:01.12");
        assert_eq!(format_lrc_time(1129, Precision::Centis), "00:01.12");
        assert_eq!(format_lrc_time(61_005, Precision::Millis), "01:01.005");
        assert_eq!(format_lrc_time(6_000_000, Precision::Centis), "100:00.00");
    }

    #[test]
    fn test_decrement_borrow() {
        let t = LrcTimestamp::from_millis(61_000, Precision::Centis);
        assert_eq!(t.decremented().to_string(), "01:00.99");

        let t = LrcTimestamp::from_millis(60_000, Precision::Millis);
        assert_eq!(t.decremented().to_string(), "00:59.999");

        let t = LrcTimestamp::from_millis(1_230, Precision::Centis);
        assert_eq!(t.decremented().to_string(), "00:01.22");
    }

    #[test]
    fn test_decrement_roll_under() {
        let t = LrcTimestamp::from_millis(0, Precision::Centis);
        assert_eq!(t.decremented().to_string(), "59:59.99");
    }

    #[test]
    fn test_parse_round_trip() {
        let t: LrcTimestamp = "[03:07.25]".parse().unwrap();
        assert_eq!(t.as_millis(), 187_250);
        assert_eq!(t.precision(), Precision::Centis);
        assert_eq!("<00:01.005>".parse::<LrcTimestamp>().unwrap().as_millis(), 1005);
        assert!("00:61.00".parse::<LrcTimestamp>().is_err());
        assert!("nonsense".parse::<LrcTimestamp>().is_err());
        let big: LrcTimestamp = "999999999999999999:00.00".parse().unwrap();
        assert_eq!(big.as_millis(), u64::MAX);
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(3_723_004), "01:02:03,004");
    }
}
