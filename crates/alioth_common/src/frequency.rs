//! Frequency values with unit parsing and display.
//!
//! Used for both the model clock (`"242MHz"`) and UART line rates
//! (`"115200"`), so values are kept as whole Hertz and ratios between two
//! frequencies are computed with integer arithmetic.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A frequency value stored in whole Hertz.
///
/// Supports parsing from strings like "242MHz", "100KHz", "1GHz", "48000Hz",
/// and bare numeric values (interpreted as Hz). Fractional inputs such as
/// "1.8432MHz" are rounded to the nearest Hertz. Displays using the most
/// appropriate unit for readability.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Frequency(u64);

impl Frequency {
    /// Creates a new frequency from a value in Hertz.
    pub const fn from_hz(hz: u64) -> Self {
        Self(hz)
    }

    /// Creates a new frequency from a value in megahertz.
    pub const fn from_mhz(mhz: u64) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Returns the frequency in Hertz.
    pub const fn hz(&self) -> u64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Returns `true` if the frequency is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns how many periods of `self` fit into one period of `rate`,
    /// rounded half-up to the nearest integer.
    ///
    /// This is `floor(self / rate + 0.5)` computed without floating point.
    /// Returns `None` when `rate` is zero.
    pub fn cycles_per(&self, rate: Frequency) -> Option<u64> {
        if rate.0 == 0 {
            return None;
        }
        let num = 2 * u128::from(self.0) + u128::from(rate.0);
        let den = 2 * u128::from(rate.0);
        u64::try_from(num / den).ok()
    }

    /// Returns `self / rate` truncated toward zero, or `None` when `rate` is zero.
    pub fn cycles_per_floor(&self, rate: Frequency) -> Option<u64> {
        self.0.checked_div(rate.0)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0 as f64;
        if self.0 >= 1_000_000_000 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if self.0 >= 1_000_000 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if self.0 >= 1_000 {
            write!(f, "{}KHz", hz / 1_000.0)
        } else {
            write!(f, "{}Hz", self.0)
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

fn scaled(num: &str, scale: f64) -> Option<Frequency> {
    let val: f64 = num.trim().parse().ok()?;
    let hz = (val * scale).round();
    if !hz.is_finite() || hz < 0.0 || hz > u64::MAX as f64 {
        return None;
    }
    Some(Frequency(hz as u64))
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();

        let parsed = if let Some(num) = lower.strip_suffix("ghz") {
            scaled(num, 1_000_000_000.0)
        } else if let Some(num) = lower.strip_suffix("mhz") {
            scaled(num, 1_000_000.0)
        } else if let Some(num) = lower.strip_suffix("khz") {
            scaled(num, 1_000.0)
        } else if let Some(num) = lower.strip_suffix("hz") {
            scaled(num, 1.0)
        } else {
            scaled(&lower, 1.0)
        };

        parsed.ok_or_else(|| ParseFrequencyError {
            input: s.to_string(),
        })
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FrequencyVisitor;

        impl<'de> Visitor<'de> for FrequencyVisitor {
            type Value = Frequency;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a frequency in Hz or a string such as \"242MHz\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Frequency(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Frequency)
                    .map_err(|_| E::custom(format!("frequency cannot be negative: {v}")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                scaled(&v.to_string(), 1.0)
                    .ok_or_else(|| E::custom(format!("invalid frequency: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FrequencyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ghz() {
        let f: Frequency = "1GHz".parse().unwrap();
        assert_eq!(f.hz(), 1_000_000_000);
    }

    #[test]
    fn parse_mhz() {
        let f: Frequency = "242MHz".parse().unwrap();
        assert_eq!(f.hz(), 242_000_000);
    }

    #[test]
    fn parse_khz() {
        let f: Frequency = "100KHz".parse().unwrap();
        assert_eq!(f.hz(), 100_000);
    }

    #[test]
    fn parse_hz_and_bare_number() {
        assert_eq!("115200Hz".parse::<Frequency>().unwrap().hz(), 115_200);
        assert_eq!("115200".parse::<Frequency>().unwrap().hz(), 115_200);
    }

    #[test]
    fn parse_fractional_rounds_to_nearest_hz() {
        let f: Frequency = "1.8432MHz".parse().unwrap();
        assert_eq!(f.hz(), 1_843_200);
    }

    #[test]
    fn parse_case_insensitive() {
        let f: Frequency = "50mhz".parse().unwrap();
        assert_eq!(f.hz(), 50_000_000);
    }

    #[test]
    fn parse_invalid() {
        assert!("not_a_freq".parse::<Frequency>().is_err());
        assert!("-5MHz".parse::<Frequency>().is_err());
    }

    #[test]
    fn parse_error_display() {
        let err = "fast".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency: 'fast'");
    }

    #[test]
    fn cycles_per_rounds_half_up() {
        let clk = Frequency::from_mhz(242);
        assert_eq!(clk.cycles_per(Frequency::from_hz(115_200)), Some(2101));
        // 10 / 4 = 2.5 rounds up
        assert_eq!(Frequency::from_hz(10).cycles_per(Frequency::from_hz(4)), Some(3));
        // 9 / 4 = 2.25 rounds down
        assert_eq!(Frequency::from_hz(9).cycles_per(Frequency::from_hz(4)), Some(2));
    }

    #[test]
    fn cycles_per_zero_rate() {
        assert_eq!(Frequency::from_mhz(1).cycles_per(Frequency::from_hz(0)), None);
        assert_eq!(Frequency::from_mhz(1).cycles_per_floor(Frequency::from_hz(0)), None);
    }

    #[test]
    fn cycles_per_floor_truncates() {
        let clk = Frequency::from_mhz(242);
        assert_eq!(clk.cycles_per_floor(Frequency::from_hz(115_200)), Some(2100));
    }

    #[test]
    fn display_selects_best_unit() {
        assert_eq!(Frequency::from_hz(1_000_000_000).to_string(), "1GHz");
        assert_eq!(Frequency::from_mhz(242).to_string(), "242MHz");
        assert_eq!(Frequency::from_hz(115_200).to_string(), "115.2KHz");
        assert_eq!(Frequency::from_hz(500).to_string(), "500Hz");
    }

    #[derive(Deserialize)]
    struct Holder {
        f: Frequency,
    }

    #[test]
    fn deserialize_string_and_number() {
        let h: Holder = toml::from_str("f = \"242MHz\"").unwrap();
        assert_eq!(h.f.hz(), 242_000_000);
        let h: Holder = toml::from_str("f = 115200").unwrap();
        assert_eq!(h.f.hz(), 115_200);
        assert!(toml::from_str::<Holder>("f = -1").is_err());
    }
}
