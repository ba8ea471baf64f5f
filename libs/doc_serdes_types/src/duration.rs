use std::fmt;
use std::str::FromStr;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// A calendar-aware duration, as stored by `duration` table columns.
///
/// Months and days are kept apart from the exact time part since their length
/// depends on the date they are applied to. All three parts share one sign.
///
/// Its short string form lists non-zero units from largest to smallest, like
/// `1y2mo3w4d5h6m7s8ms9us10ns`, with a leading `-` if negative.
///
/// ```
/// use doc_serdes_types::Duration;
///
/// let d: Duration = "1mo2d".parse()?;
/// assert_eq!(d, Duration::new(1, 2, 0)?);
/// assert_eq!(d.to_string(), "1mo2d");
/// # Ok::<(), doc_serdes_types::DurationError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Duration {
    months: i32,
    days: i32,
    nanoseconds: i64,
}

/// Errors creating or parsing a [`Duration`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DurationError {
    /// The parts had different signs.
    #[error("duration parts must not have mixed signs")]
    MixedSigns,
    /// The text was empty or only a sign.
    #[error("duration text is empty")]
    Empty,
    /// A unit wasn't preceded by a number.
    #[error("expected a number at `{0}`")]
    MissingNumber(String),
    /// A unit was not recognized.
    #[error("unknown duration unit `{0}`")]
    UnknownUnit(String),
    /// Units were repeated or not from largest to smallest.
    #[error("duration unit `{0}` is out of order")]
    UnitOrder(String),
    /// A part does not fit its field.
    #[error("duration is too large")]
    Overflow,
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Months,
    Days,
    Nanos,
}

/// Units in the order they must appear in, with the part they add to.
const UNITS: &[(&str, Part, i64)] = &[
    ("y", Part::Months, 12),
    ("mo", Part::Months, 1),
    ("w", Part::Days, 7),
    ("d", Part::Days, 1),
    ("h", Part::Nanos, NANOS_PER_HOUR),
    ("m", Part::Nanos, NANOS_PER_MINUTE),
    ("s", Part::Nanos, NANOS_PER_SECOND),
    ("ms", Part::Nanos, NANOS_PER_MILLI),
    ("us", Part::Nanos, NANOS_PER_MICRO),
    ("µs", Part::Nanos, NANOS_PER_MICRO),
    ("ns", Part::Nanos, 1),
];

impl Duration {
    /// Creates a duration from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError::MixedSigns`] if any two non-zero parts have
    /// different signs.
    pub const fn new(months: i32, days: i32, nanoseconds: i64) -> Result<Self, DurationError> {
        let any_negative = months < 0 || days < 0 || nanoseconds < 0;
        let any_positive = months > 0 || days > 0 || nanoseconds > 0;
        if any_negative && any_positive {
            return Err(DurationError::MixedSigns);
        }

        Ok(Self {
            months,
            days,
            nanoseconds,
        })
    }

    pub const fn months(self) -> i32 {
        self.months
    }

    pub const fn days(self) -> i32 {
        self.days
    }

    pub const fn nanoseconds(self) -> i64 {
        self.nanoseconds
    }

    pub const fn is_negative(self) -> bool {
        self.months < 0 || self.days < 0 || self.nanoseconds < 0
    }

    pub const fn is_zero(self) -> bool {
        self.months == 0 && self.days == 0 && self.nanoseconds == 0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0s");
        }

        if self.is_negative() {
            f.write_str("-")?;
        }

        let months = self.months.unsigned_abs();
        let days = self.days.unsigned_abs();
        let nanos = self.nanoseconds.unsigned_abs();

        let parts = [
            (u64::from(months / 12), "y"),
            (u64::from(months % 12), "mo"),
            (u64::from(days), "d"),
            (nanos / NANOS_PER_HOUR.unsigned_abs(), "h"),
            (nanos % NANOS_PER_HOUR.unsigned_abs() / NANOS_PER_MINUTE.unsigned_abs(), "m"),
            (nanos % NANOS_PER_MINUTE.unsigned_abs() / NANOS_PER_SECOND.unsigned_abs(), "s"),
            (nanos % NANOS_PER_SECOND.unsigned_abs() / NANOS_PER_MILLI.unsigned_abs(), "ms"),
            (nanos % NANOS_PER_MILLI.unsigned_abs() / NANOS_PER_MICRO.unsigned_abs(), "us"),
            (nanos % NANOS_PER_MICRO.unsigned_abs(), "ns"),
        ];

        for (amount, unit) in parts {
            if amount != 0 {
                write!(f, "{amount}{unit}")?;
            }
        }

        Ok(())
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, mut rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        if rest.is_empty() {
            return Err(DurationError::Empty);
        }

        let mut months = 0i64;
        let mut days = 0i64;
        let mut nanos = 0i64;
        let mut next_unit = 0usize;

        while !rest.is_empty() {
            let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let (digits, tail) = rest.split_at(digits_end);
            if digits.is_empty() {
                return Err(DurationError::MissingNumber(rest.to_owned()));
            }

            let unit_end = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_end);
            rest = tail;

            let Some(index) = UNITS.iter().position(|(u, ..)| *u == unit) else {
                return Err(DurationError::UnknownUnit(unit.to_owned()));
            };

            // `us` and `µs` share a rank
            let rank = if index > 8 { index - 1 } else { index };
            if rank < next_unit {
                return Err(DurationError::UnitOrder(unit.to_owned()));
            }
            next_unit = rank + 1;

            let amount = digits.parse::<i64>().map_err(|_| DurationError::Overflow)?;
            let (_, part, factor) = UNITS[index];
            let target = match part {
                Part::Months => &mut months,
                Part::Days => &mut days,
                Part::Nanos => &mut nanos,
            };

            let current = *target;
            *target = amount
                .checked_mul(factor)
                .and_then(|v| current.checked_add(v))
                .ok_or(DurationError::Overflow)?;
        }

        let sign = if negative { -1 } else { 1 };
        let months = i32::try_from(months * sign).map_err(|_| DurationError::Overflow)?;
        let days = i32::try_from(days * sign).map_err(|_| DurationError::Overflow)?;
        Self::new(months, days, nanos * sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Duration {
        s.parse().unwrap_or_else(|e| panic!("`{s}` must parse: {e}"))
    }

    #[test]
    fn display_short_form() {
        let d = Duration::new(14, 3, NANOS_PER_HOUR + 5 * NANOS_PER_MILLI + 7).expect("valid");
        assert_eq!(d.to_string(), "1y2mo3d1h5ms7ns", "all parts");
        assert_eq!(Duration::default().to_string(), "0s", "zero");

        let neg = Duration::new(0, -1, -NANOS_PER_SECOND).expect("valid");
        assert_eq!(neg.to_string(), "-1d1s", "negative");
    }

    #[test]
    fn parse_units() {
        assert_eq!(parse("1mo2d"), Duration::new(1, 2, 0).expect("valid"), "months and days");
        assert_eq!(parse("2w"), Duration::new(0, 14, 0).expect("valid"), "weeks");
        assert_eq!(parse("1y1mo"), Duration::new(13, 0, 0).expect("valid"), "years");
        assert_eq!(
            parse("3µs"),
            Duration::new(0, 0, 3 * NANOS_PER_MICRO).expect("valid"),
            "micro sign"
        );
        assert_eq!(
            parse("-1h30m"),
            Duration::new(0, 0, -(NANOS_PER_HOUR + 30 * NANOS_PER_MINUTE)).expect("valid"),
            "negative"
        );
        assert_eq!(parse("0s"), Duration::default(), "zero");
    }

    #[test]
    fn parse_errors() {
        let err = |s: &str| s.parse::<Duration>().expect_err("must not parse");

        assert_eq!(err(""), DurationError::Empty, "empty");
        assert_eq!(err("-"), DurationError::Empty, "sign only");
        assert_eq!(err("d"), DurationError::MissingNumber("d".to_owned()), "no number");
        assert_eq!(err("5"), DurationError::UnknownUnit(String::new()), "no unit");
        assert_eq!(err("5x"), DurationError::UnknownUnit("x".to_owned()), "bad unit");
        assert_eq!(err("1d1mo"), DurationError::UnitOrder("mo".to_owned()), "order");
        assert_eq!(err("1d1d"), DurationError::UnitOrder("d".to_owned()), "repeat");
        assert_eq!(err("1us1µs"), DurationError::UnitOrder("µs".to_owned()), "micro twice");
        assert_eq!(err("9999999999mo"), DurationError::Overflow, "too many months");
    }

    #[test]
    fn display_parse_round_trip() {
        for d in [
            Duration::new(25, 0, 0),
            Duration::new(0, 40, 1),
            Duration::new(-3, -2, -NANOS_PER_HOUR * 30),
            Duration::new(0, 0, i64::MAX),
        ] {
            let d = d.expect("valid");
            assert_eq!(parse(&d.to_string()), d, "round trip of {d}");
        }
    }

    #[test]
    fn mixed_signs_rejected() {
        assert_eq!(Duration::new(1, -1, 0), Err(DurationError::MixedSigns), "mixed");
    }
}
