//! Age durations for cache cleanup: `30m`, `12h`, `7d`

use chrono::Duration;

use crate::error::{Error, Result};

/// Default `clean cache` age.
pub const DEFAULT_MAX_AGE: &str = "7d";

pub fn parse_age(input: &str) -> Result<Duration> {
    let text = input.trim();
    let invalid = || {
        Error::invalid_config(format!(
            "invalid age '{input}' (expected a number followed by m, h or d)"
        ))
    };
    let (split, _) = text.char_indices().last().ok_or_else(invalid)?;
    let (number, unit) = text.split_at(split);
    let amount: i64 = number.parse().map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }
    match unit {
        "m" => Ok(Duration::minutes(amount)),
        "h" => Ok(Duration::hours(amount)),
        "d" => Ok(Duration::days(amount)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("30m", Duration::minutes(30))]
    #[case("12h", Duration::hours(12))]
    #[case("7d", Duration::days(7))]
    #[case(" 1d ", Duration::days(1))]
    fn parses_ages(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_age(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("7")]
    #[case("d")]
    #[case("7w")]
    #[case("-1d")]
    #[case("1.5h")]
    fn rejects_bad_ages(#[case] input: &str) {
        assert!(parse_age(input).is_err());
    }
}
