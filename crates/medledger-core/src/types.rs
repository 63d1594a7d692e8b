//! Billing value types.
//!
//! Both types have a single canonical textual form, which is what gets hashed
//! and signed. Parsing rejects anything that would not reproduce that text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Canonical date format: `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The calendar date of a billing event.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingDate(NaiveDate);

impl BillingDate {
    /// Create from a calendar date.
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Create from year, month and day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, CoreError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                CoreError::MalformedInput(format!("no such date: {year}-{month}-{day}"))
            })
    }

    /// Parse a date in canonical `YYYY-MM-DD` form.
    ///
    /// Non-canonical spellings such as `2021-3-14` are rejected, so the
    /// stored text always equals the text that was signed.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let date = NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|e| CoreError::MalformedInput(format!("invalid date {s:?}: {e}")))?;
        let parsed = Self(date);
        if parsed.canonical() != s {
            return Err(CoreError::MalformedInput(format!(
                "date {s:?} is not in canonical YYYY-MM-DD form"
            )));
        }
        Ok(parsed)
    }

    /// The canonical textual form.
    pub fn canonical(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }

    /// The underlying calendar date.
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Debug for BillingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BillingDate({})", self.canonical())
    }
}

impl fmt::Display for BillingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for BillingDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BillingDate {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<BillingDate> for String {
    fn from(date: BillingDate) -> Self {
        date.canonical()
    }
}

/// A non-negative currency amount, held as whole cents.
///
/// There is no floating-point path: the canonical form is always
/// `<units>.<two digits>`, independent of platform or locale.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount {
    cents: u64,
}

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self { cents: 0 };

    /// Create from a number of cents.
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    /// Create from whole units and cents (`cents` must be below 100).
    pub fn new(units: u64, cents: u64) -> Result<Self, CoreError> {
        if cents >= 100 {
            return Err(CoreError::MalformedInput(format!(
                "cents component out of range: {cents}"
            )));
        }
        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Self::from_cents)
            .ok_or_else(|| CoreError::MalformedInput("amount overflows".into()))
    }

    /// Parse decimal text with at most two fractional digits.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let malformed = |why: &str| CoreError::MalformedInput(format!("invalid amount {s:?}: {why}"));

        if s.starts_with('-') {
            return Err(malformed("amount must be non-negative"));
        }

        let (units, frac) = match s.split_once('.') {
            Some((units, frac)) => (units, frac),
            None => (s, ""),
        };

        if units.is_empty() {
            return Err(malformed("missing whole units"));
        }
        if !units.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("expected decimal digits"));
        }
        if s.contains('.') && frac.is_empty() {
            return Err(malformed("missing fractional digits"));
        }
        if frac.len() > 2 {
            return Err(malformed("more than two decimal places"));
        }

        let whole: u64 = units.parse().map_err(|_| malformed("amount overflows"))?;
        let cents = match frac.len() {
            0 => 0,
            1 => u64::from(frac.as_bytes()[0] - b'0') * 10,
            _ => u64::from(frac.as_bytes()[0] - b'0') * 10 + u64::from(frac.as_bytes()[1] - b'0'),
        };

        Self::new(whole, cents).map_err(|_| malformed("amount overflows"))
    }

    /// Total value in cents.
    pub const fn cents(&self) -> u64 {
        self.cents
    }

    /// The canonical two-decimal form.
    pub fn canonical(&self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.canonical())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_date_canonical() {
        let date = BillingDate::parse("2021-03-14").unwrap();
        assert_eq!(date.canonical(), "2021-03-14");
        assert_eq!(date, BillingDate::from_ymd(2021, 3, 14).unwrap());
    }

    #[test]
    fn test_date_rejects_non_canonical() {
        assert!(BillingDate::parse("2021-3-14").is_err());
        assert!(BillingDate::parse("14/03/2021").is_err());
        assert!(BillingDate::parse("2021-02-30").is_err());
        assert!(BillingDate::parse("").is_err());
        assert!(BillingDate::parse(" 2021-03-14").is_err());
    }

    #[test]
    fn test_date_serde_uses_canonical_text() {
        let date = BillingDate::parse("2021-03-14").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2021-03-14\"");
        assert!(serde_json::from_str::<BillingDate>("\"2021-3-14\"").is_err());
    }

    #[test]
    fn test_amount_parse() {
        assert_eq!(Amount::parse("128.50").unwrap().cents(), 12850);
        assert_eq!(Amount::parse("128.5").unwrap().cents(), 12850);
        assert_eq!(Amount::parse("128").unwrap().cents(), 12800);
        assert_eq!(Amount::parse("0.07").unwrap().cents(), 7);
        assert_eq!(Amount::parse("0").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_amount_rejects_malformed() {
        for bad in ["-1.00", "1.234", "", ".50", "12.", "1,50", "abc", "1e3", "+1.00"] {
            assert!(
                matches!(Amount::parse(bad), Err(CoreError::MalformedInput(_))),
                "accepted {bad:?}"
            );
        }
        assert!(Amount::parse("184467440737095516.16").is_err());
    }

    #[test]
    fn test_amount_canonical_two_decimals() {
        assert_eq!(Amount::from_cents(12850).canonical(), "128.50");
        assert_eq!(Amount::from_cents(12851).canonical(), "128.51");
        assert_eq!(Amount::from_cents(5).canonical(), "0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_amount_new_bounds() {
        assert_eq!(Amount::new(3, 99).unwrap().cents(), 399);
        assert!(Amount::new(3, 100).is_err());
        assert!(Amount::new(u64::MAX, 0).is_err());
    }

    proptest! {
        #[test]
        fn amount_canonical_reparses(cents in any::<u64>()) {
            let amount = Amount::from_cents(cents);
            prop_assert_eq!(Amount::parse(&amount.canonical()).unwrap(), amount);
        }

        #[test]
        fn date_canonical_reparses(days in 0i64..200_000) {
            let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + chrono::Duration::days(days);
            let billing = BillingDate::new(date);
            prop_assert_eq!(BillingDate::parse(&billing.canonical()).unwrap(), billing);
        }
    }
}
