//! Decimal digit counting over the textual form of a number.
//!
//! Works on the decimal text rather than a float so `0.1` counts one fraction
//! digit and arbitrarily long values keep every digit. Trailing fractional
//! zeros are stripped first: `100.50` and `100.5` count the same.
use crate::constraint::Digits;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigitCounts {
    pub integer: u32,
    pub fraction: u32,
}

impl DigitCounts {
    /// Parse `[+-]digits[.digits][(e|E)[+-]digits]`. `None` for anything else
    /// (including `NaN` and `inf`).
    ///
    /// Reads the value as `unscaled × 10^-scale` with the unscaled digits
    /// stripped of leading and trailing zeros; then
    /// `integer = max(precision - scale, 0)` and `fraction = max(scale, 0)`.
    pub fn of(text: &str) -> Option<Self> {
        let s = text.trim();
        let s = s.strip_prefix(['-', '+']).unwrap_or(s);
        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(i) => (&s[..i], s[i + 1..].parse::<i64>().ok()?),
            None => (s, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let unscaled = format!("{int_part}{frac_part}");
        let significant = unscaled.trim_start_matches('0');
        if significant.is_empty() {
            // zero: one integer digit, scale 0
            return Some(Self { integer: 1, fraction: 0 });
        }
        let stripped = significant.trim_end_matches('0');
        let precision = stripped.len() as i64;
        let scale = (frac_part.len() as i64)
            .saturating_sub(exponent)
            .saturating_sub((significant.len() - stripped.len()) as i64);

        Some(Self {
            integer: clamp(precision.saturating_sub(scale)),
            fraction: clamp(scale),
        })
    }

    /// Which sides exceed the bounds of `digits`: `(integer, fraction)`.
    pub fn exceeds(&self, digits: &Digits) -> (bool, bool) {
        (
            digits.integer.is_some_and(|max| self.integer > max),
            digits.fraction.is_some_and(|max| self.fraction > max),
        )
    }
}

fn clamp(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}
