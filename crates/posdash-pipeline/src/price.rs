//! Price-string parsing for detected menu prices.

use std::str::FromStr;

use rust_decimal::Decimal;

const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£'];

/// Parses a detected price such as `"€2.50"` or `"2,50 €"` into a decimal.
///
/// Currency symbols are stripped and a comma decimal separator becomes a dot.
/// Returns `None` for anything that still fails to parse afterwards, including
/// strings with thousands separators like `"1.234,50"`.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}
