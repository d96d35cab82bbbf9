//! Read-only view over stored menu-item JSON and the per-record totals.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::price::parse_price;

/// Price assumed when an item carries no `detectedPrice` at all.
const DEFAULT_PRICE: &str = "€0";

/// Floats at or above 2^53 no longer hold every integer exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Non-negative whole-number count, accepting floats such as `2.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        let f = value.as_f64()?;
        (f >= 0.0 && f.fract() == 0.0 && f < MAX_EXACT_FLOAT).then(|| f as u64)
    })
}

/// Borrowed view of one menu-item object.
///
/// The stored entries are loosely shaped JSON; every field is optional and a
/// wrongly-typed field behaves like an unreadable one instead of failing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuItem<'a> {
    pub category: &'a str,
    pub product_name: &'a str,
    detected_price: Option<&'a str>,
    times_detected: Option<u64>,
}

impl<'a> MenuItem<'a> {
    /// Returns `None` when the entry is not a JSON object.
    #[must_use]
    pub fn from_json(value: &'a Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).unwrap_or("");

        let detected_price = match obj.get("detectedPrice") {
            None => Some(DEFAULT_PRICE),
            Some(v) => v.as_str(),
        };
        let times_detected = match obj.get("timesDetected") {
            None => Some(1),
            Some(v) => whole_count(v),
        };

        Some(Self {
            category: text("category"),
            product_name: text("productName"),
            detected_price,
            times_detected,
        })
    }

    /// `(detections, value)` contributed by this item, or `None` when the
    /// price or count cannot be read.
    #[must_use]
    pub fn detection(&self) -> Option<(u64, Decimal)> {
        let price = parse_price(self.detected_price?)?;
        let times = self.times_detected?;
        let value = price.checked_mul(Decimal::from(times))?;
        Some((times, value))
    }
}

/// Running totals across a record's menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuTotals {
    pub item_count: u64,
    pub total_value: Decimal,
}

/// Sums detections and value over every readable item.
///
/// Unreadable items contribute zero to both totals.
#[must_use]
pub fn aggregate<'a, I>(items: I) -> MenuTotals
where
    I: IntoIterator<Item = &'a MenuItem<'a>>,
{
    items
        .into_iter()
        .filter_map(MenuItem::detection)
        .fold(MenuTotals::default(), |mut totals, (times, value)| {
            totals.item_count = totals.item_count.saturating_add(times);
            totals.total_value = totals
                .total_value
                .checked_add(value)
                .unwrap_or(totals.total_value);
            totals
        })
}
