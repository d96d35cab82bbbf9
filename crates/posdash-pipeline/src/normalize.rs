//! Normalization from stored business rows to [`NormalizedPosRecord`]s.
//!
//! Every step has a total default path: bad prices count as zero, missing
//! addresses become `"Unknown"`, an empty menu yields the default family.
//! The only record-level outcome besides success is being dropped for missing
//! coordinates.

use std::collections::BTreeSet;

use posdash_core::{BusinessType, NormalizedPosRecord, RawBusinessRecord, SubmissionData};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::address::decompose_address;
use crate::classify::{
    classify_product_family, resolve_business_type, volume_factor, DEFAULT_FAMILY,
};
use crate::menu::{aggregate, MenuItem};

/// Submitter shown for records that come from the scout network feed.
pub const SCOUT_USER_NAME: &str = "Scout Network";

const MIN_BASE_VOLUME: i64 = 10_000;
const CUSTOMER_POINTS: u32 = 50;
const POINTS_PER_MENU_ITEM: u32 = 10;

/// Normalizes every record that has both coordinates, preserving input order.
#[must_use]
pub fn normalize_records(records: &[RawBusinessRecord]) -> Vec<NormalizedPosRecord> {
    let normalized: Vec<_> = records.iter().filter_map(normalize_record).collect();
    let dropped = records.len() - normalized.len();
    if dropped > 0 {
        tracing::debug!(dropped, "skipped business rows without coordinates");
    }
    normalized
}

/// Normalizes one record, or returns `None` when a coordinate is missing.
#[must_use]
pub fn normalize_record(raw: &RawBusinessRecord) -> Option<NormalizedPosRecord> {
    let (latitude, longitude) = (raw.latitude?, raw.longitude?);

    let items: Vec<MenuItem<'_>> = raw.menu_items.iter().filter_map(MenuItem::from_json).collect();
    let totals = aggregate(&items);

    let mut families: BTreeSet<_> = items.iter().map(classify_product_family).collect();
    if families.is_empty() {
        families.insert(DEFAULT_FAMILY);
    }

    let business_type = resolve_business_type(raw.declared_type.as_deref(), raw.name.as_deref());
    let locality = decompose_address(raw.address.as_deref());

    let name = raw
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Business {}", raw.id));

    Some(NormalizedPosRecord {
        id: format!("biz_{}", raw.id),
        name,
        latitude,
        longitude,
        business_type,
        product_families: families.into_iter().collect(),
        sales_volume: estimate_sales_volume(totals.total_value, business_type),
        city: locality.city,
        country: locality.country,
        address: raw.address.clone().unwrap_or_default(),
        submission_data: SubmissionData {
            user_name: SCOUT_USER_NAME.to_string(),
            photo_url: None,
            points_earned: loyalty_points(raw.is_customer, raw.menu_items.len()),
            submitted_at: raw.last_activity_at,
            detected_products: raw.menu_items.clone(),
            is_danone_customer: raw.is_customer,
            menu_items: raw.menu_items.clone(),
            total_menu_items: raw.menu_items.len(),
            last_updated: raw.last_activity_at,
        },
    })
}

/// `max(total_value × 100, 10 000)` scaled by the channel factor, truncated.
///
/// Saturates at `i64::MAX` instead of overflowing.
#[must_use]
pub fn estimate_sales_volume(total_value: Decimal, business_type: BusinessType) -> i64 {
    let scaled = total_value
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::MAX);
    let base = scaled.max(Decimal::from(MIN_BASE_VOLUME));
    base.checked_mul(volume_factor(business_type))
        .unwrap_or(Decimal::MAX)
        .trunc()
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Customer bonus plus a fixed amount per menu list entry.
#[must_use]
pub fn loyalty_points(is_customer: bool, menu_entries: usize) -> u32 {
    let base = if is_customer { CUSTOMER_POINTS } else { 0 };
    u32::try_from(menu_entries)
        .unwrap_or(u32::MAX)
        .saturating_mul(POINTS_PER_MENU_ITEM)
        .saturating_add(base)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
