//! Keyword rule tables for product families, business types, and volume factors.
//!
//! Each table is walked top to bottom and the first matching rule wins, so
//! reordering entries changes classification output.

use posdash_core::{BusinessType, ProductFamily};
use rust_decimal::Decimal;

use crate::menu::MenuItem;

/// `(category keywords, product-name keywords, family)`; a rule matches when
/// any category keyword or any product-name keyword is contained.
const FAMILY_RULES: &[(&[&str], &[&str], ProductFamily)] = &[
    (
        &["water"],
        &["evian", "volvic", "badoit"],
        ProductFamily::Waters,
    ),
    (
        &["yogurt", "yoghurt", "dessert"],
        &[],
        ProductFamily::YogurtAndDesserts,
    ),
    (
        &[],
        &["baby", "infant", "formula"],
        ProductFamily::BabyNutrition,
    ),
    (
        &[],
        &["plant", "oat", "almond", "soy"],
        ProductFamily::PlantBased,
    ),
    (
        &[],
        &["medical", "nutrition", "health"],
        ProductFamily::MedicalNutrition,
    ),
];

const FALLBACK_FAMILY: ProductFamily = ProductFamily::DairyAlternatives;

/// Family assigned to a record whose menu yields no classifiable items.
pub const DEFAULT_FAMILY: ProductFamily = ProductFamily::Waters;

/// Name keywords used when no usable business type was declared.
const NAME_RULES: &[(&[&str], BusinessType)] = &[
    (&["hypermarket", "hyper"], BusinessType::Hypermarket),
    (&["supermarket", "super"], BusinessType::Supermarket),
    (
        &["convenience", "corner", "mini"],
        BusinessType::ConvenienceStore,
    ),
    (&["pharmacy", "pharma"], BusinessType::Pharmacy),
    (
        &["café", "cafe", "restaurant", "bistro"],
        BusinessType::Restaurant,
    ),
];

const FALLBACK_BUSINESS_TYPE: BusinessType = BusinessType::Restaurant;

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classifies a single menu item into a product family.
#[must_use]
pub fn classify_product_family(item: &MenuItem<'_>) -> ProductFamily {
    let category = item.category.to_lowercase();
    let product_name = item.product_name.to_lowercase();

    FAMILY_RULES
        .iter()
        .find(|(category_keywords, name_keywords, _)| {
            contains_any(&category, category_keywords) || contains_any(&product_name, name_keywords)
        })
        .map_or(FALLBACK_FAMILY, |&(_, _, family)| family)
}

/// Resolves the business type from the declared value, falling back to
/// keywords in the business name.
///
/// A declared value is used when it names a member of the closed set. Absent,
/// blank, `"unknown"` (any case), or unrecognized declarations fall through
/// to name inference.
#[must_use]
pub fn resolve_business_type(declared: Option<&str>, name: Option<&str>) -> BusinessType {
    if let Some(declared) = declared.and_then(BusinessType::from_label) {
        return declared;
    }
    infer_business_type(name.unwrap_or(""))
}

/// Infers a business type from keywords in the business name.
#[must_use]
pub fn infer_business_type(name: &str) -> BusinessType {
    let name = name.to_lowercase();
    NAME_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&name, keywords))
        .map_or(FALLBACK_BUSINESS_TYPE, |&(_, business_type)| business_type)
}

/// Sales-volume multiplier for a channel.
#[must_use]
pub fn volume_factor(business_type: BusinessType) -> Decimal {
    match business_type {
        BusinessType::Hypermarket => Decimal::from(4),
        BusinessType::Supermarket => Decimal::from(2),
        BusinessType::Restaurant => Decimal::new(15, 1),
        BusinessType::ConvenienceStore
        | BusinessType::Pharmacy
        | BusinessType::BabyStore
        | BusinessType::HealthFoodStore
        | BusinessType::OnlineRetailer => Decimal::ONE,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn family_of(value: &serde_json::Value) -> ProductFamily {
        classify_product_family(&MenuItem::from_json(value).expect("object"))
    }

    #[test]
    fn water_category_beats_every_other_keyword() {
        let value = json!({"category": "Water", "productName": "Evian 1L baby formula"});
        assert_eq!(family_of(&value), ProductFamily::Waters);
    }

    #[test]
    fn water_brand_in_name_without_water_category() {
        let value = json!({"category": "Drinks", "productName": "Badoit Rouge"});
        assert_eq!(family_of(&value), ProductFamily::Waters);
    }

    #[test]
    fn dessert_category_beats_name_keywords() {
        let value = json!({"category": "Desserts", "productName": "Oat crumble"});
        assert_eq!(family_of(&value), ProductFamily::YogurtAndDesserts);
    }

    #[test]
    fn name_rules_apply_in_order() {
        assert_eq!(
            family_of(&json!({"productName": "Infant formula"})),
            ProductFamily::BabyNutrition
        );
        assert_eq!(
            family_of(&json!({"productName": "Alpro Soy"})),
            ProductFamily::PlantBased
        );
        assert_eq!(
            family_of(&json!({"productName": "Fortimel Medical"})),
            ProductFamily::MedicalNutrition
        );
        // "baby" outranks "oat"
        assert_eq!(
            family_of(&json!({"productName": "Baby oat porridge"})),
            ProductFamily::BabyNutrition
        );
    }

    #[test]
    fn unmatched_item_is_dairy_alternative() {
        assert_eq!(
            family_of(&json!({"category": "Cheese", "productName": "Brie"})),
            ProductFamily::DairyAlternatives
        );
        assert_eq!(family_of(&json!({})), ProductFamily::DairyAlternatives);
    }

    #[test]
    fn declared_type_wins_when_recognized() {
        assert_eq!(
            resolve_business_type(Some("pharmacy"), Some("Super Hyper Mart")),
            BusinessType::Pharmacy
        );
    }

    #[test]
    fn declared_unknown_falls_through_to_name() {
        assert_eq!(
            resolve_business_type(Some("UnKnOwN"), Some("Carrefour Hypermarket")),
            BusinessType::Hypermarket
        );
        assert_eq!(
            resolve_business_type(None, Some("Corner Shop")),
            BusinessType::ConvenienceStore
        );
        assert_eq!(
            resolve_business_type(Some(""), Some("Pharma Plus")),
            BusinessType::Pharmacy
        );
    }

    #[test]
    fn unrecognized_declaration_falls_through_to_name() {
        assert_eq!(
            resolve_business_type(Some("Bakery"), Some("Le Petit Bistro")),
            BusinessType::Restaurant
        );
    }

    #[test]
    fn name_inference_precedence_and_default() {
        assert_eq!(infer_business_type("HYPER U"), BusinessType::Hypermarket);
        assert_eq!(infer_business_type("Super U"), BusinessType::Supermarket);
        assert_eq!(infer_business_type("Mini Market"), BusinessType::ConvenienceStore);
        assert_eq!(infer_business_type("CAFÉ DE FLORE"), BusinessType::Restaurant);
        assert_eq!(infer_business_type("Chez Paul"), BusinessType::Restaurant);
        assert_eq!(infer_business_type(""), BusinessType::Restaurant);
    }

    #[test]
    fn volume_factors_follow_channel() {
        assert_eq!(volume_factor(BusinessType::Hypermarket), Decimal::from(4));
        assert_eq!(volume_factor(BusinessType::Supermarket), Decimal::from(2));
        assert_eq!(volume_factor(BusinessType::Restaurant), Decimal::new(15, 1));
        assert_eq!(volume_factor(BusinessType::Pharmacy), Decimal::ONE);
    }
}
