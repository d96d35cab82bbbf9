use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retail channel classification of a point of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BusinessType {
    Hypermarket,
    Supermarket,
    #[serde(rename = "Convenience Store")]
    ConvenienceStore,
    Pharmacy,
    Restaurant,
    #[serde(rename = "Baby Store")]
    BabyStore,
    #[serde(rename = "Health Food Store")]
    HealthFoodStore,
    #[serde(rename = "Online Retailer")]
    OnlineRetailer,
}

impl BusinessType {
    pub const ALL: [BusinessType; 8] = [
        BusinessType::Hypermarket,
        BusinessType::Supermarket,
        BusinessType::ConvenienceStore,
        BusinessType::Pharmacy,
        BusinessType::Restaurant,
        BusinessType::BabyStore,
        BusinessType::HealthFoodStore,
        BusinessType::OnlineRetailer,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BusinessType::Hypermarket => "Hypermarket",
            BusinessType::Supermarket => "Supermarket",
            BusinessType::ConvenienceStore => "Convenience Store",
            BusinessType::Pharmacy => "Pharmacy",
            BusinessType::Restaurant => "Restaurant",
            BusinessType::BabyStore => "Baby Store",
            BusinessType::HealthFoodStore => "Health Food Store",
            BusinessType::OnlineRetailer => "Online Retailer",
        }
    }

    /// Matches a free-text label against the closed set, ignoring case and
    /// surrounding whitespace. `"convenience store"` and `"CONVENIENCE STORE"`
    /// both resolve; anything outside the set returns `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for BusinessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product family used for market-share reporting.
///
/// Variant order is the serialization order of a record's family set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductFamily {
    Waters,
    #[serde(rename = "Yogurt & Desserts")]
    YogurtAndDesserts,
    #[serde(rename = "Baby Nutrition")]
    BabyNutrition,
    #[serde(rename = "Plant-Based")]
    PlantBased,
    #[serde(rename = "Medical Nutrition")]
    MedicalNutrition,
    #[serde(rename = "Dairy Alternatives")]
    DairyAlternatives,
}

impl ProductFamily {
    pub const ALL: [ProductFamily; 6] = [
        ProductFamily::Waters,
        ProductFamily::YogurtAndDesserts,
        ProductFamily::BabyNutrition,
        ProductFamily::PlantBased,
        ProductFamily::MedicalNutrition,
        ProductFamily::DairyAlternatives,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductFamily::Waters => "Waters",
            ProductFamily::YogurtAndDesserts => "Yogurt & Desserts",
            ProductFamily::BabyNutrition => "Baby Nutrition",
            ProductFamily::PlantBased => "Plant-Based",
            ProductFamily::MedicalNutrition => "Medical Nutrition",
            ProductFamily::DairyAlternatives => "Dairy Alternatives",
        }
    }
}

impl std::fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One business row as stored upstream, before normalization.
///
/// `menu_items` holds the stored JSON entries untouched so they can be echoed
/// back to the client; entries that are not objects still count toward the
/// list length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBusinessRecord {
    pub id: String,
    pub name: Option<String>,
    pub declared_type: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_customer: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub menu_items: Vec<serde_json::Value>,
}

/// Display-ready point of sale consumed by the map and chart widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPosRecord {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub business_type: BusinessType,
    pub product_families: Vec<ProductFamily>,
    pub sales_volume: i64,
    pub city: String,
    pub country: String,
    pub address: String,
    pub submission_data: SubmissionData,
}

/// Field-scout submission metadata attached to each point of sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionData {
    pub user_name: String,
    pub photo_url: Option<String>,
    pub points_earned: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub detected_products: Vec<serde_json::Value>,
    pub is_danone_customer: bool,
    pub menu_items: Vec<serde_json::Value>,
    pub total_menu_items: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_type_serializes_to_display_label() {
        let json = serde_json::to_string(&BusinessType::ConvenienceStore).unwrap();
        assert_eq!(json, "\"Convenience Store\"");
    }

    #[test]
    fn business_type_from_label_ignores_case() {
        assert_eq!(
            BusinessType::from_label(" health food store "),
            Some(BusinessType::HealthFoodStore)
        );
        assert_eq!(BusinessType::from_label("PHARMACY"), Some(BusinessType::Pharmacy));
        assert_eq!(BusinessType::from_label("Unknown"), None);
        assert_eq!(BusinessType::from_label("Bakery"), None);
    }

    #[test]
    fn product_family_labels_round_trip_through_serde() {
        for family in ProductFamily::ALL {
            let json = serde_json::to_string(&family).unwrap();
            assert_eq!(json, format!("\"{}\"", family.as_str()));
            let back: ProductFamily = serde_json::from_str(&json).unwrap();
            assert_eq!(back, family);
        }
    }

    #[test]
    fn normalized_record_uses_camel_case_with_snake_case_submission() {
        let record = NormalizedPosRecord {
            id: "biz_1".to_string(),
            name: "Corner Shop".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            business_type: BusinessType::ConvenienceStore,
            product_families: vec![ProductFamily::Waters],
            sales_volume: 10_000,
            city: "Paris".to_string(),
            country: "France".to_string(),
            address: "1 Rue X, Paris, FR".to_string(),
            submission_data: SubmissionData {
                user_name: "Scout Network".to_string(),
                photo_url: None,
                points_earned: 60,
                submitted_at: None,
                detected_products: vec![],
                is_danone_customer: true,
                menu_items: vec![],
                total_menu_items: 0,
                last_updated: None,
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["businessType"], "Convenience Store");
        assert_eq!(value["productFamilies"][0], "Waters");
        assert_eq!(value["salesVolume"], 10_000);
        assert_eq!(value["submissionData"]["points_earned"], 60);
        assert!(value["submissionData"]["photo_url"].is_null());
        assert_eq!(value["submissionData"]["is_danone_customer"], true);
    }
}
