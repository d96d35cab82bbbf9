//! Synthetic POS records served when no database is reachable.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use posdash_core::{BusinessType, NormalizedPosRecord, ProductFamily, SubmissionData};
use rand::seq::IndexedRandom;
use rand::Rng;

struct SampleCity {
    city: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
}

const SAMPLE_CITIES: [SampleCity; 10] = [
    SampleCity {
        city: "Paris",
        country: "France",
        latitude: 48.8566,
        longitude: 2.3522,
    },
    SampleCity {
        city: "London",
        country: "UK",
        latitude: 51.5074,
        longitude: -0.1278,
    },
    SampleCity {
        city: "Berlin",
        country: "Germany",
        latitude: 52.5200,
        longitude: 13.4050,
    },
    SampleCity {
        city: "Madrid",
        country: "Spain",
        latitude: 40.4168,
        longitude: -3.7038,
    },
    SampleCity {
        city: "Rome",
        country: "Italy",
        latitude: 41.9028,
        longitude: 12.4964,
    },
    SampleCity {
        city: "Amsterdam",
        country: "Netherlands",
        latitude: 52.3676,
        longitude: 4.9041,
    },
    SampleCity {
        city: "Brussels",
        country: "Belgium",
        latitude: 50.8503,
        longitude: 4.3517,
    },
    SampleCity {
        city: "Vienna",
        country: "Austria",
        latitude: 48.2082,
        longitude: 16.3738,
    },
    SampleCity {
        city: "Zurich",
        country: "Switzerland",
        latitude: 47.3769,
        longitude: 8.5417,
    },
    SampleCity {
        city: "Stockholm",
        country: "Sweden",
        latitude: 59.3293,
        longitude: 18.0686,
    },
];

/// Sample records never use the restaurant channel.
const SAMPLE_TYPES: [BusinessType; 7] = [
    BusinessType::Supermarket,
    BusinessType::Hypermarket,
    BusinessType::ConvenienceStore,
    BusinessType::Pharmacy,
    BusinessType::BabyStore,
    BusinessType::HealthFoodStore,
    BusinessType::OnlineRetailer,
];

const SAMPLE_USER_NAME: &str = "sample_user";
const COORDINATE_JITTER: f64 = 0.05;

fn base_volume(business_type: BusinessType) -> i64 {
    match business_type {
        BusinessType::Hypermarket => 200_000,
        BusinessType::Supermarket => 100_000,
        BusinessType::ConvenienceStore => 30_000,
        BusinessType::Pharmacy => 25_000,
        _ => 50_000,
    }
}

/// Generates two or three records per sample city.
///
/// `now` stamps every submission; pass a seeded RNG for reproducible output.
pub fn generate_sample_records<R: Rng + ?Sized>(
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<NormalizedPosRecord> {
    let mut records = Vec::with_capacity(SAMPLE_CITIES.len() * 3);

    for (index, city) in SAMPLE_CITIES.iter().enumerate() {
        let per_city = rng.random_range(2..=3);
        for n in 0..per_city {
            let business_type = SAMPLE_TYPES[rng.random_range(0..SAMPLE_TYPES.len())];

            let family_count = rng.random_range(1..=3);
            let families: BTreeSet<ProductFamily> = ProductFamily::ALL
                .choose_multiple(rng, family_count)
                .copied()
                .collect();
            let product_families: Vec<ProductFamily> = families.into_iter().collect();

            let base = base_volume(business_type);
            let sales_volume = base + rng.random_range(0..base * 4 / 5);

            let detected_products = product_families
                .iter()
                .map(|family| {
                    let first = family.as_str().split_whitespace().next().unwrap_or_default();
                    serde_json::json!({ "name": first.to_lowercase() })
                })
                .collect();

            records.push(NormalizedPosRecord {
                id: format!("sample_{index}_{n}"),
                name: format!("{business_type} {} {}", city.city, n + 1),
                latitude: city.latitude + rng.random_range(-COORDINATE_JITTER..COORDINATE_JITTER),
                longitude: city.longitude
                    + rng.random_range(-COORDINATE_JITTER..COORDINATE_JITTER),
                business_type,
                product_families,
                sales_volume,
                city: city.city.to_string(),
                country: city.country.to_string(),
                address: format!("{} Main Street, {}", rng.random_range(1..=999), city.city),
                submission_data: SubmissionData {
                    user_name: SAMPLE_USER_NAME.to_string(),
                    photo_url: None,
                    points_earned: rng.random_range(10..=100),
                    submitted_at: Some(now),
                    detected_products,
                    is_danone_customer: false,
                    menu_items: Vec::new(),
                    total_menu_items: 0,
                    last_updated: Some(now),
                },
            });
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn generate(seed: u64) -> Vec<NormalizedPosRecord> {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        generate_sample_records(&mut StdRng::seed_from_u64(seed), now)
    }

    #[test]
    fn two_or_three_records_per_city() {
        for seed in 0..20 {
            let records = generate(seed);
            assert!((20..=30).contains(&records.len()), "got {}", records.len());
            for (index, city) in SAMPLE_CITIES.iter().enumerate() {
                let count = records
                    .iter()
                    .filter(|r| r.id.starts_with(&format!("sample_{index}_")))
                    .count();
                assert!((2..=3).contains(&count), "{} had {count}", city.city);
            }
        }
    }

    #[test]
    fn records_stay_within_bounds() {
        for record in generate(7) {
            assert_ne!(record.business_type, BusinessType::Restaurant);
            assert!((1..=3).contains(&record.product_families.len()));
            assert!(record.product_families.windows(2).all(|w| w[0] < w[1]));

            let base = base_volume(record.business_type);
            assert!(record.sales_volume >= base);
            assert!(record.sales_volume < base + base * 4 / 5);

            let points = record.submission_data.points_earned;
            assert!((10..=100).contains(&points));

            let city = SAMPLE_CITIES
                .iter()
                .find(|c| c.city == record.city)
                .expect("known city");
            assert!((record.latitude - city.latitude).abs() <= COORDINATE_JITTER);
            assert!((record.longitude - city.longitude).abs() <= COORDINATE_JITTER);
            assert!(record.address.ends_with(&format!("Main Street, {}", city.city)));
            assert_eq!(record.country, city.country);
        }
    }

    #[test]
    fn names_follow_type_city_ordinal() {
        let records = generate(3);
        let first = &records[0];
        assert_eq!(first.id, "sample_0_0");
        assert_eq!(first.name, format!("{} Paris 1", first.business_type));
    }

    #[test]
    fn detected_products_use_first_word_of_family() {
        for record in generate(11) {
            let names: Vec<_> = record
                .submission_data
                .detected_products
                .iter()
                .map(|p| p["name"].as_str().unwrap_or_default().to_string())
                .collect();
            assert_eq!(names.len(), record.product_families.len());
            for name in names {
                assert!(
                    ["waters", "yogurt", "baby", "plant-based", "medical", "dairy"]
                        .contains(&name.as_str()),
                    "unexpected {name}"
                );
            }
        }
    }

    #[test]
    fn same_seed_same_records() {
        let a = serde_json::to_string(&generate(42)).unwrap();
        let b = serde_json::to_string(&generate(42)).unwrap();
        assert_eq!(a, b);
    }
}
