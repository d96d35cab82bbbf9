//! City and country extraction from free-text addresses.

const UNKNOWN: &str = "Unknown";

/// Upper-cased country segment to display name. Authoritative as-is.
const COUNTRY_TABLE: &[(&str, &str)] = &[
    ("FR", "France"),
    ("FRANCE", "France"),
    ("DE", "Germany"),
    ("GERMANY", "Germany"),
    ("DEUTSCHLAND", "Germany"),
    ("UK", "United Kingdom"),
    ("GB", "United Kingdom"),
    ("UNITED KINGDOM", "United Kingdom"),
    ("ES", "Spain"),
    ("SPAIN", "Spain"),
    ("ESPAÑA", "Spain"),
    ("IT", "Italy"),
    ("ITALY", "Italy"),
    ("ITALIA", "Italy"),
    ("NL", "Netherlands"),
    ("NETHERLANDS", "Netherlands"),
    ("BE", "Belgium"),
    ("BELGIUM", "Belgium"),
];

/// City and country derived from an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locality {
    pub city: String,
    pub country: String,
}

/// Splits an address like `"12 Rue de Paris, Paris, FR"` into city and country.
///
/// The city is the second-to-last comma segment, or the last word when there
/// is no comma. The country is the last comma segment mapped through the
/// country table, title-cased when unmapped. Anything undeterminable is
/// `"Unknown"`.
#[must_use]
pub fn decompose_address(address: Option<&str>) -> Locality {
    let Some(address) = address.filter(|a| !a.is_empty()) else {
        return Locality {
            city: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        };
    };

    Locality {
        city: extract_city(address),
        country: extract_country(address),
    }
}

fn extract_city(address: &str) -> String {
    let segments: Vec<&str> = address.split(',').collect();
    let city = if segments.len() >= 2 {
        Some(segments[segments.len() - 2].trim())
    } else {
        address.split_whitespace().last()
    };
    known_or_unknown(city)
}

fn extract_country(address: &str) -> String {
    let last = address
        .rsplit(',')
        .next()
        .unwrap_or(address)
        .trim()
        .to_uppercase();

    if let Some(&(_, name)) = COUNTRY_TABLE.iter().find(|(code, _)| *code == last) {
        return name.to_string();
    }
    known_or_unknown(Some(title_case(&last).as_str()))
}

fn known_or_unknown(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN.to_string(), ToOwned::to_owned)
}

/// Upper-cases the first letter of every word and lower-cases the rest; a
/// word starts after any non-alphabetic character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}
