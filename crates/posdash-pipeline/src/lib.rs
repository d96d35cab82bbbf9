//! POS record normalization and sample-data generation.
//!
//! Everything here is pure and synchronous: the same raw rows always produce
//! the same normalized output.

pub mod address;
pub mod classify;
pub mod menu;
pub mod normalize;
pub mod price;
pub mod sample;

pub use address::{decompose_address, Locality};
pub use classify::{classify_product_family, infer_business_type, resolve_business_type};
pub use menu::{aggregate, MenuItem, MenuTotals};
pub use normalize::{estimate_sales_volume, loyalty_points, normalize_record, normalize_records};
pub use price::parse_price;
pub use sample::generate_sample_records;
