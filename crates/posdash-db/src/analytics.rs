//! Read-model queries over the analytics tables used by the dashboard charts.
//!
//! Aggregates come back unrounded; presentation rounding happens at the API
//! layer.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Volume per month, region, country, and channel.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VolumeRow {
    pub month: String,
    pub region: String,
    pub country: String,
    pub business_type: String,
    pub total_volume: i64,
    pub total_revenue: Decimal,
    pub business_count: i64,
    pub avg_volume_per_business: Decimal,
}

/// Price and share comparison per product, competitor, and region.
///
/// `avg_market_share` and `availability_rate` are 0..1 fractions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitionRow {
    pub danone_product: String,
    pub competitor_brand: String,
    pub region: String,
    pub avg_danone_price: Decimal,
    pub avg_competitor_price: Decimal,
    pub avg_price_difference: Decimal,
    pub avg_market_share: Decimal,
    pub occurrence_count: i64,
    pub availability_rate: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PricingRow {
    pub product_name: String,
    pub product_category: String,
    pub month: String,
    pub region: String,
    pub business_type: String,
    pub avg_retail_price: Decimal,
    pub avg_supplier_cost: Decimal,
    pub avg_margin: Decimal,
    pub avg_price_vs_rrp: Decimal,
    pub sample_size: i64,
}

/// Latest-month volume totals.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct VolumeSummaryRow {
    pub total_volume: i64,
    pub total_revenue: Decimal,
    pub total_businesses: i64,
    pub avg_volume_per_business: Decimal,
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct CompetitionSummaryRow {
    pub competitor_count: i64,
    pub avg_price_difference: Decimal,
    pub avg_competitor_market_share: Decimal,
}

/// Latest-month pricing totals.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PricingSummaryRow {
    pub avg_margin: Decimal,
    pub avg_price_vs_rrp: Decimal,
    pub products_tracked: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegionVolumeRow {
    pub region: String,
    pub total_volume: i64,
    pub total_revenue: Decimal,
}

/// Everything the summary endpoint shows, fetched in one call.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSummary {
    pub volume: VolumeSummaryRow,
    pub competition: CompetitionSummaryRow,
    pub pricing: PricingSummaryRow,
    pub top_regions: Vec<RegionVolumeRow>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryRevenueRow {
    pub country: String,
    pub total_revenue: Decimal,
    pub total_volume: i64,
    pub business_count: i64,
}

/// Per-competitor rollup; share and availability are already percentages.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorOverviewRow {
    pub competitor_brand: String,
    pub competing_products: i64,
    pub avg_price_difference: Decimal,
    pub avg_market_share: Decimal,
    pub availability_rate: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PricingTrendRow {
    pub product_category: String,
    pub month: String,
    pub avg_price: Decimal,
    pub avg_margin: Decimal,
    pub price_vs_rrp: Decimal,
}

const TOP_REGION_LIMIT: i64 = 5;
const COMPETITOR_OVERVIEW_LIMIT: i64 = 10;

/// Volume aggregated by month, region, country, and business type.
///
/// Ordered newest month first, then by volume.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_volume_analytics(pool: &PgPool) -> Result<Vec<VolumeRow>, DbError> {
    let rows = sqlx::query_as::<_, VolumeRow>(
        "SELECT \
             month, region, country, business_type, \
             SUM(volume_sold)::bigint AS total_volume, \
             SUM(revenue) AS total_revenue, \
             COUNT(DISTINCT business_id) AS business_count, \
             AVG(volume_sold) AS avg_volume_per_business \
         FROM volume_analytics \
         GROUP BY month, region, country, business_type \
         ORDER BY month DESC, total_volume DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Competition metrics grouped by product, competitor, and region.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_competition_analytics(pool: &PgPool) -> Result<Vec<CompetitionRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitionRow>(
        "SELECT \
             danone_product, competitor_brand, region, \
             AVG(danone_price) AS avg_danone_price, \
             AVG(competitor_price) AS avg_competitor_price, \
             AVG(price_difference) AS avg_price_difference, \
             AVG(market_share) AS avg_market_share, \
             COUNT(*) AS occurrence_count, \
             AVG(CASE WHEN availability THEN 1 ELSE 0 END) AS availability_rate \
         FROM competition_analytics \
         GROUP BY danone_product, competitor_brand, region \
         ORDER BY avg_market_share DESC, occurrence_count DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Price and margin evolution grouped by product, month, region, and channel.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pricing_analytics(pool: &PgPool) -> Result<Vec<PricingRow>, DbError> {
    let rows = sqlx::query_as::<_, PricingRow>(
        "SELECT \
             product_name, product_category, month, region, business_type, \
             AVG(retail_price) AS avg_retail_price, \
             AVG(supplier_cost) AS avg_supplier_cost, \
             AVG(margin) AS avg_margin, \
             AVG(price_vs_rrp) AS avg_price_vs_rrp, \
             COUNT(*) AS sample_size \
         FROM price_evolution \
         GROUP BY product_name, product_category, month, region, business_type \
         ORDER BY month DESC, product_name, region",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Headline metrics: latest-month volume and pricing, all-time competition,
/// and the five highest-volume regions of the latest month.
///
/// Empty tables yield zeroed metrics rather than an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any of the queries fail.
pub async fn get_analytics_summary(pool: &PgPool) -> Result<AnalyticsSummary, DbError> {
    let volume = sqlx::query_as::<_, VolumeSummaryRow>(
        "SELECT \
             COALESCE(SUM(volume_sold), 0)::bigint AS total_volume, \
             COALESCE(SUM(revenue), 0) AS total_revenue, \
             COUNT(DISTINCT business_id) AS total_businesses, \
             COALESCE(AVG(volume_sold), 0) AS avg_volume_per_business \
         FROM volume_analytics \
         WHERE month >= (SELECT MAX(month) FROM volume_analytics)",
    )
    .fetch_one(pool)
    .await?;

    let competition = sqlx::query_as::<_, CompetitionSummaryRow>(
        "SELECT \
             COUNT(DISTINCT competitor_brand) AS competitor_count, \
             COALESCE(AVG(price_difference), 0) AS avg_price_difference, \
             COALESCE(AVG(market_share), 0) AS avg_competitor_market_share \
         FROM competition_analytics",
    )
    .fetch_one(pool)
    .await?;

    let pricing = sqlx::query_as::<_, PricingSummaryRow>(
        "SELECT \
             COALESCE(AVG(margin), 0) AS avg_margin, \
             COALESCE(AVG(price_vs_rrp), 0) AS avg_price_vs_rrp, \
             COUNT(DISTINCT product_name) AS products_tracked \
         FROM price_evolution \
         WHERE month >= (SELECT MAX(month) FROM price_evolution)",
    )
    .fetch_one(pool)
    .await?;

    let top_regions = sqlx::query_as::<_, RegionVolumeRow>(
        "SELECT \
             region, \
             SUM(volume_sold)::bigint AS total_volume, \
             SUM(revenue) AS total_revenue \
         FROM volume_analytics \
         WHERE month >= (SELECT MAX(month) FROM volume_analytics) \
         GROUP BY region \
         ORDER BY total_volume DESC \
         LIMIT $1",
    )
    .bind(TOP_REGION_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(AnalyticsSummary {
        volume,
        competition,
        pricing,
        top_regions,
    })
}

/// Revenue per country over the months since three months before the latest.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_revenue_by_country(
    pool: &PgPool,
) -> Result<Vec<CountryRevenueRow>, DbError> {
    let rows = sqlx::query_as::<_, CountryRevenueRow>(
        "SELECT \
             country, \
             SUM(revenue) AS total_revenue, \
             SUM(volume_sold)::bigint AS total_volume, \
             COUNT(DISTINCT business_id) AS business_count \
         FROM volume_analytics \
         WHERE month >= ( \
             SELECT TO_CHAR( \
                 DATE_TRUNC('month', TO_DATE(MAX(month), 'YYYY-MM') - INTERVAL '3 months'), \
                 'YYYY-MM') \
             FROM volume_analytics \
         ) \
         GROUP BY country \
         ORDER BY total_revenue DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The ten competitors with the highest average market share.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_competitor_overview(
    pool: &PgPool,
) -> Result<Vec<CompetitorOverviewRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitorOverviewRow>(
        "SELECT \
             competitor_brand, \
             COUNT(DISTINCT danone_product) AS competing_products, \
             AVG(price_difference) AS avg_price_difference, \
             AVG(market_share) * 100 AS avg_market_share, \
             AVG(CASE WHEN availability THEN 1 ELSE 0 END) * 100 AS availability_rate \
         FROM competition_analytics \
         GROUP BY competitor_brand \
         ORDER BY avg_market_share DESC \
         LIMIT $1",
    )
    .bind(COMPETITOR_OVERVIEW_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Average price and margin per category and month, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pricing_trends(pool: &PgPool) -> Result<Vec<PricingTrendRow>, DbError> {
    let rows = sqlx::query_as::<_, PricingTrendRow>(
        "SELECT \
             product_category, month, \
             AVG(retail_price) AS avg_price, \
             AVG(margin) AS avg_margin, \
             AVG(price_vs_rrp) AS price_vs_rrp \
         FROM price_evolution \
         GROUP BY product_category, month \
         ORDER BY month DESC, product_category",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
