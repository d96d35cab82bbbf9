//! Live integration tests for posdash-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/posdash-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `DATABASE_URL` set and `--ignored`.

use posdash_db::{
    count_geocoded_businesses, get_analytics_summary, list_competition_analytics,
    list_competitor_overview, list_geocoded_businesses, list_pricing_analytics,
    list_pricing_trends, list_recent_revenue_by_country, list_volume_analytics, probe_database,
    ProbeStatus,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_business(
    pool: &sqlx::PgPool,
    name: &str,
    coords: Option<(f64, f64)>,
    photo_days_ago: Option<i32>,
) {
    sqlx::query(
        "INSERT INTO businesses (name, type, address, latitude, longitude, last_photo_date, menu_items) \
         VALUES ($1, 'Supermarket', '1 Main St, Paris, FR', $2, $3, \
                 NOW() - make_interval(days => $4), '[]'::jsonb)",
    )
    .bind(name)
    .bind(coords.map(|c| c.0))
    .bind(coords.map(|c| c.1))
    .bind(photo_days_ago)
    .execute(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_business failed for '{name}': {e}"));
}

async fn insert_volume(
    pool: &sqlx::PgPool,
    month: &str,
    region: &str,
    country: &str,
    business_id: i64,
    volume: i64,
    revenue: &str,
) {
    sqlx::query(
        "INSERT INTO volume_analytics \
         (month, region, country, business_type, business_id, volume_sold, revenue) \
         VALUES ($1, $2, $3, 'Supermarket', $4, $5, $6::numeric)",
    )
    .bind(month)
    .bind(region)
    .bind(country)
    .bind(business_id)
    .bind(volume)
    .bind(revenue)
    .execute(pool)
    .await
    .expect("insert volume row");
}

async fn insert_competition(pool: &sqlx::PgPool, competitor: &str, share: &str, available: bool) {
    sqlx::query(
        "INSERT INTO competition_analytics \
         (danone_product, competitor_brand, region, danone_price, competitor_price, \
          price_difference, market_share, availability) \
         VALUES ('Activia', $1, 'IDF', 2.00, 1.80, 0.20, $2::numeric, $3)",
    )
    .bind(competitor)
    .bind(share)
    .bind(available)
    .execute(pool)
    .await
    .expect("insert competition row");
}

// ---------------------------------------------------------------------------
// Businesses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn geocoded_businesses_skip_missing_coordinates(pool: sqlx::PgPool) {
    insert_business(&pool, "Old", Some((48.8, 2.3)), Some(10)).await;
    insert_business(&pool, "Recent", Some((48.9, 2.4)), Some(1)).await;
    insert_business(&pool, "Nowhere", None, Some(0)).await;
    insert_business(&pool, "Never photographed", Some((45.0, 5.0)), None).await;

    let rows = list_geocoded_businesses(&pool).await.expect("list");
    let names: Vec<_> = rows.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["Recent", "Old", "Never photographed"]);
    assert!((rows[0].latitude.expect("lat") - 48.9).abs() < 1e-6);

    assert_eq!(count_geocoded_businesses(&pool).await.expect("count"), 3);
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn volume_analytics_groups_and_orders(pool: sqlx::PgPool) {
    insert_volume(&pool, "2024-05", "IDF", "France", 1, 100, "250.00").await;
    insert_volume(&pool, "2024-05", "IDF", "France", 2, 300, "750.00").await;
    insert_volume(&pool, "2024-04", "IDF", "France", 1, 900, "10.00").await;

    let rows = list_volume_analytics(&pool).await.expect("volume");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month, "2024-05");
    assert_eq!(rows[0].total_volume, 400);
    assert_eq!(rows[0].business_count, 2);
    assert_eq!(rows[0].total_revenue, Decimal::new(100_000, 2));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn summary_on_empty_tables_is_zeroed(pool: sqlx::PgPool) {
    let summary = get_analytics_summary(&pool).await.expect("summary");
    assert_eq!(summary.volume.total_volume, 0);
    assert_eq!(summary.competition.competitor_count, 0);
    assert_eq!(summary.pricing.products_tracked, 0);
    assert!(summary.top_regions.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn summary_uses_latest_month_only(pool: sqlx::PgPool) {
    insert_volume(&pool, "2024-06", "North", "France", 1, 50, "10.00").await;
    insert_volume(&pool, "2024-06", "South", "Spain", 2, 70, "20.00").await;
    insert_volume(&pool, "2024-05", "North", "France", 1, 1_000, "99.00").await;

    let summary = get_analytics_summary(&pool).await.expect("summary");
    assert_eq!(summary.volume.total_volume, 120);
    assert_eq!(summary.volume.total_businesses, 2);
    assert_eq!(summary.top_regions[0].region, "South");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn revenue_by_country_covers_last_three_months(pool: sqlx::PgPool) {
    insert_volume(&pool, "2024-06", "North", "France", 1, 10, "100.00").await;
    insert_volume(&pool, "2024-03", "North", "Germany", 2, 10, "500.00").await;
    insert_volume(&pool, "2024-01", "North", "Italy", 3, 10, "900.00").await;

    let rows = list_recent_revenue_by_country(&pool).await.expect("revenue");
    let countries: Vec<_> = rows.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(countries, vec!["Germany", "France"]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn competition_rates_are_fractions_overview_percentages(pool: sqlx::PgPool) {
    insert_competition(&pool, "Yoplait", "0.3000", true).await;
    insert_competition(&pool, "Yoplait", "0.1000", false).await;

    let rows = list_competition_analytics(&pool).await.expect("competition");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].occurrence_count, 2);
    assert_eq!(rows[0].availability_rate.round_dp(2), Decimal::new(50, 2));
    assert_eq!(rows[0].avg_market_share.round_dp(2), Decimal::new(20, 2));

    let overview = list_competitor_overview(&pool).await.expect("overview");
    assert_eq!(overview[0].competitor_brand, "Yoplait");
    assert_eq!(overview[0].availability_rate.round_dp(1), Decimal::new(500, 1));
    assert_eq!(overview[0].avg_market_share.round_dp(1), Decimal::new(200, 1));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn pricing_queries_group_by_month(pool: sqlx::PgPool) {
    for (month, price) in [("2024-05", "2.00"), ("2024-05", "3.00"), ("2024-04", "1.00")] {
        sqlx::query(
            "INSERT INTO price_evolution \
             (product_name, product_category, month, region, business_type, \
              retail_price, supplier_cost, margin, price_vs_rrp) \
             VALUES ('Activia', 'Yogurt', $1, 'IDF', 'Supermarket', $2::numeric, 1.00, 30.0, 95.0)",
        )
        .bind(month)
        .bind(price)
        .execute(&pool)
        .await
        .expect("insert price row");
    }

    let detail = list_pricing_analytics(&pool).await.expect("pricing");
    assert_eq!(detail.len(), 2);
    assert_eq!(detail[0].month, "2024-05");
    assert_eq!(detail[0].sample_size, 2);

    let trends = list_pricing_trends(&pool).await.expect("trends");
    assert_eq!(trends[0].avg_price.round_dp(2), Decimal::new(250, 2));
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn probe_reports_healthy_on_migrated_database(pool: sqlx::PgPool) {
    insert_business(&pool, "Probe", Some((1.0, 1.0)), Some(0)).await;

    let probe = probe_database(Some(&pool), "public").await;
    assert_eq!(probe.status, ProbeStatus::Healthy);
    assert!(probe.connection && probe.test_query && probe.schema_access && probe.table_access);
    assert_eq!(probe.data_count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn probe_reports_partial_for_missing_schema(pool: sqlx::PgPool) {
    let probe = probe_database(Some(&pool), "no_such_schema").await;
    assert_eq!(probe.status, ProbeStatus::Partial);
    assert!(!probe.schema_access);
    assert!(probe.table_access);
}
