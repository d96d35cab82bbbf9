//! Analytics read models shaped for the dashboard charts.
//!
//! Shares and availability are stored as fractions and reported as
//! percentages with one decimal; prices carry two decimals.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use posdash_db::{
    AnalyticsSummary, CompetitionRow, CompetitorOverviewRow, CountryRevenueRow, PricingRow,
    PricingTrendRow, VolumeRow,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::insights::{
    build_strategy_prompt, parse_strategy_reply, strategy_unavailable, StrategyInput,
};
use crate::middleware::{ForwardedIdentity, RequestId};

use super::{map_db_error, require_pool, ApiError, ApiResponse, AppState, ResponseMeta};

fn price(value: Decimal) -> Decimal {
    value.round_dp(2)
}

fn one_dp(value: Decimal) -> Decimal {
    value.round_dp(1)
}

fn percent(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).round_dp(1)
}

#[derive(Debug, Serialize)]
pub(super) struct VolumeItem {
    month: String,
    region: String,
    country: String,
    business_type: String,
    total_volume: i64,
    #[serde(with = "rust_decimal::serde::float")]
    total_revenue: Decimal,
    business_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    avg_volume_per_business: Decimal,
}

impl From<VolumeRow> for VolumeItem {
    fn from(row: VolumeRow) -> Self {
        Self {
            month: row.month,
            region: row.region,
            country: row.country,
            business_type: row.business_type,
            total_volume: row.total_volume,
            total_revenue: row.total_revenue,
            business_count: row.business_count,
            avg_volume_per_business: row.avg_volume_per_business,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CompetitionItem {
    danone_product: String,
    competitor_brand: String,
    region: String,
    #[serde(with = "rust_decimal::serde::float")]
    avg_danone_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_competitor_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_market_share: Decimal,
    occurrence_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    availability_rate: Decimal,
}

impl From<CompetitionRow> for CompetitionItem {
    fn from(row: CompetitionRow) -> Self {
        Self {
            danone_product: row.danone_product,
            competitor_brand: row.competitor_brand,
            region: row.region,
            avg_danone_price: price(row.avg_danone_price),
            avg_competitor_price: price(row.avg_competitor_price),
            avg_price_difference: price(row.avg_price_difference),
            avg_market_share: percent(row.avg_market_share),
            occurrence_count: row.occurrence_count,
            availability_rate: percent(row.availability_rate),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PricingItem {
    product_name: String,
    product_category: String,
    month: String,
    region: String,
    business_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    avg_retail_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_supplier_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price_vs_rrp: Decimal,
    sample_size: i64,
}

impl From<PricingRow> for PricingItem {
    fn from(row: PricingRow) -> Self {
        Self {
            product_name: row.product_name,
            product_category: row.product_category,
            month: row.month,
            region: row.region,
            business_type: row.business_type,
            avg_retail_price: price(row.avg_retail_price),
            avg_supplier_cost: price(row.avg_supplier_cost),
            avg_margin: one_dp(row.avg_margin),
            avg_price_vs_rrp: one_dp(row.avg_price_vs_rrp),
            sample_size: row.sample_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct VolumeMetrics {
    total_volume: i64,
    #[serde(with = "rust_decimal::serde::float")]
    total_revenue: Decimal,
    total_businesses: i64,
    #[serde(with = "rust_decimal::serde::float")]
    avg_volume_per_business: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct CompetitionMetrics {
    competitor_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_competitor_market_share: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct PricingMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    avg_margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price_vs_rrp: Decimal,
    products_tracked: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct RegionItem {
    region: String,
    total_volume: i64,
    #[serde(with = "rust_decimal::serde::float")]
    total_revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct SummaryData {
    volume_metrics: VolumeMetrics,
    competition_metrics: CompetitionMetrics,
    pricing_metrics: PricingMetrics,
    top_regions: Vec<RegionItem>,
}

impl From<AnalyticsSummary> for SummaryData {
    fn from(summary: AnalyticsSummary) -> Self {
        let AnalyticsSummary {
            volume,
            competition,
            pricing,
            top_regions,
        } = summary;

        Self {
            volume_metrics: VolumeMetrics {
                total_volume: volume.total_volume,
                total_revenue: price(volume.total_revenue),
                total_businesses: volume.total_businesses,
                avg_volume_per_business: volume.avg_volume_per_business.round(),
            },
            competition_metrics: CompetitionMetrics {
                competitor_count: competition.competitor_count,
                avg_price_difference: price(competition.avg_price_difference),
                avg_competitor_market_share: percent(competition.avg_competitor_market_share),
            },
            pricing_metrics: PricingMetrics {
                avg_margin: one_dp(pricing.avg_margin),
                avg_price_vs_rrp: one_dp(pricing.avg_price_vs_rrp),
                products_tracked: pricing.products_tracked,
            },
            top_regions: top_regions
                .into_iter()
                .map(|r| RegionItem {
                    region: r.region,
                    total_volume: r.total_volume,
                    total_revenue: price(r.total_revenue),
                })
                .collect(),
        }
    }
}

pub(super) async fn list_volume(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<VolumeItem>>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let rows = posdash_db::list_volume_analytics(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(VolumeItem::from).collect();
    Ok(Json(ApiResponse::success(data, req_id.0)))
}

pub(super) async fn list_competition(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CompetitionItem>>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let rows = posdash_db::list_competition_analytics(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CompetitionItem::from).collect();
    Ok(Json(ApiResponse::success(data, req_id.0)))
}

pub(super) async fn list_pricing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PricingItem>>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let rows = posdash_db::list_pricing_analytics(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(PricingItem::from).collect();
    Ok(Json(ApiResponse::success(data, req_id.0)))
}

pub(super) async fn get_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SummaryData>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let summary = posdash_db::get_analytics_summary(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::success(
        SummaryData::from(summary),
        req_id.0,
    )))
}

#[derive(Debug, Serialize)]
pub(crate) struct CountryRevenueItem {
    country: String,
    #[serde(with = "rust_decimal::serde::float")]
    revenue: Decimal,
    volume: i64,
    business_count: i64,
}

impl From<CountryRevenueRow> for CountryRevenueItem {
    fn from(row: CountryRevenueRow) -> Self {
        Self {
            country: row.country,
            revenue: row.total_revenue,
            volume: row.total_volume,
            business_count: row.business_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompetitorItem {
    competitor: String,
    competing_products: i64,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    market_share: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    availability_rate: Decimal,
}

impl From<CompetitorOverviewRow> for CompetitorItem {
    fn from(row: CompetitorOverviewRow) -> Self {
        Self {
            competitor: row.competitor_brand,
            competing_products: row.competing_products,
            avg_price_difference: price(row.avg_price_difference),
            market_share: one_dp(row.avg_market_share),
            availability_rate: one_dp(row.availability_rate),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PricingTrendItem {
    category: String,
    month: String,
    #[serde(with = "rust_decimal::serde::float")]
    avg_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    avg_margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    price_vs_rrp: Decimal,
}

impl From<PricingTrendRow> for PricingTrendItem {
    fn from(row: PricingTrendRow) -> Self {
        Self {
            category: row.product_category,
            month: row.month,
            avg_price: price(row.avg_price),
            avg_margin: one_dp(row.avg_margin),
            price_vs_rrp: one_dp(row.price_vs_rrp),
        }
    }
}

/// Field-intelligence overview; fields sit at the top level where the
/// dashboard reads them.
#[derive(Debug, Serialize)]
pub(super) struct AnalyticsOverview {
    status: &'static str,
    revenue_by_country: Vec<CountryRevenueItem>,
    competition_analysis: Vec<CompetitorItem>,
    pricing_trends: Vec<PricingTrendItem>,
    ai_recommendations: Vec<Value>,
    generated_at: DateTime<Utc>,
    meta: ResponseMeta,
}

pub(super) async fn get_analytics_overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    identity: ForwardedIdentity,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;

    let revenue_by_country: Vec<CountryRevenueItem> =
        posdash_db::list_recent_revenue_by_country(pool)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(CountryRevenueItem::from)
            .collect();
    let competition_analysis: Vec<CompetitorItem> = posdash_db::list_competitor_overview(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(CompetitorItem::from)
        .collect();
    let pricing_trends: Vec<PricingTrendItem> = posdash_db::list_pricing_trends(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(PricingTrendItem::from)
        .collect();

    let mut ai_recommendations = Vec::new();
    if let Some(token) = identity.user_token.as_deref() {
        let prompt = build_strategy_prompt(&StrategyInput {
            revenue_by_country: &revenue_by_country,
            competition_analysis: &competition_analysis,
            pricing_trends: &pricing_trends,
        });
        ai_recommendations = match state.claude.as_deref() {
            None => vec![strategy_unavailable("Claude endpoint is not configured")],
            Some(claude) => match claude.invoke(token, &prompt).await {
                Ok(reply) => parse_strategy_reply(&reply),
                Err(e) => {
                    tracing::error!(error = %e, "strategy recommendations failed");
                    vec![strategy_unavailable(&e.to_string())]
                }
            },
        };
    }

    Ok(Json(AnalyticsOverview {
        status: "success",
        revenue_by_country,
        competition_analysis,
        pricing_trends,
        ai_recommendations,
        generated_at: Utc::now(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
