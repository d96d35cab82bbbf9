use std::str::FromStr;
use std::time::Duration;

use posdash_core::{DatabaseConfig, DatabaseTarget};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use thiserror::Error;

pub mod analytics;
pub mod businesses;
pub mod diagnostics;

pub use analytics::{
    get_analytics_summary, list_competition_analytics, list_competitor_overview,
    list_pricing_analytics, list_pricing_trends, list_recent_revenue_by_country,
    list_volume_analytics, AnalyticsSummary, CompetitionRow, CompetitionSummaryRow,
    CompetitorOverviewRow, CountryRevenueRow, PricingRow, PricingSummaryRow, PricingTrendRow,
    RegionVolumeRow, VolumeRow, VolumeSummaryRow,
};
pub use businesses::{count_geocoded_businesses, list_geocoded_businesses, BusinessRow};
pub use diagnostics::{probe_database, DatabaseProbe, ProbeStatus};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/posdash-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_database_config(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout_secs: config.acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Builds connect options for the configured target.
///
/// Connections made from individual parts always require SSL; a full URL
/// keeps whatever `sslmode` it carries. The configured schema becomes the
/// session `search_path` either way.
///
/// # Errors
///
/// Returns [`sqlx::Error::Configuration`] if `DATABASE_URL` cannot be parsed.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let options = match &config.target {
        DatabaseTarget::Url(url) => PgConnectOptions::from_str(url)?,
        DatabaseTarget::Parts {
            host,
            port,
            database,
            user,
            password,
        } => {
            let options = PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(user)
                .ssl_mode(PgSslMode::Require);
            match password {
                Some(password) => options.password(password),
                None => options,
            }
        }
    };
    Ok(options.options([("search_path", config.schema.as_str())]))
}

/// Connect to a Postgres pool using explicit options and pool bounds.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(
    options: PgConnectOptions,
    config: PoolConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
}

/// Connect a pool for the given database configuration.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the options are invalid or the connection
/// cannot be established.
pub async fn connect_pool_from_config(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options = connect_options(config)?;
    let pool = connect_pool(options, PoolConfig::from_database_config(config)).await?;
    tracing::info!(
        schema = %config.schema,
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // _sqlx_migrations does not exist yet on a fresh database; treat that as zero.
    let applied_before = applied_migration_count(pool).await;
    MIGRATOR.run(pool).await?;
    let applied_after = applied_migration_count(pool).await;

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

async fn applied_migration_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}
