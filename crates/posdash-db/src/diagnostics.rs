//! Step-by-step database probe backing the database health endpoint.

use serde::Serialize;
use sqlx::PgPool;

use crate::businesses::count_geocoded_businesses;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    NoConnectionPool,
    Healthy,
    Partial,
    ConnectionFailed,
}

/// Outcome of each probe step. A failed step records its error text and the
/// remaining steps still run.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseProbe {
    pub status: ProbeStatus,
    pub pool_status: bool,
    pub connection: bool,
    pub test_query: bool,
    pub schema_access: bool,
    pub table_access: bool,
    pub data_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_query_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseProbe {
    fn new(pool_status: bool) -> Self {
        Self {
            status: ProbeStatus::NoConnectionPool,
            pool_status,
            connection: false,
            test_query: false,
            schema_access: false,
            table_access: false,
            data_count: 0,
            test_query_error: None,
            schema_error: None,
            table_error: None,
            error: None,
        }
    }

    /// `true` only when every step succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }
}

/// Acquires a connection and runs the test query, schema lookup, and
/// businesses count on it.
pub async fn probe_database(pool: Option<&PgPool>, schema: &str) -> DatabaseProbe {
    let Some(pool) = pool else {
        return DatabaseProbe::new(false);
    };
    let mut probe = DatabaseProbe::new(true);

    let mut conn = match pool.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "database probe: connection failed");
            probe.status = ProbeStatus::ConnectionFailed;
            probe.error = Some(e.to_string());
            return probe;
        }
    };
    probe.connection = true;

    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&mut *conn)
        .await
    {
        Ok(_) => probe.test_query = true,
        Err(e) => probe.test_query_error = Some(e.to_string()),
    }

    match sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = $1",
    )
    .bind(schema)
    .fetch_one(&mut *conn)
    .await
    {
        Ok(count) => probe.schema_access = count > 0,
        Err(e) => probe.schema_error = Some(e.to_string()),
    }

    match count_geocoded_businesses(&mut *conn).await {
        Ok(count) => {
            probe.table_access = true;
            probe.data_count = count;
        }
        Err(e) => probe.table_error = Some(e.to_string()),
    }

    probe.status = if probe.test_query && probe.schema_access && probe.table_access {
        ProbeStatus::Healthy
    } else {
        ProbeStatus::Partial
    };
    probe
}
