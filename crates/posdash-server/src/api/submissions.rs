use axum::{extract::State, Extension, Json};
use chrono::Utc;
use posdash_core::{NormalizedPosRecord, RawBusinessRecord};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SubmissionsResponse {
    status: &'static str,
    data: Vec<NormalizedPosRecord>,
    count: usize,
    data_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
    meta: ResponseMeta,
}

fn sample_records() -> Vec<NormalizedPosRecord> {
    posdash_pipeline::generate_sample_records(&mut rand::rng(), Utc::now())
}

/// Normalized POS records from the businesses table, or generated sample
/// records when no database is connected.
pub(super) async fn list_pos_submissions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SubmissionsResponse>, ApiError> {
    let Some(pool) = state.pool.as_ref() else {
        tracing::info!("no database connection, serving sample submissions");
        let data = sample_records();
        return Ok(Json(SubmissionsResponse {
            status: "success",
            count: data.len(),
            data,
            data_source: "sample_data",
            note: Some("Using sample data - database not available"),
            meta: ResponseMeta::new(req_id.0),
        }));
    };

    let rows = posdash_db::list_geocoded_businesses(pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let raw: Vec<RawBusinessRecord> = rows.into_iter().map(RawBusinessRecord::from).collect();
    let data = posdash_pipeline::normalize_records(&raw);
    tracing::info!(rows = raw.len(), records = data.len(), "normalized submissions");

    Ok(Json(SubmissionsResponse {
        status: "success",
        count: data.len(),
        data,
        data_source: "postgres",
        note: None,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use super::super::{build_app, send, test_state};

    #[tokio::test]
    async fn sample_data_without_pool() {
        let app = build_app(test_state(std::env::temp_dir()));
        let (status, json) = send(
            app,
            Request::builder()
                .uri("/api/pos-submissions")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["data_source"], "sample_data");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(json["count"].as_u64(), Some(data.len() as u64));
        assert!((20..=30).contains(&data.len()));
        assert!(data
            .iter()
            .all(|r| r["productFamilies"].as_array().is_some_and(|f| !f.is_empty())));
        assert!(json["note"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn postgres_rows_are_normalized(pool: sqlx::PgPool) {
        sqlx::query(
            "INSERT INTO businesses (name, type, address, latitude, longitude, is_danone_customer, menu_items) \
             VALUES ('Hyper U Lyon', NULL, '1 Rue X, Lyon, FR', 45.76, 4.83, true, '[]'::jsonb), \
                    ('Nowhere', NULL, NULL, NULL, 2.0, false, '[]'::jsonb)",
        )
        .execute(&pool)
        .await
        .expect("insert businesses");

        let mut state = test_state(std::env::temp_dir());
        state.pool = Some(pool);
        let (status, json) = send(
            build_app(state),
            Request::builder()
                .uri("/api/pos-submissions")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data_source"], "postgres");
        assert_eq!(json["count"], 1);
        let record = &json["data"][0];
        assert_eq!(record["businessType"], "Hypermarket");
        assert_eq!(record["city"], "Lyon");
        assert_eq!(record["country"], "France");
        assert_eq!(record["salesVolume"], 40_000);
        assert_eq!(record["submissionData"]["points_earned"], 50);
    }
}
