//! Database layer — migrations and recorded-run queries.

use chrono::Utc;
use qf_engine::{SimulationConfig, SimulationResult};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// A recorded run, summary columns only.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RunSummary {
    pub id: i64,
    pub formula: String,
    pub matching_pool: f64,
    pub project_count: i64,
    pub donation_count: i64,
    pub flagged_count: i64,
    pub total_matching: f64,
    pub reserved_funds: f64,
    pub created_at: i64,
}

/// A recorded run with the stored config and result JSON.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RunRecord {
    pub id: i64,
    pub formula: String,
    pub matching_pool: f64,
    pub project_count: i64,
    pub donation_count: i64,
    pub flagged_count: i64,
    pub total_matching: f64,
    pub reserved_funds: f64,
    pub config: String,
    pub result: String,
    pub created_at: i64,
}

/// Short tag for the run listing, e.g. `two-tier`.
fn formula_tag(config: &SimulationConfig) -> &'static str {
    use qf_engine::Formula;
    match config.formula {
        Formula::Standard => "standard",
        Formula::Capped { .. } => "capped",
        Formula::TwoTier { .. } => "two-tier",
        Formula::Declining { .. } => "declining",
    }
}

/// Persist one completed run. Returns the new row id.
pub async fn insert_run(
    pool: &SqlitePool,
    config: &SimulationConfig,
    donation_count: usize,
    result: &SimulationResult,
) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO runs
            (formula, matching_pool, project_count, donation_count,
             flagged_count, total_matching, reserved_funds, config, result,
             created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(formula_tag(config))
    .bind(config.matching_pool)
    .bind(result.projects.len() as i64)
    .bind(donation_count as i64)
    .bind(result.flagged_donations.len() as i64)
    .bind(result.total_matching)
    .bind(result.reserved_funds)
    .bind(serde_json::to_string(config)?)
    .bind(serde_json::to_string(result)?)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(row.last_insert_rowid())
}

/// Fetch run summaries, newest first.
pub async fn list_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<RunSummary>> {
    let rows = sqlx::query_as::<_, RunSummary>(
        r#"
        SELECT id, formula, matching_pool, project_count, donation_count,
               flagged_count, total_matching, reserved_funds, created_at
        FROM   runs
        ORDER  BY created_at DESC, id DESC
        LIMIT  ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch one recorded run in full, or `None` if the id is unknown.
pub async fn get_run(pool: &SqlitePool, id: i64) -> Result<Option<RunRecord>> {
    let row = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, formula, matching_pool, project_count, donation_count,
               flagged_count, total_matching, reserved_funds, config, result,
               created_at
        FROM   runs
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
