use crate::models::{PipelineRun, SummaryStats};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

pub const DB_FILE: &str = "wildfire.db";

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_NO_DATA: &str = "no_data";
pub const STATUS_ERROR: &str = "error";

pub async fn init(data_dir: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE);
    let database_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
    connect(&database_url).await
}

/// Opens the pool and applies migrations. An in-memory database is private
/// to its connection, so it gets a single-connection pool.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    log::info!("Connecting to SQLite database: {}", database_url);

    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .with_context(|| format!("Failed to open {}", database_url))?;

    log::debug!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    log::info!("Database initialized successfully.");
    Ok(pool)
}

/// Replaces the singleton summary in one statement, so readers never see
/// a half-written record.
pub async fn save_summary_stats(pool: &SqlitePool, stats: &SummaryStats) -> Result<()> {
    sqlx::query(
        "INSERT INTO stats (id, total_detections, dominant_risk, intensity, area, last_updated)
         VALUES (1, $1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET
            total_detections = EXCLUDED.total_detections,
            dominant_risk = EXCLUDED.dominant_risk,
            intensity = EXCLUDED.intensity,
            area = EXCLUDED.area,
            last_updated = EXCLUDED.last_updated,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(stats.total_detections)
    .bind(&stats.dominant_risk)
    .bind(&stats.intensity)
    .bind(&stats.area)
    .bind(&stats.last_updated)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_summary_stats(pool: &SqlitePool) -> Result<Option<SummaryStats>> {
    let stats = sqlx::query_as::<_, SummaryStats>(
        "SELECT total_detections, dominant_risk, intensity, area, last_updated FROM stats WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(stats)
}

pub async fn save_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(record) => Ok(Some(record.try_get("value")?)),
        None => Ok(None),
    }
}

pub async fn start_run(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("INSERT INTO pipeline_runs (started_at, status) VALUES ($1, $2) RETURNING id")
        .bind(Utc::now())
        .bind(STATUS_RUNNING)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("id")?)
}

pub async fn finish_run(
    pool: &SqlitePool,
    run_id: i64,
    status: &str,
    detections: Option<i64>,
    message: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE pipeline_runs
         SET finished_at = $1, status = $2, detections = $3, message = $4
         WHERE id = $5",
    )
    .bind(Utc::now())
    .bind(status)
    .bind(detections)
    .bind(message)
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Newest first.
pub async fn recent_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<PipelineRun>> {
    let runs = sqlx::query_as::<_, PipelineRun>(
        "SELECT id, started_at, finished_at, status, detections, message
         FROM pipeline_runs ORDER BY id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: i64, risk: &str) -> SummaryStats {
        SummaryStats {
            total_detections: total,
            dominant_risk: risk.to_string(),
            intensity: "12.5 MW".to_string(),
            area: "1,400 ha".to_string(),
            last_updated: "01/02/2026 09:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_summary_absent_then_upserted() {
        let pool = connect("sqlite::memory:").await.unwrap();
        assert!(get_summary_stats(&pool).await.unwrap().is_none());

        save_summary_stats(&pool, &record(100, "ALTO")).await.unwrap();
        save_summary_stats(&pool, &record(250, "EXTREMO")).await.unwrap();

        let stored = get_summary_stats(&pool).await.unwrap().unwrap();
        assert_eq!(stored, record(250, "EXTREMO"));

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM stats")
            .fetch_one(&pool)
            .await
            .unwrap()
            .try_get("n")
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let pool = connect("sqlite::memory:").await.unwrap();
        assert_eq!(get_setting(&pool, "MAP_KEY").await.unwrap(), None);

        save_setting(&pool, "MAP_KEY", "abc").await.unwrap();
        save_setting(&pool, "MAP_KEY", "def").await.unwrap();
        assert_eq!(get_setting(&pool, "MAP_KEY").await.unwrap().as_deref(), Some("def"));
    }

    #[tokio::test]
    async fn test_run_log() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let first = start_run(&pool).await.unwrap();
        finish_run(&pool, first, STATUS_NO_DATA, None, Some("no detections")).await.unwrap();
        let second = start_run(&pool).await.unwrap();

        let runs = recent_runs(&pool, 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[0].status, STATUS_RUNNING);
        assert!(runs[0].finished_at.is_none());
        assert_eq!(runs[1].status, STATUS_NO_DATA);
        assert_eq!(runs[1].message.as_deref(), Some("no detections"));
        assert!(runs[1].finished_at.is_some());
    }
}
