//! Per-user search history.
//!
//! Each completed analysis stores the query and its enriched records keyed
//! by user and timestamp. Scores are not stored: they depend on the time
//! of evaluation and the prediction service, so a reloaded entry shows the
//! records as they were fetched.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::EnrichedRecord;

/// Listing row without the (potentially large) results payload.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub id: String,
    pub query: String,
    pub searched_at: i64,
    pub result_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub user: String,
    pub query: String,
    pub searched_at: i64,
    pub results: Vec<EnrichedRecord>,
}

pub async fn save(
    pool: &SqlitePool,
    user: &str,
    query: &str,
    records: &[EnrichedRecord],
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let results_json = serde_json::to_string(records)?;

    sqlx::query(
        "INSERT INTO search_history (id, user, query, searched_at, results_json) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user)
    .bind(query)
    .bind(Utc::now().timestamp_millis())
    .bind(results_json)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Newest first.
pub async fn list(pool: &SqlitePool, user: &str) -> Result<Vec<HistorySummary>> {
    let rows = sqlx::query(
        "SELECT id, query, searched_at, results_json FROM search_history WHERE user = ? ORDER BY searched_at DESC, rowid DESC",
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<HistorySummary> {
            let results_json: String = row.get("results_json");
            let results: Vec<serde_json::Value> = serde_json::from_str(&results_json)?;
            Ok(HistorySummary {
                id: row.get("id"),
                query: row.get("query"),
                searched_at: row.get("searched_at"),
                result_count: results.len(),
            })
        })
        .collect()
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<HistoryEntry>> {
    let row = sqlx::query(
        "SELECT id, user, query, searched_at, results_json FROM search_history WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let results_json: String = row.get("results_json");
    Ok(Some(HistoryEntry {
        id: row.get("id"),
        user: row.get("user"),
        query: row.get("query"),
        searched_at: row.get("searched_at"),
        results: serde_json::from_str(&results_json)?,
    }))
}

/// Returns whether a row was removed.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM search_history WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns the number of rows removed.
pub async fn delete_all(pool: &SqlitePool, user: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_history WHERE user = ?")
        .bind(user)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

async fn open(config: &Config) -> Result<SqlitePool> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(pool)
}

pub async fn run_history_list(config: &Config) -> Result<()> {
    let pool = open(config).await?;
    let entries = list(&pool, &config.history.user).await?;
    pool.close().await;

    if entries.is_empty() {
        println!("No search history.");
        return Ok(());
    }

    println!("{:<36}  {:<20}  {:>7}  QUERY", "ID", "SEARCHED AT", "RESULTS");
    for e in entries {
        println!(
            "{:<36}  {:<20}  {:>7}  {}",
            e.id,
            format_ts(e.searched_at),
            e.result_count,
            e.query
        );
    }
    Ok(())
}

pub async fn run_history_show(config: &Config, id: &str, json: bool) -> Result<()> {
    let pool = open(config).await?;
    let entry = get(&pool, id).await?;
    pool.close().await;

    let Some(entry) = entry else {
        bail!("history entry not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    println!("query:       {}", entry.query);
    println!("searched_at: {}", format_ts(entry.searched_at));
    println!("results:     {}", entry.results.len());
    println!();
    for r in &entry.results {
        println!(
            "{:<12} {}",
            r.id,
            r.snippet.title.as_deref().unwrap_or("(untitled)")
        );
    }
    Ok(())
}

pub async fn run_history_delete(config: &Config, id: &str) -> Result<()> {
    let pool = open(config).await?;
    let removed = delete(&pool, id).await?;
    pool.close().await;

    if !removed {
        bail!("history entry not found: {}", id);
    }
    println!("Deleted {}.", id);
    Ok(())
}

pub async fn run_history_clear(config: &Config) -> Result<()> {
    let pool = open(config).await?;
    let removed = delete_all(&pool, &config.history.user).await?;
    pool.close().await;

    println!("Deleted {} history entries.", removed);
    Ok(())
}

fn format_ts(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupDetail, Snippet};
    use tempfile::TempDir;

    fn record(id: &str) -> EnrichedRecord {
        EnrichedRecord {
            id: id.into(),
            snippet: Snippet {
                title: Some(format!("title {}", id)),
                ..Default::default()
            },
            statistics: None,
            content_details: None,
            channel: GroupDetail::placeholder("UC1"),
        }
    }

    async fn pool(tmp: &TempDir) -> SqlitePool {
        let mut config = Config::default();
        config.history.path = tmp.path().join("history.sqlite");
        open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;

        let records = vec![record("A"), record("B")];
        let id = save(&pool, "alice", "rust", &records).await.unwrap();

        let entry = get(&pool, &id).await.unwrap().unwrap();
        assert_eq!(entry.user, "alice");
        assert_eq!(entry.query, "rust");
        assert_eq!(entry.results, records);
        assert!(get(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_per_user_newest_first() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;

        save(&pool, "alice", "first", &[record("A")]).await.unwrap();
        save(&pool, "bob", "other", &[]).await.unwrap();
        save(&pool, "alice", "second", &[record("A"), record("B")]).await.unwrap();

        let entries = list(&pool, "alice").await.unwrap();
        let queries: Vec<_> = entries.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["second", "first"]);
        assert_eq!(entries[0].result_count, 2);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;

        let id = save(&pool, "alice", "one", &[]).await.unwrap();
        save(&pool, "alice", "two", &[]).await.unwrap();
        save(&pool, "bob", "three", &[]).await.unwrap();

        assert!(delete(&pool, &id).await.unwrap());
        assert!(!delete(&pool, &id).await.unwrap());
        assert_eq!(delete_all(&pool, "alice").await.unwrap(), 1);
        assert_eq!(list(&pool, "bob").await.unwrap().len(), 1);
    }
}
