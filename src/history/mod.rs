//! SQLite-backed mood history store.

use crate::spotify::Track;
use crate::vibe::ParameterSet;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const HISTORY_LIMIT: usize = 50;

/// One saved resolution: the phrase, what it resolved to, what came back.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub id: i64,
    pub mood_text: String,
    pub params: serde_json::Value,
    pub tracks: Vec<Track>,
    pub created_at: String,
}

/// SQLite-backed history store.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .context("Failed to open history database")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on history database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS mood_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                mood_text TEXT NOT NULL,
                params TEXT NOT NULL,
                tracks TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create mood_history table")?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_mood_history_user ON mood_history(user_id)",
            [],
        )?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM mood_history", [], |r| r.get(0))?;
        info!("History store ready: {} entries", count);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn save(
        &self,
        user_id: &str,
        mood_text: &str,
        resolved: &ParameterSet,
        tracks: &[Track],
    ) -> Result<i64> {
        let params_json = serde_json::to_string(resolved)?;
        let tracks_json = serde_json::to_string(tracks)?;
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO mood_history (user_id, mood_text, params, tracks, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, mood_text, params_json, tracks_json, created_at],
        )
        .context("Failed to insert history entry")?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent entries for a user, newest first, capped at 50.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<HistoryItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, mood_text, params, tracks, created_at
             FROM mood_history WHERE user_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, HISTORY_LIMIT as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (id, mood_text, params_json, tracks_json, created_at) = row?;
            let params = serde_json::from_str(&params_json).unwrap_or_else(|e| {
                warn!(id, error = %e, "Malformed params JSON in history db");
                serde_json::Value::Null
            });
            let tracks = serde_json::from_str(&tracks_json).unwrap_or_else(|e| {
                warn!(id, error = %e, "Malformed tracks JSON in history db");
                Vec::new()
            });
            items.push(HistoryItem {
                id,
                mood_text,
                params,
                tracks,
                created_at,
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SqliteHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Track {id}"),
            artists: vec!["Artist".to_string()],
            preview_url: None,
            external_url: Some(format!("https://example.com/{id}")),
            image_url: None,
            duration_ms: Some(180_000),
        }
    }

    fn sample_params() -> ParameterSet {
        let mut p = ParameterSet::default();
        p.set_target("target_energy", 0.7);
        p.seed_genres = vec!["pop".to_string()];
        p
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let (_dir, store) = store();
        let id = store
            .save("u1", "happy morning", &sample_params(), &[track("a"), track("b")])
            .unwrap();
        assert!(id > 0);

        let items = store.list_for_user("u1").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].mood_text, "happy morning");
        assert_eq!(items[0].tracks.len(), 2);
        assert_eq!(items[0].params["targets"]["target_energy"], 0.7);
    }

    #[test]
    fn test_list_is_newest_first_and_scoped_to_user() {
        let (_dir, store) = store();
        store.save("u1", "first", &sample_params(), &[]).unwrap();
        store.save("u2", "other user", &sample_params(), &[]).unwrap();
        store.save("u1", "second", &sample_params(), &[]).unwrap();

        let items = store.list_for_user("u1").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].mood_text, "second");
        assert_eq!(items[1].mood_text, "first");
    }

    #[test]
    fn test_list_caps_at_fifty() {
        let (_dir, store) = store();
        for i in 0..60 {
            store
                .save("u1", &format!("mood {i}"), &sample_params(), &[])
                .unwrap();
        }
        let items = store.list_for_user("u1").unwrap();
        assert_eq!(items.len(), 50);
        assert_eq!(items[0].mood_text, "mood 59");
    }

    #[test]
    fn test_unknown_user_gets_empty_list() {
        let (_dir, store) = store();
        assert!(store.list_for_user("nobody").unwrap().is_empty());
    }
}
