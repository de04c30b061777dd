//! SQLite-backed persisted topic store.
//!
//! Each analysis is one `topic_analyses` row keyed by the normalized topic,
//! with related areas and affiliate programs in ordered child tables. The
//! write path is an atomic insert-if-absent so concurrent first resolutions
//! of the same topic converge on a single record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{SCHEMA_SQL, SEARCH_LOG_SCHEMA_SQL};
use crate::types::*;
use trendtap_core::{now_millis, AffiliateProgram, Error, ResolutionSource, Result, TopicAnalysis};

/// SQLite store for topic analyses and the search log.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

/// Parent row before its children are attached.
struct TopicRow {
    id: i64,
    topic: String,
    source: String,
    created_at: i64,
    last_accessed_at: i64,
    hit_count: i64,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/trendtap.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("trendtap.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} topics, path={}",
            store.count_topics()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}", SCHEMA_SQL, SEARCH_LOG_SCHEMA_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Topic analyses
    // ---------------------------------------------------------------

    /// Get an analysis by normalized topic without touching its hit count.
    pub fn get_topic(&self, topic: &str) -> Result<Option<TopicAnalysis>> {
        let conn = self.conn.lock();
        Self::load_topic(&conn, topic)
    }

    /// Count a cache hit: bump `hit_count` and `last_accessed_at`, return the updated record.
    pub fn record_hit(&self, topic: &str) -> Result<Option<TopicAnalysis>> {
        let conn = self.conn.lock();
        let count = conn
            .prepare_cached(
                "UPDATE topic_analyses SET hit_count = hit_count + 1, last_accessed_at = ?1 \
                 WHERE topic = ?2",
            )
            .map_err(db_err)?
            .execute(params![now_millis(), topic])
            .map_err(db_err)?;
        if count == 0 {
            return Ok(None);
        }
        Self::load_topic(&conn, topic)
    }

    /// Insert the analysis unless a record for its topic already exists.
    ///
    /// Returns `true` if this call created the record.
    pub fn insert_if_absent(&self, analysis: &TopicAnalysis) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let inserted = tx
            .execute(
                "INSERT INTO topic_analyses (topic, source, created_at, last_accessed_at, hit_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(topic) DO NOTHING",
                params![
                    analysis.topic,
                    analysis.source.as_str(),
                    analysis.created_at,
                    analysis.last_accessed_at,
                    analysis.hit_count,
                ],
            )
            .map_err(db_err)?;
        if inserted == 0 {
            debug!("Topic '{}' already stored, skipping insert", analysis.topic);
            return Ok(false);
        }

        let topic_id = tx.last_insert_rowid();
        Self::insert_children(&tx, topic_id, analysis)?;
        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    /// Supersede an existing record's origin and content, keeping `created_at`
    /// and counting one hit on top of the stored `hit_count`.
    ///
    /// Returns the updated record, or `None` if no record exists for the topic.
    pub fn replace_topic(&self, analysis: &TopicAnalysis) -> Result<Option<TopicAnalysis>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let topic_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM topic_analyses WHERE topic = ?1",
                params![analysis.topic],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let Some(topic_id) = topic_id else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE topic_analyses SET source = ?1, last_accessed_at = ?2, hit_count = hit_count + 1 \
             WHERE id = ?3",
            params![analysis.source.as_str(), analysis.last_accessed_at, topic_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM topic_related_areas WHERE topic_id = ?1",
            params![topic_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM topic_affiliate_programs WHERE topic_id = ?1",
            params![topic_id],
        )
        .map_err(db_err)?;
        Self::insert_children(&tx, topic_id, analysis)?;
        let updated = Self::load_topic(&tx, &analysis.topic)?;
        tx.commit().map_err(db_err)?;
        Ok(updated)
    }

    /// Delete a record and its children (manual curation).
    pub fn delete_topic(&self, topic: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM topic_analyses WHERE topic = ?1", params![topic])
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Count stored topics.
    pub fn count_topics(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM topic_analyses", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// Topics ordered by most recently accessed. Returns (topics, total_count).
    pub fn list_topics(&self, page: usize, page_size: usize) -> Result<(Vec<TopicAnalysis>, i64)> {
        let total = self.count_topics()?;
        let offset = page.saturating_sub(1) * page_size;

        let conn = self.conn.lock();
        let rows: Vec<TopicRow> = {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, topic, source, created_at, last_accessed_at, hit_count \
                     FROM topic_analyses ORDER BY last_accessed_at DESC, id DESC \
                     LIMIT ?1 OFFSET ?2",
                )
                .map_err(db_err)?;
            let mapped = stmt
                .query_map(params![page_size as i64, offset as i64], Self::row_to_topic_row)
                .map_err(db_err)?;
            mapped.collect::<rusqlite::Result<_>>().map_err(db_err)?
        };

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            topics.push(Self::attach_children(&conn, row)?);
        }
        Ok((topics, total))
    }

    fn load_topic(conn: &Connection, topic: &str) -> Result<Option<TopicAnalysis>> {
        let row = conn
            .prepare_cached(
                "SELECT id, topic, source, created_at, last_accessed_at, hit_count \
                 FROM topic_analyses WHERE topic = ?1",
            )
            .map_err(db_err)?
            .query_row(params![topic], Self::row_to_topic_row)
            .optional()
            .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(Self::attach_children(conn, row)?)),
            None => Ok(None),
        }
    }

    fn attach_children(conn: &Connection, row: TopicRow) -> Result<TopicAnalysis> {
        let related_areas = conn
            .prepare_cached(
                "SELECT area FROM topic_related_areas WHERE topic_id = ?1 ORDER BY position",
            )
            .map_err(db_err)?
            .query_map(params![row.id], |r| r.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        let affiliate_programs = conn
            .prepare_cached(
                "SELECT name, commission_description, network_guess \
                 FROM topic_affiliate_programs WHERE topic_id = ?1 ORDER BY position",
            )
            .map_err(db_err)?
            .query_map(params![row.id], |r| {
                Ok(AffiliateProgram {
                    name: r.get(0)?,
                    commission_description: r.get(1)?,
                    network_guess: r.get(2)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok(TopicAnalysis {
            topic: row.topic,
            source: row.source.parse()?,
            related_areas,
            affiliate_programs,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
            hit_count: row.hit_count,
        })
    }

    fn insert_children(conn: &Connection, topic_id: i64, analysis: &TopicAnalysis) -> Result<()> {
        let mut area_stmt = conn
            .prepare_cached(
                "INSERT INTO topic_related_areas (topic_id, position, area) VALUES (?1, ?2, ?3)",
            )
            .map_err(db_err)?;
        for (position, area) in analysis.related_areas.iter().enumerate() {
            area_stmt
                .execute(params![topic_id, position as i64, area])
                .map_err(db_err)?;
        }

        let mut program_stmt = conn
            .prepare_cached(
                "INSERT INTO topic_affiliate_programs \
                 (topic_id, position, name, commission_description, network_guess) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(db_err)?;
        for (position, program) in analysis.affiliate_programs.iter().enumerate() {
            program_stmt
                .execute(params![
                    topic_id,
                    position as i64,
                    program.name,
                    program.commission_description,
                    program.network_guess,
                ])
                .map_err(db_err)?;
        }
        Ok(())
    }

    fn row_to_topic_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TopicRow> {
        Ok(TopicRow {
            id: row.get(0)?,
            topic: row.get(1)?,
            source: row.get(2)?,
            created_at: row.get(3)?,
            last_accessed_at: row.get(4)?,
            hit_count: row.get(5)?,
        })
    }

    // ---------------------------------------------------------------
    // Search log
    // ---------------------------------------------------------------

    /// Append one search log row.
    pub fn append_search_log(&self, entry: &SearchLogEntry) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO search_logs (topic, resolved_source, latency_ms, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(db_err)?
        .execute(params![
            entry.topic,
            entry.resolved_source.as_str(),
            entry.latency_ms,
            entry.timestamp,
        ])
        .map_err(db_err)?;
        Ok(())
    }

    /// Most recent search log rows, newest first.
    pub fn recent_search_logs(&self, limit: usize) -> Result<Vec<SearchLogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT topic, resolved_source, latency_ms, created_at FROM search_logs \
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        rows.into_iter()
            .map(|(topic, source, latency_ms, timestamp)| -> Result<SearchLogEntry> {
                Ok(SearchLogEntry {
                    topic,
                    resolved_source: source.parse::<ResolutionSource>()?,
                    latency_ms,
                    timestamp,
                })
            })
            .collect()
    }

    /// Count all search log rows.
    pub fn count_search_logs(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM search_logs", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// Aggregate request counts, per-source breakdown, latency and top topics.
    pub fn search_stats(&self, top_n: usize) -> Result<SearchStats> {
        let conn = self.conn.lock();

        let (total_requests, avg_latency_ms): (i64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(AVG(latency_ms), 0.0) FROM search_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(db_err)?;

        let by_source: BTreeMap<String, i64> = conn
            .prepare_cached(
                "SELECT resolved_source, COUNT(*) FROM search_logs GROUP BY resolved_source",
            )
            .map_err(db_err)?
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(db_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(db_err)?;

        let top_topics = conn
            .prepare_cached(
                "SELECT topic, COUNT(*) AS n FROM search_logs GROUP BY topic \
                 ORDER BY n DESC, topic ASC LIMIT ?1",
            )
            .map_err(db_err)?
            .query_map(params![top_n as i64], |row| {
                Ok(TopicCount {
                    topic: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok(SearchStats {
            total_requests,
            by_source,
            avg_latency_ms,
            top_topics,
        })
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_topics = self.count_topics()?;
        let total_search_logs = self.count_search_logs()?;
        let db_size_mb = std::fs::metadata(&self.db_path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        Ok(StoreStats {
            total_topics,
            total_search_logs,
            db_path: self.db_path.display().to_string(),
            db_size_mb: (db_size_mb * 100.0).round() / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn sample(topic: &str, source: ResolutionSource) -> TopicAnalysis {
        TopicAnalysis::new(
            topic,
            source,
            vec!["espresso".into(), "grinders".into(), "latte art".into()],
            vec![
                AffiliateProgram {
                    name: "Amazon Associates".into(),
                    commission_description: "1-4% on kitchen".into(),
                    network_guess: "Amazon".into(),
                },
                AffiliateProgram {
                    name: "Breville".into(),
                    commission_description: "5% per sale".into(),
                    network_guess: "Impact".into(),
                },
            ],
        )
    }

    fn log(topic: &str, source: ResolutionSource, latency_ms: i64, timestamp: i64) -> SearchLogEntry {
        SearchLogEntry {
            topic: topic.into(),
            resolved_source: source,
            latency_ms,
            timestamp,
        }
    }

    #[test]
    fn test_insert_and_get_topic() {
        let (store, _dir) = test_store();
        let analysis = sample("best coffee machines", ResolutionSource::Pattern);

        assert!(store.insert_if_absent(&analysis).unwrap());

        let stored = store.get_topic("best coffee machines").unwrap().unwrap();
        assert_eq!(stored.source, ResolutionSource::Pattern);
        assert_eq!(stored.related_areas, vec!["espresso", "grinders", "latte art"]);
        assert_eq!(stored.affiliate_programs.len(), 2);
        assert_eq!(stored.affiliate_programs[1].name, "Breville");
        assert_eq!(stored.hit_count, 1);
    }

    #[test]
    fn test_missing_topic() {
        let (store, _dir) = test_store();
        assert!(store.get_topic("nothing here").unwrap().is_none());
        assert!(store.record_hit("nothing here").unwrap().is_none());
    }

    #[test]
    fn test_insert_if_absent_keeps_first_record() {
        let (store, _dir) = test_store();
        let first = sample("home gym", ResolutionSource::Pattern);
        let mut second = sample("home gym", ResolutionSource::Llm);
        second.related_areas = vec!["kettlebells".into()];

        assert!(store.insert_if_absent(&first).unwrap());
        assert!(!store.insert_if_absent(&second).unwrap());

        let stored = store.get_topic("home gym").unwrap().unwrap();
        assert_eq!(stored.source, ResolutionSource::Pattern);
        assert_eq!(stored.related_areas.len(), 3);
        assert_eq!(store.count_topics().unwrap(), 1);
    }

    #[test]
    fn test_record_hit_increments_by_one() {
        let (store, _dir) = test_store();
        let analysis = sample("vegan protein", ResolutionSource::Llm);
        store.insert_if_absent(&analysis).unwrap();

        let hit = store.record_hit("vegan protein").unwrap().unwrap();
        assert_eq!(hit.hit_count, 2);
        assert!(hit.last_accessed_at >= analysis.last_accessed_at);

        let hit = store.record_hit("vegan protein").unwrap().unwrap();
        assert_eq!(hit.hit_count, 3);
    }

    #[test]
    fn test_replace_topic_supersedes_content() {
        let (store, _dir) = test_store();
        let original = sample("travel backpacks", ResolutionSource::Pattern);
        store.insert_if_absent(&original).unwrap();

        let newer = TopicAnalysis::new(
            "travel backpacks",
            ResolutionSource::Llm,
            vec!["carry-on luggage".into()],
            Vec::new(),
        );
        let updated = store.replace_topic(&newer).unwrap().unwrap();
        assert_eq!(updated.source, ResolutionSource::Llm);
        assert_eq!(updated.hit_count, 2);

        let stored = store.get_topic("travel backpacks").unwrap().unwrap();
        assert_eq!(stored.source, ResolutionSource::Llm);
        assert_eq!(stored.related_areas, vec!["carry-on luggage"]);
        assert!(stored.affiliate_programs.is_empty());
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.hit_count, 2);

        let absent = sample("never stored", ResolutionSource::Llm);
        assert!(store.replace_topic(&absent).unwrap().is_none());
    }

    #[test]
    fn test_replace_topic_keeps_concurrent_hits() {
        let (store, _dir) = test_store();
        let original = sample("trail running", ResolutionSource::Pattern);
        store.insert_if_absent(&original).unwrap();
        let read = store.get_topic("trail running").unwrap().unwrap();

        store.record_hit("trail running").unwrap();
        store.record_hit("trail running").unwrap();

        let mut newer = sample("trail running", ResolutionSource::Llm);
        newer.hit_count = read.hit_count + 1;
        let updated = store.replace_topic(&newer).unwrap().unwrap();
        assert_eq!(updated.hit_count, 4);
        assert_eq!(store.get_topic("trail running").unwrap().unwrap().hit_count, 4);
    }

    #[test]
    fn test_delete_topic_cascades() {
        let (store, _dir) = test_store();
        store
            .insert_if_absent(&sample("standing desks", ResolutionSource::Pattern))
            .unwrap();

        assert!(store.delete_topic("standing desks").unwrap());
        assert!(store.get_topic("standing desks").unwrap().is_none());
        assert!(!store.delete_topic("standing desks").unwrap());

        let conn = store.conn.lock();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM topic_related_areas", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_list_topics_pagination() {
        let (store, _dir) = test_store();
        for i in 0..5 {
            let mut analysis = sample(&format!("topic {}", i), ResolutionSource::Pattern);
            analysis.last_accessed_at = 1_000 + i;
            store.insert_if_absent(&analysis).unwrap();
        }

        let (page1, total) = store.list_topics(1, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].topic, "topic 4");
        assert_eq!(page1[0].related_areas.len(), 3);

        let (page3, _) = store.list_topics(3, 2).unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].topic, "topic 0");
    }

    #[test]
    fn test_search_log_stats() {
        let (store, _dir) = test_store();
        store.append_search_log(&log("keto", ResolutionSource::Pattern, 10, 1)).unwrap();
        store.append_search_log(&log("keto", ResolutionSource::Database, 2, 2)).unwrap();
        store.append_search_log(&log("golf", ResolutionSource::Fallback, 30, 3)).unwrap();

        let stats = store.search_stats(10).unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.by_source["pattern"], 1);
        assert_eq!(stats.by_source["database"], 1);
        assert_eq!(stats.by_source["fallback"], 1);
        assert!((stats.avg_latency_ms - 14.0).abs() < 1e-9);
        assert_eq!(stats.top_topics[0].topic, "keto");
        assert_eq!(stats.top_topics[0].count, 2);

        let recent = store.recent_search_logs(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].topic, "golf");
        assert_eq!(recent[0].resolved_source, ResolutionSource::Fallback);
    }

    #[test]
    fn test_empty_search_stats() {
        let (store, _dir) = test_store();
        let stats = store.search_stats(5).unwrap();
        assert_eq!(stats.total_requests, 0);
        assert!(stats.by_source.is_empty());
        assert_eq!(stats.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();
        store
            .insert_if_absent(&sample("drones", ResolutionSource::Llm))
            .unwrap();
        store.append_search_log(&log("drones", ResolutionSource::Llm, 500, 1)).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_topics, 1);
        assert_eq!(stats.total_search_logs, 1);
        assert!(stats.db_path.ends_with("trendtap.db"));
    }
}
