//! Database schema SQL.

/// Topic analyses and their ordered child rows.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS topic_analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS topic_related_areas (
    topic_id INTEGER NOT NULL REFERENCES topic_analyses(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    area TEXT NOT NULL,
    PRIMARY KEY (topic_id, position)
);

CREATE TABLE IF NOT EXISTS topic_affiliate_programs (
    topic_id INTEGER NOT NULL REFERENCES topic_analyses(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    commission_description TEXT NOT NULL DEFAULT '',
    network_guess TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (topic_id, position)
);

CREATE INDEX IF NOT EXISTS idx_topic_analyses_accessed ON topic_analyses(last_accessed_at);
"#;

/// Append-only resolution log. `topic` is a denormalized join key, not a foreign key.
pub const SEARCH_LOG_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS search_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT NOT NULL,
    resolved_source TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_logs_topic ON search_logs(topic);
CREATE INDEX IF NOT EXISTS idx_search_logs_created ON search_logs(created_at);
"#;
