pub const SCHEMA: &str = r#"
-- users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    last_digest_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- subscriptions table (one row per user per channel)
CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL DEFAULT '',
    category TEXT,
    added_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_user_id ON subscriptions(user_id);

-- videos table (replaced on every digest run)
CREATE TABLE IF NOT EXISTS videos (
    id TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    channel_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    published_at TEXT,
    thumbnail_url TEXT NOT NULL DEFAULT '',
    views INTEGER,
    duration_seconds INTEGER,
    transcript TEXT,
    summary TEXT,
    summary_status TEXT,
    ai_title TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_videos_user_id ON videos(user_id);
CREATE INDEX IF NOT EXISTS idx_videos_published_at ON videos(published_at DESC);

-- daily_usage table (metrics and stored highlights per user per day)
CREATE TABLE IF NOT EXISTS daily_usage (
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    total_videos INTEGER NOT NULL DEFAULT 0,
    total_summaries INTEGER NOT NULL DEFAULT 0,
    summary_model TEXT NOT NULL DEFAULT 'none',
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    highlights TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, date)
);

-- summary_errors table
CREATE TABLE IF NOT EXISTS summary_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    error_type TEXT NOT NULL,
    error_message TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_summary_errors_created_at ON summary_errors(created_at);
"#;
