pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- subscriptions table
CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    description TEXT,
    opt_in INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'published'
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_name ON subscriptions(name);

-- posts table
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY NOT NULL,
    subject TEXT NOT NULL,
    preview_text TEXT NOT NULL,
    received_at TEXT NOT NULL,
    url TEXT,
    cover_image_url TEXT,
    subscription_id TEXT REFERENCES subscriptions(id),
    is_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_received_at ON posts(received_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_subscription_id ON posts(subscription_id);
CREATE INDEX IF NOT EXISTS idx_posts_is_read ON posts(is_read);

-- cursors table (one row per paginated feed)
CREATE TABLE IF NOT EXISTS cursors (
    entity TEXT PRIMARY KEY NOT NULL,
    cursor TEXT
);
"#;

/// Cursor row used by the posts feed.
pub const POSTS_CURSOR: &str = "posts";
