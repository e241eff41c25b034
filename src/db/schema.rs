//! SQL DDL for the blog tables (SQLite).

/// Timestamps are RFC3339 text (see `models::format_timestamp`).
/// `flagged` is stored as INTEGER 0/1.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    published_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    author_name TEXT NOT NULL,
    text TEXT NOT NULL,
    created_date TEXT NOT NULL,
    flagged INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_published_date ON posts(published_date);
CREATE INDEX IF NOT EXISTS idx_comments_post_created ON comments(post_id, created_date);
CREATE INDEX IF NOT EXISTS idx_comments_flagged ON comments(flagged)
"#;
