//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `profiles`, `requests`, `messages`, `posts`,
//! `post_likes`, `comments` and `replies`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Profiles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    user_id          TEXT PRIMARY KEY NOT NULL, -- opaque id from the identity provider
    display_name     TEXT NOT NULL,
    role             TEXT NOT NULL,             -- 'Student' | 'Alumni'
    affiliation      TEXT NOT NULL DEFAULT '',
    bio              TEXT NOT NULL DEFAULT '',
    experience_years INTEGER NOT NULL DEFAULT 0,
    rating_total     REAL NOT NULL DEFAULT 0,   -- full-precision sum of submitted stars
    rating_count     INTEGER NOT NULL DEFAULT 0,
    session_count    INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL              -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_profiles_role ON profiles(role);

-- ----------------------------------------------------------------
-- Mentorship requests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS requests (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4; doubles as channel key
    sender_id   TEXT NOT NULL,
    sender_name TEXT NOT NULL,
    mentor_id   TEXT NOT NULL,
    mentor_name TEXT NOT NULL,
    message     TEXT NOT NULL,
    mode        TEXT NOT NULL,                  -- 'Video Call' | 'Audio' | 'Chat'
    status      TEXT NOT NULL DEFAULT 'Pending',
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_requests_sender ON requests(sender_id);
CREATE INDEX IF NOT EXISTS idx_requests_mentor ON requests(mentor_id);

-- ----------------------------------------------------------------
-- Channel messages; the rowid is the commit sequence and total order
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT NOT NULL UNIQUE,            -- UUID v4
    channel_id TEXT NOT NULL,                   -- FK -> requests(id)
    sender_id  TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL,                   -- assigned at commit time

    FOREIGN KEY (channel_id) REFERENCES requests(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_seq
    ON messages(channel_id, seq);

-- ----------------------------------------------------------------
-- Feed posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id                 TEXT PRIMARY KEY NOT NULL,
    author_id          TEXT NOT NULL,
    author_name        TEXT NOT NULL,
    author_role        TEXT NOT NULL,
    author_affiliation TEXT NOT NULL DEFAULT '',
    content            TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

-- Like set; the pair primary key makes duplicate membership impossible
CREATE TABLE IF NOT EXISTS post_likes (
    post_id    TEXT NOT NULL,                   -- FK -> posts(id)
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (post_id, user_id),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Comment tree: two related tables keep the depth-2 invariant structural
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,           -- UUID v4
    post_id     TEXT NOT NULL,                  -- FK -> posts(id)
    author_id   TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_role TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, seq);

CREATE TABLE IF NOT EXISTS replies (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,           -- UUID v4
    comment_id  TEXT NOT NULL,                  -- FK -> comments(id)
    author_id   TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_role TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_replies_comment ON replies(comment_id, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
