//! SQL schema for the vidtube SQLite store.
//!
//! Executed once at connection startup; versioned through
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. `seq` fixes the natural (insertion) order and is
-- kept across updates.
CREATE TABLE IF NOT EXISTS documents (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    body        TEXT NOT NULL,   -- JSON object, including _id
    UNIQUE (collection, doc_id)
);

-- Keys of every unique index a document participates in.
CREATE TABLE IF NOT EXISTS unique_keys (
    collection  TEXT NOT NULL,
    index_name  TEXT NOT NULL,
    key         TEXT NOT NULL,   -- JSON array of the indexed field values
    doc_id      TEXT NOT NULL,
    PRIMARY KEY (collection, index_name, key)
);

CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents(collection, seq);
CREATE INDEX IF NOT EXISTS unique_keys_doc_idx      ON unique_keys(collection, doc_id);

-- Join and lookup fields. The expressions must match those emitted by
-- `query::condition` for the planner to use them.
CREATE INDEX IF NOT EXISTS documents_owner_idx      ON documents(collection, json_extract(body, '$.owner'));
CREATE INDEX IF NOT EXISTS documents_video_idx      ON documents(collection, json_extract(body, '$.video'));
CREATE INDEX IF NOT EXISTS documents_comment_idx    ON documents(collection, json_extract(body, '$.comment'));
CREATE INDEX IF NOT EXISTS documents_tweet_idx      ON documents(collection, json_extract(body, '$.tweet'));
CREATE INDEX IF NOT EXISTS documents_liked_by_idx   ON documents(collection, json_extract(body, '$.likedBy'));
CREATE INDEX IF NOT EXISTS documents_channel_idx    ON documents(collection, json_extract(body, '$.channel'));
CREATE INDEX IF NOT EXISTS documents_subscriber_idx ON documents(collection, json_extract(body, '$.subscriber'));
CREATE INDEX IF NOT EXISTS documents_username_idx   ON documents(collection, json_extract(body, '$.username'));
CREATE INDEX IF NOT EXISTS documents_email_idx      ON documents(collection, json_extract(body, '$.email'));

PRAGMA user_version = 2;
";
