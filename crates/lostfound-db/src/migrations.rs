use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, items)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                roll_number   TEXT NOT NULL UNIQUE,
                password      TEXT NOT NULL,
                name          TEXT NOT NULL,
                phone_number  TEXT NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE items (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                item_type      TEXT NOT NULL,
                description    TEXT NOT NULL,
                reporter_name  TEXT NOT NULL,
                phone_number   TEXT NOT NULL,
                is_found       INTEGER NOT NULL CHECK (is_found IN (0, 1)),
                report_id      TEXT NOT NULL UNIQUE,
                status         TEXT NOT NULL DEFAULT 'pending'
                               CHECK (status IN ('pending', 'resolved')),
                user_id        INTEGER NOT NULL REFERENCES users(id),
                created_at     TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_items_match
                ON items(item_type, is_found, status);

            CREATE INDEX idx_items_status_created
                ON items(status, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
