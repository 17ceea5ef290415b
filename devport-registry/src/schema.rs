//! Table layout (spec §6). Uniqueness of `port` among active (non-expired)
//! rows is *not* a static SQL constraint — SQLite partial indexes can't
//! express a predicate that depends on the current time, since it would
//! only be re-evaluated on writes to the indexed row, not as the wall
//! clock advances underneath it. Instead every transaction that could
//! violate the invariant (`claim`) runs under `BEGIN IMMEDIATE` and
//! re-checks freshness itself (see `registry.rs`); this index exists for
//! lookup speed, not exclusivity.

use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA busy_timeout = 5000;

        CREATE TABLE IF NOT EXISTS services (
            id          TEXT PRIMARY KEY,
            port        INTEGER,
            status      TEXT NOT NULL,
            pid         INTEGER,
            cmd         TEXT,
            cwd         TEXT,
            metadata    TEXT,
            created_at  INTEGER NOT NULL,
            last_seen   INTEGER NOT NULL,
            expires_at  INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_services_port ON services(port);

        CREATE TABLE IF NOT EXISTS endpoints (
            service_id TEXT NOT NULL,
            env        TEXT NOT NULL,
            url        TEXT NOT NULL,
            PRIMARY KEY (service_id, env),
            FOREIGN KEY (service_id) REFERENCES services(id) ON DELETE CASCADE
        );
        ",
    )
}
