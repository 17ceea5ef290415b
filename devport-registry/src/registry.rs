use devport_protocol::record::DEFAULT_PORT_RANGE;
use devport_protocol::{
    CleanupResult, ClaimOptions, ClaimResult, DevportError, Endpoint, EnrichedService, FindOptions,
    FindResult, Identity, Pattern, ReleaseOptions, ReleaseResult, ServiceStatus,
};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::duration::parse_duration_ms;
use crate::port_allocator::PortAllocator;
use crate::schema;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

fn map_sql(err: rusqlite::Error) -> DevportError {
    DevportError::Storage(err.to_string())
}

struct Row {
    id: String,
    port: Option<i64>,
    status: String,
    pid: Option<i64>,
    cmd: Option<String>,
    cwd: Option<String>,
    metadata: Option<String>,
    created_at: i64,
    last_seen: i64,
    expires_at: Option<i64>,
}

impl Row {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

/// The embedded, transactional store described in spec §4.1. Every public
/// method opens exactly one transaction.
pub struct ServiceRegistry {
    conn: Mutex<Connection>,
}

impl ServiceRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DevportError> {
        let conn = Connection::open(path).map_err(map_sql)?;
        schema::init(&conn).map_err(map_sql)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, DevportError> {
        let conn = Connection::open_in_memory().map_err(map_sql)?;
        schema::init(&conn).map_err(map_sql)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Atomically reserves a port for `id`, or returns the port already
    /// held by a non-expired record with the same identity.
    pub fn claim(&self, id: &str, opts: ClaimOptions) -> Result<ClaimResult, DevportError> {
        let identity = Identity::parse(id)?;
        let now = now_ms();

        let mut conn = self.conn.lock().expect("registry mutex poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql)?;

        if let Some(existing) = fetch_row(&tx, &identity.as_str())? {
            if !existing.is_expired(now) {
                let port = existing
                    .port
                    .ok_or_else(|| DevportError::Storage("claimed record missing port".into()))?;
                return Ok(ClaimResult {
                    id: existing.id,
                    port: port as u16,
                    status: ServiceStatus::from_str(&existing.status)
                        .map_err(DevportError::Storage)?,
                    existing: true,
                    message: "existing claim reused".to_string(),
                });
            }
        }

        let used = used_ports(&tx, Some(&identity.as_str()), now)?;
        let default_range = PortAllocator::new(DEFAULT_PORT_RANGE.0, DEFAULT_PORT_RANGE.1);

        let (port, message) = if let Some(preferred) = opts.port {
            if default_range.is_available(preferred, &used) {
                (preferred, "using preferred port".to_string())
            } else {
                let (lo, hi) = opts.range_or_default();
                let scan_range = PortAllocator::new(lo, hi);
                let allocated = scan_range
                    .allocate(&used)
                    .ok_or(DevportError::Exhaustion)?;
                (allocated, "allocated from range".to_string())
            }
        } else {
            let (lo, hi) = opts.range_or_default();
            let scan_range = PortAllocator::new(lo, hi);
            let allocated = scan_range
                .allocate(&used)
                .ok_or(DevportError::Exhaustion)?;
            (allocated, "allocated from range".to_string())
        };

        let expires_at = match &opts.expires {
            Some(literal) => Some(now + parse_duration_ms(literal)?),
            None => None,
        };
        let metadata = opts.metadata.as_ref().map(|v| v.to_string());

        tx.execute(
            "INSERT OR REPLACE INTO services
                (id, port, status, pid, cmd, cwd, metadata, created_at, last_seen, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
            params![
                identity.as_str(),
                port,
                ServiceStatus::Assigned.to_string(),
                opts.pid,
                opts.cmd,
                opts.cwd,
                metadata,
                now,
                expires_at,
            ],
        )
        .map_err(map_sql)?;

        let local = Endpoint::local(identity.as_str(), port);
        tx.execute(
            "INSERT OR REPLACE INTO endpoints (service_id, env, url) VALUES (?1, ?2, ?3)",
            params![local.service_id, local.env, local.url],
        )
        .map_err(map_sql)?;

        tx.commit().map_err(map_sql)?;
        info!("claimed {} on port {}", identity, port);

        Ok(ClaimResult {
            id: identity.as_str(),
            port,
            status: ServiceStatus::Assigned,
            existing: false,
            message,
        })
    }

    /// Deletes every record matching `pattern` (cascading their
    /// endpoints). Never errors on a non-match: `released: 0`.
    pub fn release(&self, pattern: &str, opts: ReleaseOptions) -> Result<ReleaseResult, DevportError> {
        let pattern = Pattern::parse(pattern)?;
        let now = now_ms();

        let mut conn = self.conn.lock().expect("registry mutex poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql)?;

        let rows = fetch_rows_like(&tx, &pattern)?;
        let matching: Vec<Row> = rows
            .into_iter()
            .filter(|row| {
                Identity::parse(&row.id).map(|id| pattern.matches(&id)).unwrap_or(false)
            })
            .filter(|row| !opts.expired || row.is_expired(now))
            .collect();

        let released = matching.len();
        let port = if released == 1 {
            matching[0].port.map(|p| p as u16)
        } else {
            None
        };

        for row in &matching {
            tx.execute("DELETE FROM services WHERE id = ?1", params![row.id])
                .map_err(map_sql)?;
        }
        tx.commit().map_err(map_sql)?;

        debug!("released {} service(s) matching pattern", released);
        Ok(ReleaseResult {
            released,
            port,
            message: format!("released {released} service(s)"),
        })
    }

    /// Returns every record matching `pattern`, after applying `opts`.
    pub fn find(&self, pattern: &str, opts: FindOptions) -> Result<FindResult, DevportError> {
        let pattern = Pattern::parse(pattern)?;
        let now = now_ms();

        let conn = self.conn.lock().expect("registry mutex poisoned");
        let rows = fetch_rows_like(&conn, &pattern)?;

        let mut services: Vec<EnrichedService> = Vec::new();
        for row in rows {
            let Ok(identity) = Identity::parse(&row.id) else { continue };
            if !pattern.matches(&identity) {
                continue;
            }

            let is_expired = row.is_expired(now);
            if let Some(want_expired) = opts.expired {
                if want_expired != is_expired {
                    continue;
                }
            }
            if let Some(want_status) = opts.status {
                if row.status != want_status.to_string() {
                    continue;
                }
            }
            if let Some(want_port) = opts.port {
                if row.port != Some(want_port as i64) {
                    continue;
                }
            }

            services.push(enrich(&conn, row)?);
        }

        if let Some(limit) = opts.limit {
            services.truncate(limit);
        }

        Ok(FindResult {
            count: services.len(),
            services,
        })
    }

    pub fn get(&self, id: &str) -> Result<EnrichedService, DevportError> {
        let identity = Identity::parse(id)?;
        let conn = self.conn.lock().expect("registry mutex poisoned");
        let row = fetch_row(&conn, &identity.as_str())?
            .ok_or_else(|| DevportError::NotFound("not found".to_string()))?;
        enrich(&conn, row)
    }

    pub fn set_status(&self, id: &str, status: ServiceStatus) -> Result<(), DevportError> {
        let identity = Identity::parse(id)?;
        let now = now_ms();
        let mut conn = self.conn.lock().expect("registry mutex poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql)?;

        let changed = tx
            .execute(
                "UPDATE services SET status = ?1, last_seen = ?2 WHERE id = ?3",
                params![status.to_string(), now, identity.as_str()],
            )
            .map_err(map_sql)?;
        if changed == 0 {
            return Err(DevportError::NotFound("not found".to_string()));
        }
        tx.commit().map_err(map_sql)?;
        Ok(())
    }

    pub fn set_endpoint(&self, id: &str, env: &str, url: &str) -> Result<(), DevportError> {
        let identity = Identity::parse(id)?;
        let mut conn = self.conn.lock().expect("registry mutex poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql)?;

        if fetch_row(&tx, &identity.as_str())?.is_none() {
            return Err(DevportError::NotFound("not found".to_string()));
        }

        tx.execute(
            "INSERT OR REPLACE INTO endpoints (service_id, env, url) VALUES (?1, ?2, ?3)",
            params![identity.as_str(), env, url],
        )
        .map_err(map_sql)?;
        tx.commit().map_err(map_sql)?;
        Ok(())
    }

    /// Removes every expired record (and cascades its endpoints).
    pub fn cleanup(&self) -> Result<CleanupResult, DevportError> {
        let now = now_ms();
        let mut conn = self.conn.lock().expect("registry mutex poisoned");
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql)?;

        let cleaned = tx
            .execute(
                "DELETE FROM services WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )
            .map_err(map_sql)?;
        tx.commit().map_err(map_sql)?;

        info!("cleanup removed {} expired record(s)", cleaned);
        Ok(CleanupResult { cleaned })
    }
}

fn fetch_row(conn: &Connection, id: &str) -> Result<Option<Row>, DevportError> {
    conn.query_row(
        "SELECT id, port, status, pid, cmd, cwd, metadata, created_at, last_seen, expires_at
         FROM services WHERE id = ?1",
        params![id],
        row_from_sql,
    )
    .optional()
    .map_err(map_sql)
}

fn fetch_rows_like(conn: &Connection, pattern: &Pattern) -> Result<Vec<Row>, DevportError> {
    let like = pattern.sql_like();
    let mut stmt = conn
        .prepare(
            "SELECT id, port, status, pid, cmd, cwd, metadata, created_at, last_seen, expires_at
             FROM services WHERE id LIKE ?1 ESCAPE '\\'",
        )
        .map_err(map_sql)?;
    let rows = stmt
        .query_map(params![like], row_from_sql)
        .map_err(map_sql)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sql)?;
    Ok(rows)
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok(Row {
        id: row.get(0)?,
        port: row.get(1)?,
        status: row.get(2)?,
        pid: row.get(3)?,
        cmd: row.get(4)?,
        cwd: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
        last_seen: row.get(8)?,
        expires_at: row.get(9)?,
    })
}

/// Ports currently held by non-expired records, optionally excluding one
/// identity (used while re-claiming an expired record for the same id).
fn used_ports(conn: &Connection, exclude_id: Option<&str>, now: i64) -> Result<HashSet<u16>, DevportError> {
    let mut stmt = conn
        .prepare("SELECT id, port, expires_at FROM services WHERE port IS NOT NULL")
        .map_err(map_sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })
        .map_err(map_sql)?;

    let mut used = HashSet::new();
    for row in rows {
        let (id, port, expires_at) = row.map_err(map_sql)?;
        if Some(id.as_str()) == exclude_id {
            continue;
        }
        let expired = matches!(expires_at, Some(exp) if exp <= now);
        if !expired {
            used.insert(port as u16);
        }
    }
    Ok(used)
}

fn enrich(conn: &Connection, row: Row) -> Result<EnrichedService, DevportError> {
    let mut stmt = conn
        .prepare("SELECT env, url FROM endpoints WHERE service_id = ?1")
        .map_err(map_sql)?;
    let urls: HashMap<String, String> = stmt
        .query_map(params![row.id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
        .map_err(map_sql)?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(map_sql)?;

    let metadata = match row.metadata {
        Some(blob) => Some(serde_json::from_str(&blob).map_err(|e| DevportError::Storage(e.to_string()))?),
        None => None,
    };

    Ok(EnrichedService {
        id: row.id,
        port: row.port.map(|p| p as u16),
        status: ServiceStatus::from_str(&row.status).map_err(DevportError::Storage)?,
        pid: row.pid.map(|p| p as u32),
        cmd: row.cmd,
        cwd: row.cwd,
        created_at: row.created_at,
        last_seen: row.last_seen,
        expires_at: row.expires_at,
        metadata,
        urls,
    })
}
