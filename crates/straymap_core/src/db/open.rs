//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure pragmas and SQL functions required by core queries.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections expose `geo_distance_m(lat1, lon1, lat2, lon2)`.
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, MigrationOutcome};
use super::DbResult;
use crate::model::geo::haversine_meters;
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Name of the registered great-circle distance function (metres).
pub const GEO_DISTANCE_FN: &str = "geo_distance_m";

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Registers `geo_distance_m` on `conn`.
///
/// Arguments are `(lat1, lon1, lat2, lon2)` in degrees; NULL in any argument
/// yields NULL.
pub fn register_geo_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        GEO_DISTANCE_FN,
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let lat1: Option<f64> = ctx.get(0)?;
            let lon1: Option<f64> = ctx.get(1)?;
            let lat2: Option<f64> = ctx.get(2)?;
            let lon2: Option<f64> = ctx.get(3)?;
            Ok(match (lat1, lon1, lat2, lon2) {
                (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
                    Some(haversine_meters(lat1, lon1, lat2, lon2))
                }
                _ => None,
            })
        },
    )?;
    Ok(())
}

fn open_with(
    mode: &'static str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(outcome) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} schema_from={} schema_to={}",
                mode,
                started_at.elapsed().as_millis(),
                outcome.from,
                outcome.to
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    register_geo_functions(conn)?;
    apply_migrations(conn)
}
