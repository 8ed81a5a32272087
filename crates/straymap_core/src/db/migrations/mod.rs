//! Schema migrations tracked by `PRAGMA user_version`.
//!
//! # Responsibility
//! - List the straymap schema steps (tags, issues, issue links) in order.
//! - Bring a connection from its recorded version to `latest_version()` in a
//!   single transaction.
//!
//! # Invariants
//! - Step versions are contiguous from 1.
//! - A database newer than this binary is refused, never downgraded.
//! - Tag-name uniqueness lives in the schema (`ux_tags_name_key_active`) so it
//!   is enforced atomically at commit time.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "tags",
        sql: include_str!("0001_tags.sql"),
    },
    Step {
        version: 2,
        name: "issues",
        sql: include_str!("0002_issues.sql"),
    },
    Step {
        version: 3,
        name: "issue_tags",
        sql: include_str!("0003_issue_tags.sql"),
    },
];

/// Schema versions before and after `apply_migrations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from: u32,
    pub to: u32,
}

impl MigrationOutcome {
    pub fn applied(&self) -> u32 {
        self.to - self.from
    }
}

/// Schema version this binary migrates to.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Runs every step newer than the recorded version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    let from = current_user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Step> = STEPS.iter().filter(|step| step.version > from).collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in pending {
            tx.execute_batch(step.sql)?;
            tx.pragma_update(None, "user_version", step.version)?;
            debug!(
                "event=db_migrate module=db status=ok version={} step={}",
                step.version, step.name
            );
        }
        tx.commit()?;
    }

    Ok(MigrationOutcome { from, to: latest })
}

/// Reads the schema version recorded on `conn`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
