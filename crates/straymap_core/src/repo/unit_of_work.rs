//! Unit of work over one SQLite connection.
//!
//! # Responsibility
//! - Track entities read, added, modified and removed during one operation.
//! - Revalidate every added/modified entity and commit all staged changes in a
//!   single transaction.
//! - Translate SQLite constraint failures into named `ConstraintViolation`s.
//!
//! # Invariants
//! - A save writes everything or nothing.
//! - Invariant failures abort the save before any SQL is issued.
//! - After a save that did not commit, staged changes are discarded.
//! - Listing queries read committed rows only; tracked changes are invisible
//!   to them until saved.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::issue::Issue;
use crate::model::tag::Tag;
use crate::model::validation::{FieldError, Validate};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

static CONSTRAINT_MESSAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(UNIQUE|CHECK|FOREIGN KEY|NOT NULL|PRIMARY KEY) constraint failed(?::\s*(.+))?$")
        .expect("valid constraint message regex")
});

const REQUIRED_TABLES: [&str; 3] = ["tags", "issues", "issue_tags"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Kind of store-level constraint reported by SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Check,
    ForeignKey,
    NotNull,
    PrimaryKey,
    Other,
}

/// Constraint failure recognised by kind and identity.
///
/// `identity` is what SQLite names in its message: `table.column[, ...]` for
/// column-based indexes, `index 'name'` for expression indexes, or the check
/// expression. Empty when SQLite does not name the constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub identity: String,
}

impl ConstraintViolation {
    /// Parses SQLite's `"<KIND> constraint failed: <identity>"` message.
    pub fn from_sqlite_message(message: &str) -> Self {
        let Some(caps) = CONSTRAINT_MESSAGE_RE.captures(message.trim()) else {
            return Self {
                kind: ConstraintKind::Other,
                identity: message.trim().to_string(),
            };
        };
        let kind = match caps.get(1).map(|m| m.as_str()) {
            Some("UNIQUE") => ConstraintKind::Unique,
            Some("CHECK") => ConstraintKind::Check,
            Some("FOREIGN KEY") => ConstraintKind::ForeignKey,
            Some("NOT NULL") => ConstraintKind::NotNull,
            Some("PRIMARY KEY") => ConstraintKind::PrimaryKey,
            _ => ConstraintKind::Other,
        };
        let identity = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Self { kind, identity }
    }
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} constraint violated: {}", self.kind, self.identity)
    }
}

/// Repository error for unit-of-work persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Identifier does not resolve to any row, deleted or not.
    NotFound { entity: &'static str, id: Uuid },
    /// Commit rejected by a store constraint.
    Constraint(ConstraintViolation),
    /// Persisted data cannot be converted to a valid entity.
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "there is no {entity} with id {id}"),
            Self::Constraint(violation) => write!(f, "{violation}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "unit of work requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "unit of work requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                let message = message.as_deref().unwrap_or_default();
                return Self::Constraint(ConstraintViolation::from_sqlite_message(message));
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Commit boundary shared by write runners.
pub trait UnitOfWork {
    /// Validates every added/modified entity, then commits all staged changes.
    ///
    /// Returns the invariant failures when validation rejects the save; in
    /// that case nothing is written. Store failures are returned as `Err`.
    fn save_with_validation(&mut self) -> RepoResult<Vec<FieldError>>;

    /// Drops every staged change and forgets tracked entities.
    fn discard_changes(&mut self);
}

/// Entity with a stable identity usable as a tracking key.
pub(crate) trait Identified {
    fn identity(&self) -> Uuid;
}

impl Identified for Issue {
    fn identity(&self) -> Uuid {
        self.id()
    }
}

impl Identified for Tag {
    fn identity(&self) -> Uuid {
        self.id()
    }
}

#[derive(Debug)]
enum Entry<T> {
    Added(T),
    Loaded { original: T, current: T },
    Removed(T),
}

/// Pending write derived from one tracked entry.
pub(crate) enum Change<'a, T> {
    Insert(&'a T),
    Update(&'a T),
    Delete(&'a T),
}

/// Insertion-ordered identity map for one entity kind.
#[derive(Debug)]
pub(crate) struct Tracker<T> {
    entries: Vec<(Uuid, Entry<T>)>,
}

impl<T> Default for Tracker<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Identified + Clone + PartialEq> Tracker<T> {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|(key, _)| *key == id)
    }

    pub(crate) fn is_tracked(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    pub(crate) fn is_removed(&self, id: Uuid) -> bool {
        self.position(id)
            .is_some_and(|idx| matches!(self.entries[idx].1, Entry::Removed(_)))
    }

    /// Starts tracking an entity loaded from the store.
    pub(crate) fn attach(&mut self, entity: T) {
        let id = entity.identity();
        if self.is_tracked(id) {
            return;
        }
        self.entries.push((
            id,
            Entry::Loaded {
                original: entity.clone(),
                current: entity,
            },
        ));
    }

    pub(crate) fn add(&mut self, entity: T) -> Uuid {
        let id = entity.identity();
        self.entries.push((id, Entry::Added(entity)));
        id
    }

    /// Stages removal; returns `false` when `id` is not tracked as live.
    pub(crate) fn remove(&mut self, id: Uuid) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        match &self.entries[idx].1 {
            Entry::Added(_) => {
                self.entries.remove(idx);
                true
            }
            Entry::Loaded { current, .. } => {
                let current = current.clone();
                self.entries[idx].1 = Entry::Removed(current);
                true
            }
            Entry::Removed(_) => false,
        }
    }

    pub(crate) fn current_mut(&mut self, id: Uuid) -> Option<&mut T> {
        let idx = self.position(id)?;
        match &mut self.entries[idx].1 {
            Entry::Added(entity) => Some(entity),
            Entry::Loaded { current, .. } => Some(current),
            Entry::Removed(_) => None,
        }
    }

    pub(crate) fn changes(&self) -> impl Iterator<Item = Change<'_, T>> {
        self.entries.iter().filter_map(|(_, entry)| match entry {
            Entry::Added(entity) => Some(Change::Insert(entity)),
            Entry::Loaded { original, current } if original != current => {
                Some(Change::Update(current))
            }
            Entry::Loaded { .. } => None,
            Entry::Removed(entity) => Some(Change::Delete(entity)),
        })
    }

    pub(crate) fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Marks the current state as committed.
    fn accept(&mut self) {
        self.entries
            .retain(|(_, entry)| !matches!(entry, Entry::Removed(_)));
        for (_, entry) in &mut self.entries {
            let committed = match entry {
                Entry::Added(entity) => entity.clone(),
                Entry::Loaded { current, .. } => current.clone(),
                Entry::Removed(_) => continue,
            };
            *entry = Entry::Loaded {
                original: committed.clone(),
                current: committed,
            };
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Identified + Clone + PartialEq + Validate> Tracker<T> {
    fn validation_errors(&self) -> Vec<FieldError> {
        self.changes()
            .filter_map(|change| match change {
                Change::Insert(entity) | Change::Update(entity) => Some(entity.validate()),
                Change::Delete(_) => None,
            })
            .flatten()
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SaveStats {
    inserted: usize,
    updated: usize,
    deleted: usize,
}

/// SQLite-backed unit of work.
///
/// One instance serves one logical request; it is never shared.
pub struct SqliteUnitOfWork<'conn> {
    pub(super) conn: &'conn mut Connection,
    pub(super) issues: Tracker<Issue>,
    pub(super) tags: Tracker<Tag>,
}

impl<'conn> SqliteUnitOfWork<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema is not at the latest version.
    /// - `MissingRequiredTable` when a core table is absent.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            issues: Tracker::default(),
            tags: Tracker::default(),
        })
    }

    /// Returns whether any tracked entity would be written by a save.
    pub fn has_pending_changes(&self) -> bool {
        self.issues.has_changes() || self.tags.has_changes()
    }

    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = self.tags.validation_errors();
        errors.extend(self.issues.validation_errors());
        errors
    }

    fn write_changes(&mut self) -> RepoResult<SaveStats> {
        let mut stats = SaveStats::default();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for change in self.tags.changes() {
            match change {
                Change::Insert(tag) => {
                    insert_tag(&tx, tag)?;
                    stats.inserted += 1;
                }
                Change::Update(tag) => {
                    update_tag(&tx, tag)?;
                    stats.updated += 1;
                }
                Change::Delete(_) => {}
            }
        }

        for change in self.issues.changes() {
            match change {
                Change::Insert(issue) => {
                    insert_issue(&tx, issue)?;
                    replace_issue_tags(&tx, issue)?;
                    stats.inserted += 1;
                }
                Change::Update(issue) => {
                    update_issue(&tx, issue)?;
                    replace_issue_tags(&tx, issue)?;
                    stats.updated += 1;
                }
                Change::Delete(issue) => {
                    delete_row(&tx, "issues", "issue", issue.id())?;
                    stats.deleted += 1;
                }
            }
        }

        for change in self.tags.changes() {
            if let Change::Delete(tag) = change {
                delete_row(&tx, "tags", "tag", tag.id())?;
                stats.deleted += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn save_with_validation(&mut self) -> RepoResult<Vec<FieldError>> {
        let started_at = Instant::now();

        let errors = self.validation_errors();
        if !errors.is_empty() {
            warn!(
                "event=uow_save module=repo status=rejected duration_ms={} error_count={}",
                started_at.elapsed().as_millis(),
                errors.len()
            );
            self.discard_changes();
            return Ok(errors);
        }

        match self.write_changes() {
            Ok(stats) => {
                self.issues.accept();
                self.tags.accept();
                info!(
                    "event=uow_save module=repo status=ok duration_ms={} inserted={} updated={} deleted={}",
                    started_at.elapsed().as_millis(),
                    stats.inserted,
                    stats.updated,
                    stats.deleted
                );
                Ok(Vec::new())
            }
            Err(err) => {
                error!(
                    "event=uow_save module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.discard_changes();
                Err(err)
            }
        }
    }

    fn discard_changes(&mut self) {
        self.issues.clear();
        self.tags.clear();
    }
}

fn insert_tag(tx: &Transaction<'_>, tag: &Tag) -> RepoResult<()> {
    tx.execute(
        "INSERT INTO tags (id, name, name_key, is_deleted) VALUES (?1, ?2, ?3, ?4);",
        params![
            tag.id().to_string(),
            tag.name(),
            tag.name_key(),
            bool_to_int(tag.is_soft_deleted())
        ],
    )?;
    Ok(())
}

fn update_tag(tx: &Transaction<'_>, tag: &Tag) -> RepoResult<()> {
    let changed = tx.execute(
        "UPDATE tags SET name = ?2, name_key = ?3, is_deleted = ?4 WHERE id = ?1;",
        params![
            tag.id().to_string(),
            tag.name(),
            tag.name_key(),
            bool_to_int(tag.is_soft_deleted())
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "tag",
            id: tag.id(),
        });
    }
    Ok(())
}

fn insert_issue(tx: &Transaction<'_>, issue: &Issue) -> RepoResult<()> {
    let location = issue.location();
    tx.execute(
        "INSERT INTO issues (
            id,
            created_at,
            title,
            description,
            latitude,
            longitude,
            is_deleted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            issue.id().to_string(),
            issue.created_at(),
            issue.title(),
            issue.description(),
            location.latitude(),
            location.longitude(),
            bool_to_int(issue.is_soft_deleted()),
        ],
    )?;
    Ok(())
}

fn update_issue(tx: &Transaction<'_>, issue: &Issue) -> RepoResult<()> {
    let location = issue.location();
    let changed = tx.execute(
        "UPDATE issues
         SET
            title = ?2,
            description = ?3,
            latitude = ?4,
            longitude = ?5,
            is_deleted = ?6
         WHERE id = ?1;",
        params![
            issue.id().to_string(),
            issue.title(),
            issue.description(),
            location.latitude(),
            location.longitude(),
            bool_to_int(issue.is_soft_deleted()),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "issue",
            id: issue.id(),
        });
    }
    Ok(())
}

fn replace_issue_tags(tx: &Transaction<'_>, issue: &Issue) -> RepoResult<()> {
    let issue_id = issue.id().to_string();
    tx.execute(
        "DELETE FROM issue_tags WHERE issue_id = ?1;",
        [issue_id.as_str()],
    )?;
    for (position, tag) in issue.tags().iter().enumerate() {
        tx.execute(
            "INSERT INTO issue_tags (issue_id, tag_id, position) VALUES (?1, ?2, ?3);",
            params![issue_id.as_str(), tag.id().to_string(), position as i64],
        )?;
    }
    Ok(())
}

fn delete_row(
    tx: &Transaction<'_>,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
) -> RepoResult<()> {
    let changed = tx.execute(
        &format!("DELETE FROM {table} WHERE id = ?1;"),
        [id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
