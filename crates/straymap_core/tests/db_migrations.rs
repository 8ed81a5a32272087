use rusqlite::Connection;
use straymap_core::db::migrations::latest_version;
use straymap_core::db::{open_db, open_db_in_memory, DbError, GEO_DISTANCE_FN};
use straymap_core::{RepoError, SqliteUnitOfWork};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "tags");
    assert_table_exists(&conn, "issues");
    assert_table_exists(&conn, "issue_tags");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("straymap.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "issues");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn geo_distance_function_is_registered() {
    let conn = open_db_in_memory().unwrap();
    let meters: f64 = conn
        .query_row(
            &format!("SELECT {GEO_DISTANCE_FN}(0.0, 0.0, 0.0, 1.0);"),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!((meters - 111_195.08).abs() < 1.0, "got {meters}");

    let null: Option<f64> = conn
        .query_row(
            &format!("SELECT {GEO_DISTANCE_FN}(NULL, 0.0, 0.0, 1.0);"),
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(null.is_none());
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn unit_of_work_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    match SqliteUnitOfWork::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
