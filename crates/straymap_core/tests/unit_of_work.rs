use rusqlite::Connection;
use straymap_core::db::open_db_in_memory;
use straymap_core::{
    GeoPoint, Issue, IssueRepository, RepoError, SqliteUnitOfWork, Tag, TagRepository, UnitOfWork,
};

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).unwrap()
}

#[test]
fn save_commits_tags_issues_and_links_together() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        let tag = Tag::new("dog");
        let mut issue = Issue::new("Lost dog", "brown, small", point(51.5, -0.12));
        issue.add_tag(tag.clone());
        uow.add_tag(tag);
        uow.add_issue(issue);

        assert!(uow.has_pending_changes());
        let errors = uow.save_with_validation().unwrap();
        assert!(errors.is_empty());
        assert!(!uow.has_pending_changes());
    }

    assert_eq!(count(&conn, "tags"), 1);
    assert_eq!(count(&conn, "issues"), 1);
    assert_eq!(count(&conn, "issue_tags"), 1);
}

#[test]
fn one_invalid_entity_blocks_the_whole_save() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        uow.add_tag(Tag::new("valid"));
        uow.add_issue(Issue::new("ok", "d".repeat(2501), point(0.0, 0.0)));

        let errors = uow.save_with_validation().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "description");
        assert!(!uow.has_pending_changes());
    }

    assert_eq!(count(&conn, "tags"), 0);
    assert_eq!(count(&conn, "issues"), 0);
}

#[test]
fn every_tracked_entity_is_revalidated() {
    let mut conn = open_db_in_memory().unwrap();
    let tag_id = {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        let id = uow.add_tag(Tag::new("cats"));
        uow.save_with_validation().unwrap();
        id
    };

    let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
    uow.get_tag_by_id(tag_id).unwrap().set_name("");
    uow.add_issue(Issue::new("Cat on roof", "", point(1.0, 1.0)));

    let errors = uow.save_with_validation().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "name");
    drop(uow);

    assert_eq!(count(&conn, "issues"), 0);
    let name: String = conn
        .query_row("SELECT name FROM tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "cats");
}

#[test]
fn unchanged_loaded_entities_are_not_written() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        let id = uow.add_issue(Issue::new("Fox", "", point(2.0, 2.0)));
        uow.save_with_validation().unwrap();
        id
    };

    let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
    let issue = uow.get_issue_by_id(id).unwrap();
    issue.set_title("  Fox  ");
    assert!(!uow.has_pending_changes());

    uow.get_issue_by_id(id).unwrap().set_title("Red fox");
    assert!(uow.has_pending_changes());
}

#[test]
fn store_constraint_failure_discards_staged_changes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
    uow.add_tag(Tag::new("birds"));
    uow.add_tag(Tag::new("BIRDS"));

    match uow.save_with_validation() {
        Err(RepoError::Constraint(violation)) => assert_eq!(violation.identity, "tags.name_key"),
        other => panic!("expected constraint violation, got {other:?}"),
    }
    assert!(!uow.has_pending_changes());
    drop(uow);

    assert_eq!(count(&conn, "tags"), 0);
}

#[test]
fn removed_and_unknown_ids_are_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        let id = uow.add_tag(Tag::new("owl"));
        uow.save_with_validation().unwrap();
        id
    };

    let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
    assert!(matches!(
        uow.get_tag_by_id(uuid::Uuid::new_v4()),
        Err(RepoError::NotFound { entity: "tag", .. })
    ));

    uow.get_tag_by_id(id).unwrap();
    uow.remove_tag(id).unwrap();
    assert!(matches!(
        uow.get_tag_by_id(id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(uow.remove_tag(id).is_err());

    uow.save_with_validation().unwrap();
    drop(uow);
    assert_eq!(count(&conn, "tags"), 0);
}

#[test]
fn soft_deleted_entities_stay_loadable_by_id() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        let mut issue = Issue::new("Stray cat", "", point(3.0, 3.0));
        issue.soft_delete();
        let id = uow.add_issue(issue);
        uow.save_with_validation().unwrap();
        id
    };

    let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
    let issue = uow.get_issue_by_id(id).unwrap();
    assert!(issue.is_soft_deleted());
    issue.restore();
    uow.save_with_validation().unwrap();
    drop(uow);

    let deleted: i64 = conn
        .query_row("SELECT is_deleted FROM issues;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(deleted, 0);
}

#[test]
fn discard_changes_drops_staged_entities() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut uow = SqliteUnitOfWork::try_new(&mut conn).unwrap();
        uow.add_tag(Tag::new("mice"));
        uow.discard_changes();
        assert!(!uow.has_pending_changes());
        assert!(uow.save_with_validation().unwrap().is_empty());
    }
    assert_eq!(count(&conn, "tags"), 0);
}
