use rusqlite::{params, Connection};
use straymap_core::db::open_db_in_memory;
use straymap_core::{
    GeoPoint, GetIssuesRequest, IssueId, IssueSortBy, IssuesPage, IssuesService, NewIssueRequest,
};

/// Creates one issue per point; titles are `issue-<index>`.
fn seed(conn: &mut Connection, points: &[(f64, f64)]) -> Vec<IssueId> {
    let mut service = IssuesService::try_new(conn).unwrap();
    let ids = points
        .iter()
        .enumerate()
        .map(|(index, (latitude, longitude))| {
            service
                .new_issue(&NewIssueRequest {
                    title: format!("issue-{index}"),
                    description: String::new(),
                    latitude: *latitude,
                    longitude: *longitude,
                })
                .unwrap()
                .unwrap()
        })
        .collect();
    assert!(!service.has_errors());
    ids
}

/// Twelve issues north of the origin, each further away than the previous.
fn seed_line(conn: &mut Connection) -> Vec<IssueId> {
    let points: Vec<_> = (0..12).map(|i| (0.01 * f64::from(i), 0.0)).collect();
    seed(conn, &points)
}

fn list(conn: &mut Connection, request: &GetIssuesRequest) -> IssuesPage {
    let mut service = IssuesService::try_new(conn).unwrap();
    let page = service.get_issues_with_pagination(request).unwrap();
    assert!(!service.has_errors(), "{:?}", service.errors());
    page.unwrap()
}

fn titles(page: &IssuesPage) -> Vec<&str> {
    page.items.iter().map(|item| item.title.as_str()).collect()
}

#[test]
fn pages_are_one_based_windows() {
    let mut conn = open_db_in_memory().unwrap();
    seed_line(&mut conn);

    let second = list(
        &mut conn,
        &GetIssuesRequest {
            page_size: 5,
            page_number: 2,
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(
        titles(&second),
        vec!["issue-5", "issue-6", "issue-7", "issue-8", "issue-9"]
    );
    assert_eq!(second.total_count, 12);

    let third = list(
        &mut conn,
        &GetIssuesRequest {
            page_size: 5,
            page_number: 3,
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&third), vec!["issue-10", "issue-11"]);

    let beyond = list(
        &mut conn,
        &GetIssuesRequest {
            page_size: 5,
            page_number: 4,
            ..GetIssuesRequest::default()
        },
    );
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_count, 12);
}

#[test]
fn default_listing_orders_by_distance_from_origin() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn, &[(10.0, 10.0), (0.0, 1.0), (-3.0, 0.0)]);

    let page = list(&mut conn, &GetIssuesRequest::default());
    assert_eq!(titles(&page), vec!["issue-1", "issue-2", "issue-0"]);
    let distances: Vec<f64> = page
        .items
        .iter()
        .map(|item| item.distance_meters.unwrap())
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn distance_is_measured_from_current_location() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn, &[(0.0, 0.0), (48.8566, 2.3522), (51.5074, -0.1278)]);

    let page = list(
        &mut conn,
        &GetIssuesRequest {
            current_latitude: Some(51.5),
            current_longitude: Some(-0.12),
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&page), vec!["issue-2", "issue-1", "issue-0"]);

    let here = GeoPoint::new(51.5, -0.12).unwrap();
    let london = GeoPoint::new(51.5074, -0.1278).unwrap();
    let nearest = page.items[0].distance_meters.unwrap();
    assert!((nearest - here.distance_meters(&london)).abs() < 1e-6);
    assert!(nearest < 2_000.0);

    let descending = list(
        &mut conn,
        &GetIssuesRequest {
            current_latitude: Some(51.5),
            current_longitude: Some(-0.12),
            descending: true,
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&descending), vec!["issue-0", "issue-1", "issue-2"]);
}

#[test]
fn radius_filters_items_but_not_total_count() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn, &[(0.0, 0.0), (0.01, 0.0), (0.1, 0.0), (1.0, 0.0)]);

    let page = list(
        &mut conn,
        &GetIssuesRequest {
            current_latitude: Some(0.0),
            current_longitude: Some(0.0),
            radius_meters: Some(20_000.0),
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&page), vec!["issue-0", "issue-1", "issue-2"]);
    assert!(page
        .items
        .iter()
        .all(|item| item.distance_meters.unwrap() <= 20_000.0));
    assert_eq!(page.total_count, 4);
}

#[test]
fn radius_without_location_is_centered_on_origin() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn, &[(0.0, 0.05), (45.0, 45.0)]);

    let page = list(
        &mut conn,
        &GetIssuesRequest {
            radius_meters: Some(10_000.0),
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&page), vec!["issue-0"]);
}

#[test]
fn created_at_ordering_without_location_has_no_distance() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn, &[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
    for (offset, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE issues SET created_at = ?1 WHERE id = ?2;",
            params![1_000 + offset as i64, id.to_string()],
        )
        .unwrap();
    }

    let ascending = list(
        &mut conn,
        &GetIssuesRequest {
            sort_by: IssueSortBy::CreatedAt,
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&ascending), vec!["issue-0", "issue-1", "issue-2"]);
    assert!(ascending
        .items
        .iter()
        .all(|item| item.distance_meters.is_none()));

    let descending = list(
        &mut conn,
        &GetIssuesRequest {
            sort_by: IssueSortBy::CreatedAt,
            descending: true,
            current_latitude: Some(3.0),
            current_longitude: Some(3.0),
            ..GetIssuesRequest::default()
        },
    );
    assert_eq!(titles(&descending), vec!["issue-2", "issue-1", "issue-0"]);
    assert_eq!(descending.items[0].distance_meters, Some(0.0));
}

#[test]
fn soft_deleted_issues_are_not_listed_or_counted() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn, &[(0.0, 0.0), (0.1, 0.1)]);
    {
        let mut service = IssuesService::try_new(&mut conn).unwrap();
        service.soft_delete_issue(ids[0]).unwrap();
    }

    let page = list(&mut conn, &GetIssuesRequest::default());
    assert_eq!(titles(&page), vec!["issue-1"]);
    assert_eq!(page.total_count, 1);
}

#[test]
fn invalid_listing_requests_are_field_errors() {
    let mut conn = open_db_in_memory().unwrap();
    seed_line(&mut conn);
    let mut service = IssuesService::try_new(&mut conn).unwrap();

    let cases = [
        (
            GetIssuesRequest {
                page_size: 0,
                ..GetIssuesRequest::default()
            },
            "page_size",
        ),
        (
            GetIssuesRequest {
                page_size: 101,
                ..GetIssuesRequest::default()
            },
            "page_size",
        ),
        (
            GetIssuesRequest {
                page_number: 0,
                ..GetIssuesRequest::default()
            },
            "page_number",
        ),
        (
            GetIssuesRequest {
                radius_meters: Some(-5.0),
                ..GetIssuesRequest::default()
            },
            "radius_meters",
        ),
        (
            GetIssuesRequest {
                current_latitude: Some(95.0),
                current_longitude: Some(0.0),
                ..GetIssuesRequest::default()
            },
            "current_latitude",
        ),
    ];

    for (request, field) in cases {
        service.clear_errors();
        let page = service.get_issues_with_pagination(&request).unwrap();
        assert!(page.is_none());
        assert_eq!(service.errors().len(), 1, "{field}");
        assert_eq!(service.errors()[0].field, field);
    }

    service.clear_errors();
    let page = service
        .get_issues_with_pagination(&GetIssuesRequest {
            page_size: 100,
            ..GetIssuesRequest::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(page.items.len(), 12);
}
