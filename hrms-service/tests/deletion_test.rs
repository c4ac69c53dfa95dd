mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_department_with_sub_departments_cannot_be_deleted() {
    let app = test_app();
    let company = create(&app, "companies", "Acme", None).await;
    let branch = create(&app, "branches", "Pune", Some(company)).await;
    let department = create(&app, "departments", "Finance", Some(branch)).await;
    let payroll = create(&app, "sub-departments", "Payroll", Some(department)).await;
    let audit = create(&app, "sub-departments", "Audit", Some(department)).await;

    let (status, body) = delete(&app, &format!("/api/departments/{}", department)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("2 dependent sub-department record(s)"), "{}", message);

    for sub in [payroll, audit] {
        let (status, _) = delete(&app, &format!("/api/sub-departments/{}", sub)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _) = delete(&app, &format!("/api/departments/{}", department)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, &format!("/api/departments/{}", department)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_direct_dependents_are_counted() {
    let app = test_app();
    let root = create(&app, "employee-levels", "Root", None).await;
    let middle = create(&app, "employee-levels", "Middle", Some(root)).await;
    create(&app, "employee-levels", "Leaf", Some(middle)).await;

    let (status, body) = delete(&app, &format!("/api/employee-levels/{}", root)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("1 dependent"));
}

#[tokio::test]
async fn test_delete_closes_gap_in_scope() {
    let app = test_app();
    let (_, body) = post(&app, "/api/zones/bulk", json!({ "names": ["A", "B", "C", "D"] })).await;
    let b = id_of(&body["created"][1]);

    let (status, _) = delete(&app, &format!("/api/zones/{}", b)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = get(&app, "/api/zones").await;
    assert_eq!(
        ordering(&listed),
        vec![("A".into(), 0), ("C".into(), 1), ("D".into(), 2)]
    );
}

#[tokio::test]
async fn test_delete_missing_node_is_not_found() {
    let app = test_app();
    let (status, _) = delete(&app, &format!("/api/zones/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leaf_kinds_delete_freely() {
    let app = test_app();
    let company = create(&app, "companies", "Acme", None).await;
    let branch = create(&app, "branches", "Pune", Some(company)).await;
    let department = create(&app, "departments", "Finance", Some(branch)).await;
    let sub = create(&app, "sub-departments", "Payroll", Some(department)).await;
    let designation = create(&app, "designations", "Clerk", Some(sub)).await;

    let (status, _) = delete(&app, &format!("/api/designations/{}", designation)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&app, &format!("/api/sub-departments/{}", sub)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
