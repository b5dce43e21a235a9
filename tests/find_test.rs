use filtercrate::filtering::{MAX_ROWS, parse_query_string};
use filtercrate::{ApiError, FindResult, OperationOptions, RawQuery, Resource};
use serde_json::{Value, json};

mod common;
use common::address_entity::Addresses;
use common::user_entity::{PlainUsers, Users};
use common::{seed_users, seed_users_with_addresses, setup_test_db};

fn query(value: Value) -> RawQuery {
    RawQuery::from_json(value)
}

fn ages(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|row| row["age"].as_i64()).collect()
}

#[tokio::test]
async fn test_find_returns_pagination_envelope() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(&db, RawQuery::default(), OperationOptions::default())
        .await
        .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 25);
    assert_eq!(page.limit, 10);
    assert_eq!(page.skip, 0);
    assert_eq!(page.data.len(), 10);
}

#[tokio::test]
async fn test_find_skip_past_last_full_page() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(
        &db,
        query(json!({"$limit": "10", "$skip": "20"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 25);
    assert_eq!(page.skip, 20);
    assert_eq!(page.data.len(), 5);
}

#[tokio::test]
async fn test_find_invalid_limit_falls_back_to_default() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 15).await;

    for limit in ["abc", "0"] {
        let result = Users::find(
            &db,
            query(json!({"$limit": limit})),
            OperationOptions::default(),
        )
        .await
        .unwrap();
        let FindResult::Paginated(page) = result else {
            panic!("expected a paginated result");
        };
        assert_eq!(page.limit, 10, "limit {limit}");
        assert_eq!(page.data.len(), 10, "limit {limit}");
    }
}

#[tokio::test]
async fn test_find_without_pagination_returns_every_row() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(
        &db,
        query(json!({"$paginate": "false"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::All(rows) = result else {
        panic!("expected every row");
    };
    assert_eq!(rows.len(), 25);
}

#[tokio::test]
async fn test_find_sorts_descending() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 10).await;

    let result = Users::find(
        &db,
        query(json!({"$sort": {"age": "-1"}, "$limit": "3"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(ages(result.data()), vec![29, 28, 27]);
}

#[tokio::test]
async fn test_find_comparison_operators() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(
        &db,
        query(json!({"age": {"$gte": "30", "$lt": "35"}, "$sort": {"age": "1"}})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 5);
    assert_eq!(ages(&page.data), vec![30, 31, 32, 33, 34]);
}

#[tokio::test]
async fn test_find_in_and_not_in() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 5).await;

    let result = Users::find(
        &db,
        query(json!({
            "age": {"$in": ["20", "21", "22"], "$nin": ["21"]},
            "$sort": {"age": "1"}
        })),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(ages(result.data()), vec![20, 22]);
}

#[tokio::test]
async fn test_find_or_groups() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 10).await;

    let result = Users::find(
        &db,
        query(json!({
            "$or": [{"name": "user00"}, {"name": "user05"}],
            "$sort": {"name": "1"}
        })),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let names: Vec<&str> = result
        .data()
        .iter()
        .filter_map(|row| row["name"].as_str())
        .collect();
    assert_eq!(names, vec!["user00", "user05"]);
}

#[tokio::test]
async fn test_find_regex_matches_substring() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(
        &db,
        query(json!({"$regex": {"name": "user0"}})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 10);
}

#[tokio::test]
async fn test_find_select_projects_fields() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 3).await;

    let result = Users::find(
        &db,
        query(json!({"$select": ["name"]})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.data().len(), 3);
    for row in result.data() {
        let object = row.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("name"));
    }
}

#[tokio::test]
async fn test_find_rejects_unknown_operator() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 3).await;

    let err = Users::find(
        &db,
        query(json!({"$where": "1=1"})),
        OperationOptions::default(),
    )
    .await
    .unwrap_err();

    match err {
        ApiError::InvalidQueryParameter { key, query } => {
            assert_eq!(key, "$where");
            assert_eq!(query["$where"], "1=1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_find_rejects_nested_unknown_operator() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let err = Users::find(
        &db,
        query(json!({"age": {"$exists": "true"}})),
        OperationOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::InvalidQueryParameter { ref key, .. } if key == "$exists"));
}

#[tokio::test]
async fn test_find_requires_mode_flag() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let err = Users::find(
        &db,
        RawQuery::default(),
        OperationOptions {
            handle_soft_delete: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::MissingModeFlag { .. }));
}

#[tokio::test]
async fn test_find_excludes_soft_deleted_rows() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    Users::remove(
        &db,
        Some(1.into()),
        RawQuery::default(),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let soft = Users::find(&db, RawQuery::default(), OperationOptions::default())
        .await
        .unwrap();
    let FindResult::Paginated(page) = soft else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 24);

    // Same table, no delete key configured
    let plain = PlainUsers::find(&db, RawQuery::default(), OperationOptions::default())
        .await
        .unwrap();
    let FindResult::Paginated(page) = plain else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 25);
}

#[tokio::test]
async fn test_find_from_query_string() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let params = parse_query_string("age[$gt]=40&$sort[age]=-1");
    let result = Users::find(&db, RawQuery::new(params), OperationOptions::default())
        .await
        .unwrap();

    assert_eq!(ages(result.data()), vec![44, 43, 42, 41]);
}

#[tokio::test]
async fn test_find_relations_page_root_rows() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users_with_addresses(&db).await;

    let result = Users::find(
        &db,
        query(json!({"$relations": "addresses", "$limit": "2", "$sort": {"id": "1"}})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    // Counted per root row, not per joined row
    assert_eq!(page.total, 3);
    assert_eq!(page.data.len(), 2);

    let first = &page.data[0];
    assert_eq!(first["name"], "user00");
    let mut cities: Vec<&str> = first["addresses"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|address| address["city"].as_str())
        .collect();
    cities.sort_unstable();
    assert_eq!(cities, vec!["Lausanne", "Zurich"]);

    let second = &page.data[1];
    assert_eq!(second["addresses"].as_array().unwrap().len(), 1);
    assert_eq!(second["addresses"][0]["city"], "Geneva");
}

#[tokio::test]
async fn test_find_relations_without_matches_are_empty() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users_with_addresses(&db).await;

    let result = Users::find(
        &db,
        query(json!({"$relations": ["addresses"], "$paginate": "false", "$sort": {"id": "1"}})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let rows = result.data();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["name"], "user02");
    assert_eq!(rows[2]["addresses"], json!([]));
}

#[tokio::test]
async fn test_find_relation_to_one() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users_with_addresses(&db).await;

    let result = Addresses::find(
        &db,
        query(json!({"$relations": "user", "city": "Geneva"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let rows = result.data();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["user"].is_object());
    assert_eq!(rows[0]["user"]["name"], "user01");
    assert_eq!(rows[0]["user"]["age"], 21);
}

#[tokio::test]
async fn test_find_unknown_relation_is_rejected() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 2).await;

    let err = Users::find(
        &db,
        query(json!({"$relations": "pets"})),
        OperationOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::BadRequest { .. }));
    assert_eq!(err.user_message(), "Unknown relation: pets");
}

#[tokio::test]
async fn test_find_oversized_paging_is_capped() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 25).await;

    let result = Users::find(
        &db,
        query(json!({"$limit": "99999999999999999999"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();
    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.limit, MAX_ROWS);
    assert_eq!(page.data.len(), 25);

    let result = Users::find(
        &db,
        query(json!({"$skip": "10000000000000000000"})),
        OperationOptions::default(),
    )
    .await
    .unwrap();
    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.skip, MAX_ROWS);
    assert_eq!(page.total, 25);
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_find_integer_beyond_i64_in_predicate() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed_users(&db, 5).await;

    let result = Users::find(
        &db,
        query(json!({"age": {"$lt": u64::MAX}})),
        OperationOptions::default(),
    )
    .await
    .unwrap();

    let FindResult::Paginated(page) = result else {
        panic!("expected a paginated result");
    };
    assert_eq!(page.total, 5);
}
