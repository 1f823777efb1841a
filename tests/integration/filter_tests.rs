//! Filters, category subtrees and geo radius applied through the service.

use bazaar::config::SearchConfig;
use bazaar::error::{BazaarError, ErrorCode};
use bazaar::search::{GeoFilter, RawFilter, SearchRequest};
use bazaar::test_utils::fixtures::{furniture_catalog, seeded, service};
use serde_json::{Value, json};

use super::{ids, search};

fn browse(filters: Vec<(&str, Value)>) -> SearchRequest {
    SearchRequest {
        limit: Some(10),
        sort_order: Some("price_asc".into()),
        filters: filters
            .into_iter()
            .map(|(role, value)| RawFilter {
                role: role.to_string(),
                value,
            })
            .collect(),
        ..SearchRequest::new("")
    }
}

#[test]
fn price_range_bounds_are_inclusive() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let response = search(&svc, &db, &browse(vec![("price", json!({"min": 9000, "max": 30000}))]));
    assert_eq!(ids(&response), ["brass-lamp", "oak-table"]);
}

#[test]
fn color_matches_any_listed_value() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let response = search(&svc, &db, &browse(vec![("color", json!(["brown", "grey"]))]));
    assert_eq!(ids(&response), ["oak-table", "grey-sofa"]);
}

#[test]
fn dropdown_and_checkbox_read_characteristics() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let response = search(&svc, &db, &browse(vec![("dropdown", json!(["oak"]))]));
    assert_eq!(ids(&response), ["oak-table"]);

    let response = search(&svc, &db, &browse(vec![("checkbox", json!(false))]));
    assert_eq!(ids(&response), ["brass-lamp"]);
}

#[test]
fn dimension_bounds_convert_units() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    // 1 m .. 2 m covers the 1.6 m lamp only
    let response = search(
        &svc,
        &db,
        &browse(vec![("height", json!({"min": 1, "max": 2, "dimension": "m"}))]),
    );
    assert_eq!(ids(&response), ["brass-lamp"]);

    let response = search(
        &svc,
        &db,
        &browse(vec![("weight", json!({"min": 40, "dimension": "kg"}))]),
    );
    assert_eq!(ids(&response), ["grey-sofa"]);
}

#[test]
fn filters_combine_with_and() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let response = search(
        &svc,
        &db,
        &browse(vec![
            ("color", json!(["brown", "gold"])),
            ("price", json!({"max": 10000})),
        ]),
    );
    assert_eq!(ids(&response), ["brass-lamp"]);
}

#[test]
fn wrong_unit_family_is_rejected() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let err = svc
        .search(&db, &browse(vec![("height", json!({"min": 1, "dimension": "kg"}))]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFilterShape);
    insta::assert_snapshot!(err, @"Invalid value for filter 'height': unit 'kg' does not measure height");
}

#[test]
fn repeated_role_is_rejected() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let err = svc
        .search(
            &db,
            &browse(vec![("color", json!(["red"])), ("color", json!(["blue"]))]),
        )
        .unwrap_err();
    assert!(matches!(err, BazaarError::InvalidFilterShape { .. }));
}

#[test]
fn category_includes_descendants() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let request = SearchRequest {
        category: Some("furniture".into()),
        ..browse(Vec::new())
    };
    let response = search(&svc, &db, &request);
    assert_eq!(ids(&response), ["oak-table", "grey-sofa"]);
}

#[test]
fn category_may_be_given_by_name() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let request = SearchRequest {
        category: Some("Lighting".into()),
        ..browse(Vec::new())
    };
    assert_eq!(ids(&search(&svc, &db, &request)), ["brass-lamp"]);
}

#[test]
fn geo_radius_limits_by_distance() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let near_berlin = SearchRequest {
        location: Some(GeoFilter {
            latitude: 52.50,
            longitude: 13.40,
            radius_km: 50.0,
        }),
        ..browse(Vec::new())
    };
    assert_eq!(ids(&search(&svc, &db, &near_berlin)), ["oak-table"]);

    // zero radius means no location constraint
    let inactive = SearchRequest {
        location: Some(GeoFilter {
            latitude: 52.50,
            longitude: 13.40,
            radius_km: 0.0,
        }),
        ..browse(Vec::new())
    };
    assert_eq!(search(&svc, &db, &inactive).results.len(), 3);
}

#[test]
fn results_carry_side_relations() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());
    let response = search(&svc, &db, &browse(vec![("dropdown", json!(["oak"]))]));
    let table = &response.results[0];
    assert_eq!(table.categories.len(), 1);
    assert_eq!(table.categories[0].id, "tables");
    assert_eq!(
        table.location.as_ref().and_then(|l| l.city.as_deref()),
        Some("Berlin")
    );
    assert_eq!(table.characteristics.as_ref().unwrap()["color"], json!("brown"));
}
