//! E2E Scenario: init, import and one-shot searches.

use bazaar::storage::Catalog;
use bazaar::test_utils::fixtures::{furniture_catalog, iphone_listings};
use predicates::prelude::*;

use super::fixture::E2EFixture;

fn iphones() -> Catalog {
    Catalog {
        categories: Vec::new(),
        listings: iphone_listings(),
    }
}

#[test]
fn init_creates_database_once() {
    let fixture = E2EFixture::new("init");
    let first = fixture.json(&["init"]);
    assert_eq!(first["created"], true);
    assert!(fixture.project.db_path().exists());

    let second = fixture.json(&["init"]);
    assert_eq!(second["created"], false);

    let forced = fixture.json(&["init", "--force"]);
    assert_eq!(forced["created"], true);
}

#[test]
fn import_reports_counts() {
    let fixture = E2EFixture::new("import");
    fixture.cmd().arg("init").assert().success();
    let path = fixture
        .project
        .write_catalog("furniture.json", &furniture_catalog());
    let report = fixture.json(&["import", path.to_str().unwrap()]);
    assert_eq!(report["listings"], 3);
    assert_eq!(report["categories"], 3);
}

#[test]
fn search_before_init_fails_with_hint() {
    let fixture = E2EFixture::new("no-init");
    fixture
        .cmd()
        .args(["search", "lamp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bazaar init"));
}

#[test]
fn json_search_returns_page_and_tokens() {
    let mut fixture = E2EFixture::new("json-search");
    fixture.seed(&iphones());

    let page = fixture.json(&["search", "iPhone", "--limit", "3", "--sort", "price_asc"]);
    let titles: Vec<&str> = page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["iPhone 14 Pro", "iPhone 15 Pro", "iPhone 16 Pro"]);
    assert_eq!(page["cursor_after"].as_str().unwrap().len(), 96);
    assert!(page.get("cursor_before").is_none());
    assert_eq!(page["search_id"].as_str().unwrap().len(), 96);
}

#[test]
fn human_search_lists_titles() {
    let mut fixture = E2EFixture::new("human-search");
    fixture.seed(&furniture_catalog());
    fixture
        .cmd()
        .args(["search", "oak table", "--sort", "price_asc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Oak dining table"))
        .stdout(predicate::str::contains("Brass floor lamp"))
        .stdout(predicate::str::contains("Grey sofa").not());
}

#[test]
fn filters_from_the_command_line() {
    let mut fixture = E2EFixture::new("cli-filters");
    fixture.seed(&furniture_catalog());
    let page = fixture.json(&[
        "search",
        "--filter",
        r#"color=["gold","grey"]"#,
        "--filter",
        r#"price={"max":20000}"#,
    ]);
    let results = page["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "brass-lamp");
}

#[test]
fn bad_filter_is_a_structured_error() {
    let mut fixture = E2EFixture::new("bad-filter");
    fixture.seed(&furniture_catalog());
    let output = fixture
        .cmd()
        .args(["--json", "search", "lamp", "--filter", r#"price=["x"]"#])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_FILTER_SHAPE");
    assert_eq!(body["error"]["recovery"], "fix_input");
    assert_eq!(body["error"]["context"]["role"], "price");
}

#[test]
fn limit_out_of_range_is_rejected() {
    let mut fixture = E2EFixture::new("limit-range");
    fixture.seed(&iphones());
    fixture
        .cmd()
        .args(["search", "iPhone", "--limit", "101"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit 101"));
}

#[test]
fn config_shows_defaults() {
    let fixture = E2EFixture::new("config");
    fixture
        .cmd()
        .args(["config", "search.max_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("100\n"));

    let all = fixture.json(&["config"]);
    assert_eq!(all["search"]["default_limit"], 20);
    assert!(all["cache"].get("secret").is_none());
}
