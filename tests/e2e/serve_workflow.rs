//! E2E Scenario: `bazaar serve` paging with tokens over stdin/stdout.

use std::io::{BufRead, BufReader, Write};
use std::process::{ChildStdin, ChildStdout, Stdio};

use bazaar::storage::Catalog;
use bazaar::test_utils::fixtures::iphone_listings;
use serde_json::{Value, json};

use super::fixture::E2EFixture;

fn ask(stdin: &mut ChildStdin, stdout: &mut BufReader<ChildStdout>, request: &Value) -> Value {
    writeln!(stdin, "{request}").unwrap();
    stdin.flush().unwrap();
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    serde_json::from_str(&line).unwrap_or_else(|err| panic!("bad reply {line:?}: {err}"))
}

fn titles(reply: &Value) -> Vec<String> {
    reply["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn serve_pages_forward_and_back_with_tokens() {
    let mut fixture = E2EFixture::new("serve");
    fixture.seed(&Catalog {
        categories: Vec::new(),
        listings: iphone_listings(),
    });

    let mut child = fixture
        .std_cmd()
        .args(["--quiet", "serve", "--workers", "2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let p1 = ask(
        &mut stdin,
        &mut stdout,
        &json!({"id": 1, "query": "iPhone", "limit": 3, "sort_order": "price_asc"}),
    );
    assert_eq!(p1["id"], 1);
    assert_eq!(titles(&p1), ["iPhone 14 Pro", "iPhone 15 Pro", "iPhone 16 Pro"]);

    let p2 = ask(
        &mut stdin,
        &mut stdout,
        &json!({
            "id": 2,
            "query": "iPhone",
            "limit": 3,
            "cursor": p1["cursor_after"],
            "qid": p1["search_id"],
        }),
    );
    assert_eq!(titles(&p2), ["iPhone 17 Pro", "iPhone 18 Pro", "iPhone 19 Pro"]);

    let back = ask(
        &mut stdin,
        &mut stdout,
        &json!({
            "id": 3,
            "query": "iPhone",
            "limit": -3,
            "cursor": p2["cursor_before"],
            "qid": p2["search_id"],
        }),
    );
    assert_eq!(titles(&back), titles(&p1));

    let bad = ask(
        &mut stdin,
        &mut stdout,
        &json!({"id": 4, "query": "iPhone", "cursor": "nope"}),
    );
    assert_eq!(bad["id"], 4);
    assert_eq!(bad["error"]["code"], "CURSOR_NOT_FOUND");
    assert_eq!(bad["error"]["recovery"], "fresh_search");

    writeln!(stdin, "not json").unwrap();
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    let garbled: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(garbled["error"]["code"], "INVALID_REQUEST");

    drop(stdin);
    let status = child.wait().unwrap();
    assert!(status.success());
}
