mod common;

use std::fs;

use common::{TixTest, ticket_content};

// ============================================================================
// End-to-end workflows through the binary
// ============================================================================

#[test]
fn test_create_start_close_reopen() {
    let tix = TixTest::new();
    let id = tix.create(&["T"]);

    let status = |tix: &TixTest| {
        tix.run_success(&["ls", "--field", "status"])
            .trim()
            .to_string()
    };

    assert_eq!(status(&tix), "open");

    tix.run_success(&["start", &id]);
    assert_eq!(status(&tix), "in_progress");

    tix.run_success(&["close", &id]);
    assert_eq!(status(&tix), "closed");
    let closed = tix.run_success(&["ls", "--field", "closed"]);
    assert!(!closed.trim().is_empty());

    tix.run_success(&["reopen", &id]);
    assert_eq!(status(&tix), "open");
    assert_eq!(tix.run_success(&["ls", "--field", "closed"]), "\n");
    assert!(!tix.read_ticket(&id).contains("closed:"));
}

#[test]
fn test_concurrent_close() {
    let tix = TixTest::new();
    let a = tix.create(&["A"]);
    let b = tix.create(&["B"]);
    tix.run_success(&["start", &a]);
    tix.run_success(&["start", &b]);

    let mut first = tix.command(&["close", &a]).spawn().unwrap();
    let mut second = tix.command(&["close", &b]).spawn().unwrap();
    assert!(first.wait().unwrap().success());
    assert!(second.wait().unwrap().success());

    let mut closed = tix.ids(&["ls", "--status", "closed"]);
    closed.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(closed, expected);
    assert!(tix.lock_files().is_empty());
}

#[test]
fn test_in_place_external_edit_keeps_cached_title() {
    let tix = TixTest::new();
    let id = tix.create(&["Original"]);
    assert_eq!(tix.run_success(&["ls", "--field", "title"]).trim(), "Original");

    // rewrite in place; the directory mtime does not move
    let modified = tix.read_ticket(&id).replace("# Original", "# Modified");
    fs::write(tix.ticket_path(&id), modified).unwrap();

    assert_eq!(tix.run_success(&["ls", "--field", "title"]).trim(), "Original");

    // a rebuild picks the edit up
    tix.run_success(&["cache", "rebuild"]);
    assert_eq!(tix.run_success(&["ls", "--field", "title"]).trim(), "Modified");
}

#[test]
fn test_cold_and_hot_listing_agree_at_65_tickets() {
    let tix = TixTest::new();
    for i in 0..65 {
        let status = if i % 2 == 0 { "closed" } else { "open" };
        let id = format!("t{i:03}");
        tix.write_ticket(&id, &ticket_content(&id, status, &format!("Ticket {i}")));
    }

    tix.run_success(&["cache", "clear"]);
    let cold = tix.run_success(&["ls", "--status", "open", "--json"]);
    let hot = tix.run_success(&["ls", "--status", "open", "--json"]);
    assert_eq!(cold, hot);

    let parsed: serde_json::Value = serde_json::from_str(&hot).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 32);

    let status: serde_json::Value =
        serde_json::from_str(&tix.run_success(&["cache", "status", "--json"])).unwrap();
    assert_eq!(status["fresh"], true);
    assert_eq!(status["entries"], 65);
}

#[test]
fn test_offset_out_of_bounds() {
    let tix = TixTest::new();
    tix.create(&["One"]);
    tix.create(&["Two"]);

    let stderr = tix.run_failure(&["ls", "--offset", "10"]);
    assert!(stderr.contains("out of bounds"));
    tix.run_failure(&["ls", "--offset", "2"]);

    let page = tix.ids(&["ls", "--offset", "1", "--limit", "10"]);
    assert_eq!(page.len(), 1);
}

#[test]
fn test_ready_follows_parent() {
    let tix = TixTest::new();
    let parent = tix.create(&["P"]);
    let child = tix.create(&["C", "--parent", &parent]);

    assert_eq!(tix.ids(&["ready"]), vec![parent.clone()]);

    tix.run_success(&["start", &parent]);
    assert_eq!(tix.ids(&["ready"]), vec![child]);
}
