use proptest::prelude::*;

use tix::cache::codec::{decode, encode};
use tix::cache::{CacheEntry, Filter, TicketCache};
use tix::parser::Document;
use tix::types::{Summary, TicketPriority, TicketStatus, TicketType, ticket_filename};

fn field_line() -> impl Strategy<Value = String> {
    ("[a-z][a-z_-]{0,10}", "[A-Za-z0-9 ,.\\[\\]-]{0,24}")
        .prop_filter("reserved key", |(k, _)| k != "status")
        .prop_map(|(k, v)| format!("{k}: {v}"))
}

fn document_text() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(field_line(), 0..12),
        "[ -~\n]{0,80}",
    )
        .prop_map(|(lines, body)| {
            let mut out = String::from("---\n");
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str("---\n");
            out.push_str(&body);
            out
        })
}

fn status() -> impl Strategy<Value = TicketStatus> {
    prop::sample::select(TicketStatus::ALL.to_vec())
}

fn entry() -> impl Strategy<Value = CacheEntry> {
    (
        0u32..40,
        status(),
        prop::sample::select(TicketPriority::ALL.to_vec()),
        prop::sample::select(TicketType::ALL.to_vec()),
        proptest::option::of(0u32..40),
    )
        .prop_map(|(n, status, priority, ticket_type, parent)| {
            let id = format!("t{n:03}");
            CacheEntry {
                mtime_ns: i64::from(n),
                summary: Summary {
                    filename: ticket_filename(&id),
                    id,
                    schema_version: 1,
                    status,
                    ticket_type,
                    priority,
                    created: "2026-01-04T10:00:00Z".to_string(),
                    blocked_by: Vec::new(),
                    parent: parent.map(|p| format!("t{p:03}")),
                    assignee: None,
                    closed: (status == TicketStatus::Closed)
                        .then(|| "2026-01-05T00:00:00Z".to_string()),
                    title: Some(format!("Ticket {n}")),
                },
            }
        })
}

proptest! {
    #[test]
    fn document_emit_is_byte_identical(text in document_text()) {
        let doc = Document::parse(&text).unwrap();
        prop_assert_eq!(doc.emit(), text);
    }

    #[test]
    fn set_status_touches_one_line(text in document_text(), s in status()) {
        let with_status = text.replacen("---\n", "---\nstatus: open\n", 1);
        let mut doc = Document::parse(&with_status).unwrap();
        doc.set_status(s);

        let expected = with_status.replacen("status: open", &format!("status: {s}"), 1);
        prop_assert_eq!(doc.emit(), expected);
    }

    #[test]
    fn indexes_stay_consistent_under_updates(
        initial in proptest::collection::vec(entry(), 0..30),
        updates in proptest::collection::vec(entry(), 0..30),
        removals in proptest::collection::vec(0u32..40, 0..10),
    ) {
        let mut cache = TicketCache::from_entries(initial, Vec::new());
        for update in updates {
            cache.update(update);
            prop_assert!(cache.indexes_consistent());
        }
        for n in removals {
            cache.remove(&format!("t{n:03}.md"));
        }
        prop_assert!(cache.indexes_consistent());

        for s in TicketStatus::ALL {
            let filter = Filter { status: Some(s), roots: true, ..Default::default() };
            let by_scan: Vec<usize> = (0..cache.len())
                .filter(|&p| filter.matches(&cache.entry_at(p).unwrap().summary))
                .collect();
            prop_assert_eq!(cache.query(&filter), by_scan);
        }

        let decoded = decode(&encode(&cache).unwrap()).unwrap();
        prop_assert_eq!(decoded.entries(), cache.entries());
        prop_assert!(decoded.indexes_consistent());
    }
}
