use chrono::NaiveDate;
use serde_json::{Value, json};

use gridview::engine::{NO_DATA, NO_RESULTS};
use gridview::export::export_csv;
use gridview::render::{Cell, Tone};
use gridview::{
    ColumnDescriptor, PageSize, QueryState, Row, Sort, TableActions, TableEngine, TableProps,
    TableSnapshot,
};

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

fn users() -> Vec<Row> {
    (1..=23)
        .map(|i| {
            row(json!({
                "id": i,
                "username": format!("user{i:02}"),
                "role": if i % 3 == 0 { "admin" } else { "member" },
                "is_active": i % 2 == 1,
                "company": if i == 7 { Value::Null } else if i % 2 == 0 {
                    json!({"id": 1, "name": "Acme Corp"})
                } else {
                    json!({"id": 2, "name": "Globex"})
                },
            }))
        })
        .collect()
}

fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("username", "Username").filterable(true),
        ColumnDescriptor::new("role", "Role").filterable(true),
        ColumnDescriptor::relation("company", "Company").filterable(true),
        ColumnDescriptor::new("is_active", "Status").searchable(false),
    ]
}

fn engine() -> TableEngine {
    TableEngine::new(TableProps::default().title("User Management"), columns()).with_data(users())
}

fn usernames(engine: &TableEngine, query: &QueryState) -> Vec<String> {
    engine
        .filtered_rows(query)
        .iter()
        .map(|r| r["username"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn filters_are_combined_with_and() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Fifty);
    query.set_filter("role", "admin");
    query.set_filter("company", "acme");
    let rows = engine.filtered_rows(&query);
    assert!(!rows.is_empty());
    for r in rows {
        assert_eq!(r["role"], json!("admin"));
        assert_eq!(r["company"]["name"], json!("Acme Corp"));
    }
    // ids divisible by 6
    assert_eq!(usernames(&engine, &query), vec!["user06", "user12", "user18"]);
}

#[test]
fn numeric_values_match_filter_text() {
    let data = vec![
        row(json!({"a": 1, "b": "x"})),
        row(json!({"a": 1, "b": "y"})),
        row(json!({"a": 2, "b": "x"})),
    ];
    let columns = vec![
        ColumnDescriptor::new("a", "A").filterable(true),
        ColumnDescriptor::new("b", "B").filterable(true),
    ];
    let engine = TableEngine::new(TableProps::default(), columns).with_data(data);
    let mut query = QueryState::new(PageSize::Ten);
    query.set_filter("a", "1");
    query.set_filter("b", "x");
    let rows = engine.filtered_rows(&query);
    assert_eq!(rows.len(), 1);
    assert_eq!(Value::Object(rows[0].clone()), json!({"a": 1, "b": "x"}));
}

#[test]
fn search_matches_any_searchable_column_ignoring_case() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Fifty);
    query.set_search_term("GLOBEX");
    let found = engine.filtered_rows(&query);
    assert_eq!(found.len(), 11);

    query.set_search_term("USER1");
    assert_eq!(engine.filtered_rows(&query).len(), 10);

    // is_active is not searchable
    query.set_search_term("true");
    assert!(engine.filtered_rows(&query).is_empty());
}

#[test]
fn pages_of_twenty_three_rows() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Ten);
    assert_eq!(engine.total_pages(&query), 3);

    query.go_to_page(3, engine.total_pages(&query));
    let page = engine.page(&query);
    assert_eq!(page.rows.len(), 3);
    assert_eq!(page.rows[0].index, 20);
    assert_eq!(page.summary.to_string(), "Showing 21-23 of 23 results");

    let bar = page.pagination.unwrap();
    assert_eq!(bar.pages, vec![1, 2, 3]);
    assert!(!bar.next_enabled);
    assert!(!bar.last_enabled);
    assert!(bar.prev_enabled);
}

#[test]
fn changing_the_query_returns_to_the_first_page() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Five);
    query.last_page(engine.total_pages(&query));
    assert_eq!(query.current_page(), 5);

    query.set_search_term("user");
    assert_eq!(query.current_page(), 1);

    query.last_page(engine.total_pages(&query));
    query.set_filter("role", "member");
    assert_eq!(query.current_page(), 1);

    query.last_page(engine.total_pages(&query));
    query.set_page_size(PageSize::Twenty);
    assert_eq!(query.current_page(), 1);

    query.last_page(engine.total_pages(&query));
    query.set_sort(Some(Sort::descending("username")));
    assert_eq!(query.current_page(), 1);
}

#[test]
fn stale_page_is_clamped() {
    let mut engine = engine();
    let mut query = QueryState::new(PageSize::Ten);
    query.last_page(engine.total_pages(&query));
    assert_eq!(query.current_page(), 3);

    engine.set_data(users().into_iter().take(12).collect());
    assert_eq!(engine.effective_page(&query), 2);
    assert_eq!(engine.page(&query).rows.len(), 2);
}

#[test]
fn export_covers_every_filtered_row() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Five);
    query.next_page(engine.total_pages(&query));
    let export = export_csv(&engine, &query, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

    assert_eq!(export.file_name, "user_management_export_2024-05-01.csv");
    assert_eq!(export.rows, 23);
    let lines: Vec<&str> = export.content.split('\n').collect();
    assert_eq!(lines.len(), 24);
    assert_eq!(lines[0], "Username,Role,Company,Status");
    assert_eq!(lines[1], "\"user01\",\"member\",\"Globex\",\"Active\"");
    assert_eq!(lines[2], "\"user02\",\"member\",\"Acme Corp\",\"Inactive\"");
    // user07 has no company
    assert_eq!(lines[7], "\"user07\",\"member\",\"-\",\"Active\"");
}

#[test]
fn nested_filter_skips_rows_without_a_relation() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Fifty);
    query.set_filter("company", "o");
    let names = usernames(&engine, &query);
    assert_eq!(names.len(), 22);
    assert!(!names.contains(&"user07".to_string()));
}

#[test]
fn queries_do_not_touch_the_data() {
    let engine = engine();
    let before = engine.data().to_vec();
    let mut query = QueryState::new(PageSize::Ten);
    query.set_search_term("user");
    query.set_filter("role", "member");
    query.set_sort(Some(Sort::descending("company")));

    let first = engine.page(&query);
    let second = engine.page(&query);
    assert_eq!(first, second);
    assert_eq!(engine.data(), before.as_slice());
}

#[test]
fn booleans_render_as_status_badges() {
    let engine = engine();
    let query = QueryState::new(PageSize::Ten);
    let page = engine.page(&query);
    assert_eq!(
        page.rows[0].cells[3],
        Cell::Badge {
            label: "Active".into(),
            tone: Tone::Positive
        }
    );
    assert_eq!(
        page.rows[1].cells[3],
        Cell::Badge {
            label: "Inactive".into(),
            tone: Tone::Negative
        }
    );
    assert_eq!(page.rows[6].cells[2], Cell::Placeholder);
}

#[test]
fn sort_keeps_nulls_last() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Fifty);
    query.set_sort(Some(Sort::ascending("company")));
    let names = usernames(&engine, &query);
    assert_eq!(names.last().map(String::as_str), Some("user07"));
    assert_eq!(names.first().map(String::as_str), Some("user02"));

    query.set_sort(Some(Sort::descending("company")));
    let names = usernames(&engine, &query);
    assert_eq!(names.last().map(String::as_str), Some("user07"));
    assert_eq!(names.first().map(String::as_str), Some("user01"));
}

#[test]
fn empty_states() {
    let empty = TableEngine::new(TableProps::default(), columns());
    let query = QueryState::new(PageSize::Ten);
    let page = empty.page(&query);
    assert_eq!(page.empty_message, Some(NO_DATA));
    assert!(page.pagination.is_none());

    let engine = engine();
    let mut query = QueryState::new(PageSize::Ten);
    query.set_search_term("nobody");
    let page = engine.page(&query);
    assert_eq!(page.empty_message, Some(NO_RESULTS));
    assert_eq!(page.summary.to_string(), "Showing 0-0 of 0 results (filtered from 23 total)");
}

#[test]
fn loading_snapshot() {
    let mut engine = engine();
    let query = QueryState::new(PageSize::Ten);
    engine.set_loading(true);
    assert_eq!(engine.snapshot(&query), TableSnapshot::Loading);
    engine.set_loading(false);
    assert!(matches!(engine.snapshot(&query), TableSnapshot::Ready(_)));
}

#[derive(Default)]
struct Recorder {
    edited: Vec<usize>,
    deleted: Vec<String>,
    added: usize,
}

impl TableActions for Recorder {
    fn on_edit(&mut self, index: usize, _row: &Row) {
        self.edited.push(index);
    }

    fn on_delete(&mut self, _index: usize, row: &Row) {
        self.deleted.push(row["username"].as_str().unwrap_or_default().to_string());
    }

    fn on_add(&mut self) {
        self.added += 1;
    }
}

#[test]
fn actions_receive_the_row_under_the_cursor() {
    let engine = engine();
    let mut query = QueryState::new(PageSize::Ten);
    query.set_filter("role", "admin");
    let mut recorder = Recorder::default();

    assert!(engine.edit(&query, 1, &mut recorder));
    assert!(engine.delete(&query, 0, &mut recorder));
    assert!(!engine.delete(&query, 10, &mut recorder));
    engine.add(&mut recorder);

    assert_eq!(recorder.edited, vec![5]);
    assert_eq!(recorder.deleted, vec!["user03"]);
    assert_eq!(recorder.added, 1);
}
