//! The tabular view engine.
//!
//! `TableEngine` holds the caller's rows and column descriptors and turns a
//! `QueryState` into what the table shows: search, then filters, then sort,
//! then the page slice. Rows are never modified, only indexed.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use derive_setters::Setters;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, trace};

use crate::column::{Accessor, ColumnDescriptor};
use crate::pagination::{PaginationBar, ResultSummary, clamp_page, page_range, total_pages};
use crate::query::{QueryState, SortDirection};
use crate::render::Cell;
use crate::row::{Row, value_number, value_text};

pub const NO_DATA: &str = "No data available";
pub const NO_RESULTS: &str = "No results match your search criteria";

#[derive(Debug, Clone, PartialEq, Eq, Setters)]
#[setters(into)]
pub struct TableProps {
    pub title: String,
    pub add_button_text: String,
    pub is_loading: bool,
}

impl Default for TableProps {
    fn default() -> Self {
        TableProps {
            title: "Organization Management".to_string(),
            add_button_text: "Add New".to_string(),
            is_loading: false,
        }
    }
}

/// Handlers the caller wires to its own create/update/delete logic.
/// `index` is the position of the row in the data handed to the engine.
pub trait TableActions {
    fn on_edit(&mut self, index: usize, row: &Row);
    fn on_delete(&mut self, index: usize, row: &Row);
    fn on_add(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub index: usize,
    pub cells: Vec<Cell>,
}

/// One input of the filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInput {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub title: String,
    pub add_button_text: String,
    pub headers: Vec<String>,
    pub filters: Vec<FilterInput>,
    pub rows: Vec<RenderedRow>,
    pub empty_message: Option<&'static str>,
    pub summary: ResultSummary,
    pub pagination: Option<PaginationBar>,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSnapshot {
    Loading,
    Ready(PageView),
}

pub struct TableEngine {
    props: TableProps,
    columns: Vec<ColumnDescriptor>,
    data: Arc<Vec<Row>>,
}

impl TableEngine {
    pub fn new(props: TableProps, columns: Vec<ColumnDescriptor>) -> Self {
        TableEngine {
            props,
            columns,
            data: Arc::new(Vec::new()),
        }
    }

    pub fn with_data(mut self, data: Vec<Row>) -> Self {
        self.set_data(data);
        self
    }

    pub fn set_data(&mut self, data: Vec<Row>) {
        self.data = Arc::new(data);
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDescriptor>) {
        self.columns = columns;
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.props.is_loading = is_loading;
    }

    pub fn props(&self) -> &TableProps {
        &self.props
    }

    pub fn data(&self) -> &[Row] {
        &self.data
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.key() == key)
    }

    /// Columns offered as per-column filter inputs.
    pub fn filterable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_filterable())
    }

    /// The filter bar: one input per filterable column with its current text.
    pub fn filter_inputs(&self, query: &QueryState) -> Vec<FilterInput> {
        self.filterable_columns()
            .map(|c| FilterInput {
                key: c.key().to_string(),
                label: c.get_label().to_string(),
                value: query.filter(c.key()).unwrap_or_default().to_string(),
            })
            .collect()
    }

    fn resolve(&self, key: &str, row: &Row) -> Value {
        match self.column(key) {
            Some(column) => column.resolve(row),
            None => Accessor::Key.resolve(key, row),
        }
    }

    fn matches(&self, row: &Row, term: &str, filters: &[(String, String)]) -> bool {
        if !term.is_empty()
            && !self
                .columns
                .iter()
                .filter(|c| c.is_searchable())
                .any(|c| c.match_text(row).contains(term))
        {
            return false;
        }
        filters.iter().all(|(key, needle)| {
            value_text(&self.resolve(key, row))
                .to_lowercase()
                .contains(needle.as_str())
        })
    }

    /// Indices into `data()` of the filtered set, in display order.
    pub fn filtered_indices(&self, query: &QueryState) -> Vec<usize> {
        let start_time = Instant::now();
        let term = query.search_term().to_lowercase();
        let filters: Vec<(String, String)> = query
            .active_filters()
            .map(|(key, value)| (key.to_string(), value.to_lowercase()))
            .collect();

        let mut indices: Vec<usize> = if term.is_empty() && filters.is_empty() {
            (0..self.data.len()).collect()
        } else {
            (0..self.data.len())
                .into_par_iter()
                .filter(|&idx| self.matches(&self.data[idx], &term, &filters))
                .collect()
        };

        if let Some(sort) = query.sort() {
            let keys: Vec<Value> = indices
                .iter()
                .map(|&idx| self.resolve(&sort.key, &self.data[idx]))
                .collect();
            let mut order: Vec<usize> = (0..indices.len()).collect();
            order.sort_by(|&a, &b| compare_values(&keys[a], &keys[b], sort.direction));
            indices = order.into_iter().map(|pos| indices[pos]).collect();
        }

        trace!(
            "Query matched {} of {} rows in {}ms",
            indices.len(),
            self.data.len(),
            start_time.elapsed().as_millis()
        );
        indices
    }

    pub fn filtered_rows(&self, query: &QueryState) -> Vec<&Row> {
        self.filtered_indices(query)
            .into_iter()
            .map(|idx| &self.data[idx])
            .collect()
    }

    /// Page actually shown for `query`, the stored page clamped to the current page count.
    pub fn effective_page(&self, query: &QueryState) -> usize {
        let filtered = self.filtered_indices(query).len();
        clamp_page(query.current_page(), total_pages(filtered, query.page_size().get()))
    }

    pub fn total_pages(&self, query: &QueryState) -> usize {
        total_pages(self.filtered_indices(query).len(), query.page_size().get())
    }

    fn page_indices(&self, query: &QueryState, filtered: &[usize]) -> (usize, usize, Vec<usize>) {
        let page_size = query.page_size().get();
        let pages = total_pages(filtered.len(), page_size);
        let page = clamp_page(query.current_page(), pages);
        let range = page_range(page, page_size, filtered.len());
        (page, pages, filtered[range].to_vec())
    }

    pub fn page(&self, query: &QueryState) -> PageView {
        let filtered = self.filtered_indices(query);
        let page_size = query.page_size().get();
        let (page, pages, indices) = self.page_indices(query, &filtered);
        let range = page_range(page, page_size, filtered.len());

        let rows = indices
            .iter()
            .map(|&index| RenderedRow {
                index,
                cells: self.columns.iter().map(|c| c.cell(&self.data[index])).collect(),
            })
            .collect();

        let empty_message = if self.data.is_empty() {
            Some(NO_DATA)
        } else if filtered.is_empty() {
            Some(NO_RESULTS)
        } else {
            None
        };

        debug!(
            "Page {}/{} of \"{}\": {} rows",
            page,
            pages,
            self.props.title,
            indices.len()
        );

        PageView {
            title: self.props.title.clone(),
            add_button_text: self.props.add_button_text.clone(),
            headers: self.columns.iter().map(|c| c.get_label().to_string()).collect(),
            filters: self.filter_inputs(query),
            rows,
            empty_message,
            summary: ResultSummary::new(&range, filtered.len(), self.data.len(), query.has_search()),
            pagination: PaginationBar::new(page, pages),
            page,
            total_pages: pages,
            page_size,
        }
    }

    pub fn snapshot(&self, query: &QueryState) -> TableSnapshot {
        if self.props.is_loading {
            TableSnapshot::Loading
        } else {
            TableSnapshot::Ready(self.page(query))
        }
    }

    /// Data index of the row at `position` on the current page.
    pub fn index_at(&self, query: &QueryState, position: usize) -> Option<usize> {
        let filtered = self.filtered_indices(query);
        let (_, _, indices) = self.page_indices(query, &filtered);
        indices.get(position).copied()
    }

    pub fn row_at(&self, query: &QueryState, position: usize) -> Option<&Row> {
        self.index_at(query, position).map(|idx| &self.data[idx])
    }

    pub fn edit(&self, query: &QueryState, position: usize, actions: &mut impl TableActions) -> bool {
        match self.index_at(query, position) {
            Some(idx) => {
                actions.on_edit(idx, &self.data[idx]);
                true
            }
            None => {
                debug!("Edit ignored, no row at position {position}");
                false
            }
        }
    }

    pub fn delete(&self, query: &QueryState, position: usize, actions: &mut impl TableActions) -> bool {
        match self.index_at(query, position) {
            Some(idx) => {
                actions.on_delete(idx, &self.data[idx]);
                true
            }
            None => {
                debug!("Delete ignored, no row at position {position}");
                false
            }
        }
    }

    pub fn add(&self, actions: &mut impl TableActions) {
        actions.on_add();
    }
}

// Nulls always go last. Numbers (and numeric text) before other text.
fn compare_values(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    let ordering = match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => match (value_number(a), value_number(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => value_text(a).to_lowercase().cmp(&value_text(b).to_lowercase()),
        },
    };
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Sort;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    fn engine() -> TableEngine {
        TableEngine::new(
            TableProps::default(),
            vec![
                ColumnDescriptor::new("name", "Name").filterable(true),
                ColumnDescriptor::new("cost", "Cost"),
                ColumnDescriptor::new("active", "Active"),
            ],
        )
        .with_data(rows(json!([
            {"name": "pump", "cost": 10, "active": true},
            {"name": "Valve", "cost": 2.5, "active": false},
            {"name": "belt", "cost": null, "active": true},
            {"name": "Drill", "cost": "100", "active": null},
        ])))
    }

    #[derive(Default)]
    struct Recorder {
        edited: Vec<usize>,
        deleted: Vec<usize>,
        added: usize,
    }

    impl TableActions for Recorder {
        fn on_edit(&mut self, index: usize, _row: &Row) {
            self.edited.push(index);
        }
        fn on_delete(&mut self, index: usize, _row: &Row) {
            self.deleted.push(index);
        }
        fn on_add(&mut self) {
            self.added += 1;
        }
    }

    #[test]
    fn sort_numbers_with_nulls_last() {
        let engine = engine();
        let mut query = QueryState::default();
        query.set_sort(Some(Sort::ascending("cost")));
        assert_eq!(engine.filtered_indices(&query), vec![1, 0, 3, 2]);
        query.set_sort(Some(Sort::descending("cost")));
        assert_eq!(engine.filtered_indices(&query), vec![3, 0, 1, 2]);
    }

    #[test]
    fn sort_keeps_nan_and_inf_text_as_text() {
        let columns = vec![ColumnDescriptor::new("cost", "Cost")];
        let engine = TableEngine::new(TableProps::default(), columns).with_data(rows(json!([
            {"cost": "30"},
            {"cost": "nan"},
            {"cost": "4"},
            {"cost": "pump"},
            {"cost": "inf"},
            {"cost": "12.5"},
            {"cost": "NaN"},
            {"cost": "-1"},
        ])));
        let mut query = QueryState::default();
        query.set_sort(Some(Sort::ascending("cost")));
        assert_eq!(engine.filtered_indices(&query), vec![7, 2, 5, 0, 4, 1, 6, 3]);
    }

    #[test]
    fn filter_bar_lists_filterable_columns() {
        let engine = engine();
        let mut query = QueryState::default();
        query.set_filter("name", "pu");
        let page = engine.page(&query);
        assert_eq!(
            page.filters,
            vec![FilterInput {
                key: "name".into(),
                label: "Name".into(),
                value: "pu".into(),
            }]
        );
        assert_eq!(page.rows.len(), 1);
    }

    #[test]
    fn sort_text_case_insensitive() {
        let engine = engine();
        let mut query = QueryState::default();
        query.set_sort(Some(Sort::ascending("name")));
        assert_eq!(engine.filtered_indices(&query), vec![2, 3, 0, 1]);
    }

    #[test]
    fn unsearchable_columns_are_skipped() {
        let engine = TableEngine::new(
            TableProps::default(),
            vec![
                ColumnDescriptor::new("name", "Name"),
                ColumnDescriptor::new("secret", "Secret").searchable(false),
            ],
        )
        .with_data(rows(json!([{"name": "a", "secret": "needle"}, {"name": "needle", "secret": "b"}])));
        let mut query = QueryState::default();
        query.set_search_term("NEEDLE");
        assert_eq!(engine.filtered_indices(&query), vec![1]);
    }

    #[test]
    fn loading_short_circuits() {
        let mut engine = engine();
        engine.set_loading(true);
        assert_eq!(engine.snapshot(&QueryState::default()), TableSnapshot::Loading);
        engine.set_loading(false);
        assert!(matches!(engine.snapshot(&QueryState::default()), TableSnapshot::Ready(_)));
    }

    #[test]
    fn empty_messages() {
        let empty = TableEngine::new(TableProps::default(), vec![ColumnDescriptor::new("name", "Name")]);
        assert_eq!(empty.page(&QueryState::default()).empty_message, Some(NO_DATA));

        let engine = engine();
        let mut query = QueryState::default();
        query.set_search_term("nothing like this");
        let page = engine.page(&query);
        assert_eq!(page.empty_message, Some(NO_RESULTS));
        assert!(page.rows.is_empty());
        assert_eq!(page.pagination, None);
    }

    #[test]
    fn actions_receive_data_index() {
        let engine = engine();
        let mut query = QueryState::default();
        query.set_sort(Some(Sort::ascending("name")));
        let mut recorder = Recorder::default();
        assert!(engine.edit(&query, 0, &mut recorder));
        assert!(engine.delete(&query, 3, &mut recorder));
        assert!(!engine.delete(&query, 9, &mut recorder));
        engine.add(&mut recorder);
        assert_eq!(recorder.edited, vec![2]);
        assert_eq!(recorder.deleted, vec![1]);
        assert_eq!(recorder.added, 1);
    }

    #[test]
    fn props_defaults_and_setters() {
        let props = TableProps::default();
        assert_eq!(props.title, "Organization Management");
        assert_eq!(props.add_button_text, "Add New");
        assert!(!props.is_loading);
        let props = props.title("Assets").add_button_text("Add Asset");
        assert_eq!(props.title, "Assets");
        assert_eq!(props.add_button_text, "Add Asset");
    }
}
