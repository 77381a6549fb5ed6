use std::path::PathBuf;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use serde_json::{Number, Value};
use tracing::{debug, error, info, trace, warn};

use gridview::column::ColumnDescriptor;
use gridview::domain::{CMDMode, HELP_TEXT, Message, TVConfig, TVError};
use gridview::engine::{TableActions, TableEngine, TableProps, TableSnapshot};
use gridview::export::{csv_line, export_csv_today};
use gridview::loader::{infer_columns, load_column_config, load_rows};
use gridview::query::{QueryState, Sort, SortDirection};
use gridview::row::{Row, value_text};

use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FORM,
    CONFIRM,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub value: String,
    original: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordForm {
    pub title: String,
    pub fields: Vec<FormField>,
    pub selected: usize,
    target: Option<usize>, // None adds a new record
}

// Row actions requested through the engine, handled after the engine borrow ends.
enum RowRequest {
    Edit(usize),
    Delete(usize),
    Add,
}

#[derive(Default)]
struct Requests(Vec<RowRequest>);

impl TableActions for Requests {
    fn on_edit(&mut self, index: usize, _row: &Row) {
        self.0.push(RowRequest::Edit(index));
    }

    fn on_delete(&mut self, index: usize, _row: &Row) {
        self.0.push(RowRequest::Delete(index));
    }

    fn on_add(&mut self) {
        self.0.push(RowRequest::Add);
    }
}

pub struct UIData {
    pub snapshot: TableSnapshot,
    pub search_term: String,
    pub selected_column: Option<String>,
    pub sort: Option<String>,
    pub page_size: usize,
    pub selected_row: usize,
    pub show_popup: bool,
    pub popup_title: String,
    pub popup_message: String,
    pub confirm_message: Option<String>,
    pub form: Option<RecordForm>,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            snapshot: TableSnapshot::Loading,
            search_term: String::new(),
            selected_column: None,
            sort: None,
            page_size: 0,
            selected_row: 0,
            show_popup: false,
            popup_title: String::new(),
            popup_message: String::new(),
            confirm_message: None,
            form: None,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    records: Vec<Row>,
    engine: TableEngine,
    query: QueryState,
    cursor_row: usize,
    selected_column: usize,
    form: Option<RecordForm>,
    pending_delete: Option<usize>,
    confirm_message: Option<String>,
    uidata: UIData,
    ui_size: (usize, usize),
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    cmd_previous: String,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &TVConfig) -> Self {
        let props = TableProps::default()
            .title(config.title.clone())
            .add_button_text(config.add_button_text.clone())
            .is_loading(true);
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            records: Vec::new(),
            engine: TableEngine::new(props, Vec::new()),
            query: QueryState::new(config.page_size),
            cursor_row: 0,
            selected_column: 0,
            form: None,
            pending_delete: None,
            confirm_message: None,
            uidata: UIData::empty(),
            ui_size: (0, 0),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            cmd_previous: String::new(),
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started gridview!".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message("Loading ...");
        model.update_uidata();
        model
    }

    pub fn load_data_file(&mut self, path: PathBuf, columns: Option<PathBuf>) -> Result<bool, TVError> {
        let start_time = Instant::now();
        let rows = load_rows(&path)?;
        let columns = match columns {
            Some(column_path) => load_column_config(&column_path, &self.config)?,
            None => infer_columns(&rows, &self.config),
        };
        if columns.is_empty() {
            warn!("No columns to show for {}", path.display());
        }
        self.set_records(rows, columns);
        let duration = start_time.elapsed().as_millis();
        info!("Loading {} took {duration}ms ...", path.display());
        self.set_status_message(format!("Loaded {} records in {duration}ms ...", self.records.len()));
        self.update_uidata();
        Ok(true)
    }

    pub fn set_records(&mut self, records: Vec<Row>, columns: Vec<ColumnDescriptor>) {
        self.engine.set_columns(columns);
        self.records = records;
        self.refresh_data();
        self.engine.set_loading(false);
        self.status = Status::READY;
        self.update_uidata();
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    #[cfg(test)]
    pub fn records(&self) -> &[Row] {
        &self.records
    }

    #[cfg(test)]
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::CMDINPUT | Modus::FORM | Modus::CONFIRM)
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveUp => self.move_selection_up(),
                    Message::NextPage => self.change_page(|q, total| q.next_page(total)),
                    Message::PrevPage => self.change_page(|q, total| q.prev_page(total)),
                    Message::FirstPage => self.change_page(|q, _| q.first_page()),
                    Message::LastPage => self.change_page(|q, total| q.last_page(total)),
                    Message::CyclePageSize => {
                        let next = self.query.page_size().next();
                        self.query.set_page_size(next);
                        self.cursor_row = 0;
                    }
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                    Message::NextFilterColumn => self.select_column(1),
                    Message::PrevFilterColumn => self.select_column(-1),
                    Message::ClearFilters => {
                        self.query.clear();
                        self.cursor_row = 0;
                        self.set_status_message("Cleared search and filters");
                    }
                    Message::SortAscending => self.sort_selected_column(SortDirection::Ascending),
                    Message::SortDescending => self.sort_selected_column(SortDirection::Descending),
                    Message::Export => self.export(),
                    Message::Edit => self.request(|engine, query, cursor, requests| {
                        engine.edit(query, cursor, requests);
                    }),
                    Message::Delete => self.request(|engine, query, cursor, requests| {
                        engine.delete(query, cursor, requests);
                    }),
                    Message::Add => self.request(|engine, _, _, requests| engine.add(requests)),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help | Message::Edit => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT | Modus::FORM | Modus::CONFIRM => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        self.update_uidata();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    fn page_rows(&self) -> usize {
        match &self.uidata.snapshot {
            TableSnapshot::Ready(page) => page.rows.len(),
            TableSnapshot::Loading => 0,
        }
    }

    fn move_selection_down(&mut self) {
        if self.cursor_row + 1 < self.page_rows() {
            self.cursor_row += 1;
        }
    }

    fn move_selection_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
    }

    fn change_page(&mut self, step: impl FnOnce(&mut QueryState, usize)) {
        let total = self.engine.total_pages(&self.query);
        step(&mut self.query, total);
        self.cursor_row = 0;
    }

    fn select_column(&mut self, step: isize) {
        let count = self.engine.columns().len();
        if count == 0 {
            return;
        }
        self.selected_column =
            (self.selected_column as isize + step).rem_euclid(count as isize) as usize;
        let column = &self.engine.columns()[self.selected_column];
        let message = format!("Selected column {}", column.get_label());
        self.set_status_message(message);
    }

    fn current_column(&self) -> Option<&ColumnDescriptor> {
        self.engine.columns().get(self.selected_column)
    }

    fn sort_selected_column(&mut self, direction: SortDirection) {
        let Some(column) = self.current_column() else {
            return;
        };
        if !column.is_sortable() {
            let message = format!("Column {} is not sortable", column.get_label());
            self.set_status_message(message);
            return;
        }
        let key = column.key().to_string();
        let sort = match direction {
            SortDirection::Ascending => Sort::ascending(key),
            SortDirection::Descending => Sort::descending(key),
        };
        self.query.set_sort(Some(sort));
        self.cursor_row = 0;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let preset = match mode {
            CMDMode::Search => self.query.search_term().to_string(),
            CMDMode::Filter => {
                let Some(column) = self.current_column() else {
                    return;
                };
                if !column.is_filterable() {
                    let message = format!("Column {} is not filterable", column.get_label());
                    self.set_status_message(message);
                    return;
                }
                self.query.filter(column.key()).unwrap_or_default().to_string()
            }
        };
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.cmd_previous = preset.clone();
        self.input.set(&preset);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        match self.modus {
            Modus::CMDINPUT => self.cmd_input(key),
            Modus::FORM => self.form_input(key),
            Modus::CONFIRM => self.confirm_input(key),
            _ => {}
        }
    }

    // Search and filters apply while typing. Esc restores the previous value.
    fn cmd_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let value = if self.last_input.canceled {
            self.cmd_previous.clone()
        } else {
            self.last_input.input.clone()
        };
        self.apply_cmd_value(&value);

        if self.last_input.finished {
            trace!("Finished cmd input {:?}: {}", self.cmd_mode, value);
            self.active_cmdinput = false;
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            self.cmd_mode = None;
            self.input.clear();
            let matches = self.engine.filtered_indices(&self.query).len();
            self.set_status_message(format!("Found {matches} results"));
        }
    }

    fn apply_cmd_value(&mut self, value: &str) {
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                if self.query.search_term() != value {
                    self.query.set_search_term(value);
                }
            }
            Some(CMDMode::Filter) => {
                if let Some(key) = self.current_column().map(|c| c.key().to_string())
                    && self.query.filter(&key).unwrap_or_default() != value
                {
                    self.query.set_filter(key, value);
                }
            }
            None => {}
        }
        self.cursor_row = 0;
    }

    fn request(
        &mut self,
        f: impl FnOnce(&TableEngine, &QueryState, usize, &mut Requests),
    ) {
        let mut requests = Requests::default();
        f(&self.engine, &self.query, self.cursor_row, &mut requests);
        for request in requests.0 {
            match request {
                RowRequest::Edit(idx) => self.open_form(Some(idx)),
                RowRequest::Delete(idx) => self.ask_delete(idx),
                RowRequest::Add => self.open_form(None),
            }
        }
    }

    fn open_form(&mut self, target: Option<usize>) {
        let record = target.and_then(|idx| self.records.get(idx));
        let fields: Vec<FormField> = self
            .engine
            .columns()
            .iter()
            .filter_map(|column| {
                let key = column.direct_key()?;
                let original = record
                    .and_then(|r| r.get(key))
                    .cloned()
                    .unwrap_or(Value::Null);
                Some(FormField {
                    key: key.to_string(),
                    label: column.get_label().to_string(),
                    value: value_text(&original),
                    original,
                })
            })
            .collect();
        if fields.is_empty() {
            self.set_status_message("No editable columns");
            return;
        }
        let title = match target {
            Some(idx) => format!("Edit record {}", idx + 1),
            None => self.engine.props().add_button_text.clone(),
        };
        debug!("Open form \"{}\" with {} fields", title, fields.len());
        self.input.set(&fields[0].value);
        self.last_input = self.input.get();
        self.form = Some(RecordForm {
            title,
            fields,
            selected: 0,
            target,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::FORM;
    }

    fn form_input(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            self.modus = Modus::TABLE;
            return;
        };
        let step = match (key.code, key.modifiers) {
            (KeyCode::Tab, _) | (KeyCode::Down, _) => Some(1),
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => Some(form.fields.len() - 1),
            _ => None,
        };
        if let Some(step) = step {
            form.fields[form.selected].value = self.input.get().input;
            form.selected = (form.selected + step) % form.fields.len();
            self.input.set(&form.fields[form.selected].value);
            self.last_input = self.input.get();
            return;
        }

        self.last_input = self.input.read(key);
        if self.last_input.finished {
            if self.last_input.canceled {
                self.set_status_message("Canceled");
            } else {
                form.fields[form.selected].value = self.last_input.input.clone();
                self.save_form();
            }
            self.form = None;
            self.input.clear();
            self.modus = Modus::TABLE;
            self.previous_modus = Modus::FORM;
        }
    }

    fn save_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        match form.target {
            Some(idx) => {
                let Some(record) = self.records.get_mut(idx) else {
                    error!("Record {idx} vanished while editing");
                    return;
                };
                for field in form.fields.iter() {
                    record.insert(field.key.clone(), parse_like(&field.original, &field.value));
                }
                info!("Updated record {}", idx + 1);
                self.set_status_message(format!("Saved record {}", idx + 1));
            }
            None => {
                let mut record = Row::new();
                for field in form.fields.iter() {
                    record.insert(field.key.clone(), parse_like(&field.original, &field.value));
                }
                self.records.push(record);
                info!("Added record {}", self.records.len());
                self.set_status_message("Added record");
            }
        }
        self.refresh_data();
    }

    fn ask_delete(&mut self, idx: usize) {
        let label = self
            .engine
            .columns()
            .first()
            .zip(self.records.get(idx))
            .map(|(column, record)| column.display_text(record))
            .unwrap_or_else(|| format!("#{}", idx + 1));
        self.pending_delete = Some(idx);
        self.previous_modus = self.modus;
        self.modus = Modus::CONFIRM;
        self.confirm_message = Some(format!("Delete \"{label}\"? (y/n)"));
    }

    fn confirm_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(idx) = self.pending_delete.take()
                    && idx < self.records.len()
                {
                    self.records.remove(idx);
                    info!("Deleted record {}", idx + 1);
                    self.set_status_message(format!("Deleted record {}", idx + 1));
                    self.refresh_data();
                }
                self.modus = Modus::TABLE;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending_delete = None;
                self.modus = Modus::TABLE;
                self.set_status_message("Canceled");
            }
            _ => {}
        }
    }

    fn refresh_data(&mut self) {
        self.engine.set_data(self.records.clone());
    }

    fn export(&mut self) {
        let export = export_csv_today(&self.engine, &self.query);
        match export.write_to_dir(&self.config.export_dir) {
            Ok(path) => {
                self.set_status_message(format!("Exported {} rows to {}", export.rows, path.display()))
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn copy_table_row(&mut self) {
        let Some(row) = self.engine.row_at(&self.query, self.cursor_row) else {
            return;
        };
        let values: Vec<String> = self
            .engine
            .columns()
            .iter()
            .map(|c| c.display_text(row))
            .collect();
        let row_content = csv_line(&values);

        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new()
                .map_err(|e| error!("Clipboard not available: {:?}", e))
                .ok();
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("Clipboard not available");
            return;
        };
        match clipboard.set_text(row_content) {
            Ok(_) => {
                trace!("Copied row content to clipboard.");
                self.set_status_message("Copied row to clipboard");
            }
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Copying to clipboard failed");
            }
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn update_uidata(&mut self) {
        let snapshot = self.engine.snapshot(&self.query);
        if let TableSnapshot::Ready(page) = &snapshot {
            self.cursor_row = self.cursor_row.min(page.rows.len().saturating_sub(1));
        }

        let label_of = |key: &str| {
            self.engine
                .column(key)
                .map(|c| c.get_label().to_string())
                .unwrap_or_else(|| key.to_string())
        };
        let sort = self.query.sort().map(|s| {
            let arrow = match s.direction {
                SortDirection::Ascending => "↑",
                SortDirection::Descending => "↓",
            };
            format!("{} {arrow}", label_of(&s.key))
        });

        let confirm_message = if self.modus == Modus::CONFIRM {
            self.confirm_message.clone()
        } else {
            None
        };

        self.uidata = UIData {
            snapshot,
            search_term: self.query.search_term().to_string(),
            selected_column: self.current_column().map(|c| c.get_label().to_string()),
            sort,
            page_size: self.query.page_size().get(),
            selected_row: self.cursor_row,
            show_popup: self.modus == Modus::POPUP,
            popup_title: " Help ".to_string(),
            popup_message: HELP_TEXT.to_string(),
            confirm_message,
            form: self.form.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

/// Parses form text into a value of the same kind the field held before.
fn parse_like(original: &Value, text: &str) -> Value {
    let trimmed = text.trim();
    match original {
        Value::Bool(_) => match trimmed.to_lowercase().as_str() {
            "true" | "active" | "yes" | "1" => Value::Bool(true),
            "false" | "inactive" | "no" | "0" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        Value::Number(_) => {
            if let Ok(i) = trimmed.parse::<i64>() {
                Value::Number(i.into())
            } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Value::Number(n)
            } else if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        }
        _ if trimmed.is_empty() => Value::Null,
        _ => Value::String(text.to_string()),
    }
}
