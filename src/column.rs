//! Column descriptors.
//!
//! A column names a field, says how to read it from a row (the accessor), and
//! how to show it. Search, filters, sorting, the table body and the csv export
//! all go through the same descriptor, so what is exported is what is shown.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use derive_setters::Setters;
use serde_json::Value;

use crate::render::{Cell, badge_cell, currency_cell, date_cell, default_cell};
use crate::row::{Row, lookup, value_text};
use crate::schedule::due_status_cell;

pub type ResolveFn = Arc<dyn Fn(&Row) -> Value + Send + Sync>;
pub type RenderFn = Arc<dyn Fn(&Value, &Row) -> Cell + Send + Sync>;
pub type TextFn = Arc<dyn Fn(&Value, &Row) -> String + Send + Sync>;

/// How a column reads its value from a row.
#[derive(Clone)]
pub enum Accessor {
    /// `row[key]`
    Key,
    /// Dotted path into a relation, e.g. `company.name`.
    Path(String),
    /// `"{first_name} {last_name}"` of the relation stored under the key.
    FullName,
    Custom(ResolveFn),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Key => write!(f, "Key"),
            Accessor::Path(path) => write!(f, "Path({path:?})"),
            Accessor::FullName => write!(f, "FullName"),
            Accessor::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Accessor {
    pub fn resolve(&self, key: &str, row: &Row) -> Value {
        match self {
            Accessor::Key => row.get(key).cloned().unwrap_or(Value::Null),
            Accessor::Path(path) => lookup(row, path).cloned().unwrap_or(Value::Null),
            Accessor::FullName => full_name(row.get(key)),
            Accessor::Custom(f) => f(row),
        }
    }

    /// Accessors for the relation keys used across the admin screens.
    pub fn relation(key: &str) -> Accessor {
        match key {
            "company" => Accessor::Path("company.name".to_string()),
            "manager" => Accessor::Path("manager.username".to_string()),
            "department" => Accessor::Path("department.name".to_string()),
            "user" => Accessor::Path("user.username".to_string()),
            "supervisor" => Accessor::FullName,
            _ => Accessor::Key,
        }
    }
}

fn full_name(relation: Option<&Value>) -> Value {
    let Some(Value::Object(person)) = relation else {
        return Value::Null;
    };
    let name = ["first_name", "last_name"]
        .iter()
        .filter_map(|key| person.get(*key))
        .map(value_text)
        .filter(|part| !part.is_empty())
        .collect::<Vec<String>>()
        .join(" ");
    if name.is_empty() {
        Value::Null
    } else {
        Value::String(name)
    }
}

/// Built in display formats. Each one yields a cell, and the export uses that cell's text.
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    Plain,
    Date(String),
    DateTime(String),
    Currency(String),
    Badge,
    DueStatus(i64),
}

#[derive(Clone, Setters)]
#[setters(generate = false)]
pub struct ColumnDescriptor {
    key: String,
    #[setters(generate, into)]
    label: String,
    accessor: Accessor,
    format: Format,
    render: Option<RenderFn>,
    to_text: Option<TextFn>,
    #[setters(generate)]
    filterable: bool,
    #[setters(generate)]
    searchable: bool,
    #[setters(generate)]
    exportable: bool,
    #[setters(generate)]
    sortable: bool,
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("accessor", &self.accessor)
            .field("format", &self.format)
            .field("render", &self.render.is_some())
            .field("to_text", &self.to_text.is_some())
            .field("filterable", &self.filterable)
            .field("searchable", &self.searchable)
            .field("exportable", &self.exportable)
            .field("sortable", &self.sortable)
            .finish()
    }
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        ColumnDescriptor {
            key: key.into(),
            label: label.into(),
            accessor: Accessor::Key,
            format: Format::Plain,
            render: None,
            to_text: None,
            filterable: false,
            searchable: true,
            exportable: true,
            sortable: true,
        }
    }

    /// A column over one of the well known relations (`company`, `manager`, ...).
    pub fn relation(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        let accessor = Accessor::relation(&key);
        ColumnDescriptor::new(key, label).accessor(accessor)
    }

    pub fn accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.accessor(Accessor::Path(path.into()))
    }

    pub fn resolve_with<F>(self, f: F) -> Self
    where
        F: Fn(&Row) -> Value + Send + Sync + 'static,
    {
        self.accessor(Accessor::Custom(Arc::new(f)))
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn render_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Row) -> Cell + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(f));
        self
    }

    pub fn text_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Row) -> String + Send + Sync + 'static,
    {
        self.to_text = Some(Arc::new(f));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get_label(&self) -> &str {
        &self.label
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    /// The row's own field for this column, if the accessor reads one directly.
    pub fn direct_key(&self) -> Option<&str> {
        match self.accessor {
            Accessor::Key => Some(&self.key),
            _ => None,
        }
    }

    pub fn resolve(&self, row: &Row) -> Value {
        self.accessor.resolve(&self.key, row)
    }

    /// Lower cased text used by search and filters.
    pub fn match_text(&self, row: &Row) -> String {
        value_text(&self.resolve(row)).to_lowercase()
    }

    pub fn cell(&self, row: &Row) -> Cell {
        let value = self.resolve(row);
        self.cell_for(&value, row)
    }

    fn cell_for(&self, value: &Value, row: &Row) -> Cell {
        if let Some(render) = &self.render {
            return render(value, row);
        }
        match &self.format {
            Format::Plain => default_cell(value),
            Format::Date(pattern) => date_cell(value, pattern, false),
            Format::DateTime(pattern) => date_cell(value, pattern, true),
            Format::Currency(symbol) => currency_cell(value, symbol),
            Format::Badge => badge_cell(value),
            Format::DueStatus(days) => due_status_cell(value, Local::now().date_naive(), *days),
        }
    }

    /// Plain text shown for this column, shared by the table and the csv export.
    pub fn display_text(&self, row: &Row) -> String {
        let value = self.resolve(row);
        match &self.to_text {
            Some(to_text) => to_text(&value, row),
            None => self.cell_for(&value, row).as_text().to_string(),
        }
    }
}
