use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::domain::TVError;
use crate::engine::TableEngine;
use crate::query::QueryState;

pub const CSV_MIME: &str = "text/csv;charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
    pub rows: usize,
}

impl CsvExport {
    pub fn mime(&self) -> &'static str {
        CSV_MIME
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, TVError> {
        if !dir.is_dir() {
            return Err(TVError::ExportFailed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.content)?;
        info!("Exported {} rows to {}", self.rows, path.display());
        Ok(path)
    }
}

/// Lower case, whitespace runs replaced with `_`.
pub fn slug(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<String>>()
        .join("_")
}

pub fn file_name(title: &str, date: NaiveDate) -> String {
    format!("{}_export_{}.csv", slug(title), date.format("%Y-%m-%d"))
}

/// Always quoted, inner quotes doubled.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quoted only when the value would otherwise break the record.
pub fn wrap_cell_content(value: &str) -> String {
    let needs_wrapping = value
        .chars()
        .any(|c| c == '"' || c == ',' || c == '\n' || c == '\r');
    if needs_wrapping {
        quote_field(value)
    } else {
        value.to_string()
    }
}

/// One csv record, quoting fields only where needed.
pub fn csv_line<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| wrap_cell_content(v.as_ref()))
        .collect::<Vec<String>>()
        .join(",")
}

/// Exports every row of the filtered set, independent of the current page.
pub fn export_csv(engine: &TableEngine, query: &QueryState, date: NaiveDate) -> CsvExport {
    let columns: Vec<_> = engine.columns().iter().filter(|c| c.is_exportable()).collect();
    let rows = engine.filtered_rows(query);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_line(
        &columns.iter().map(|c| c.get_label()).collect::<Vec<&str>>(),
    ));
    for row in rows.iter() {
        lines.push(
            columns
                .iter()
                .map(|c| quote_field(&c.display_text(row)))
                .collect::<Vec<String>>()
                .join(","),
        );
    }

    CsvExport {
        file_name: file_name(&engine.props().title, date),
        content: lines.join("\n"),
        rows: rows.len(),
    }
}

pub fn export_csv_today(engine: &TableEngine, query: &QueryState) -> CsvExport {
    export_csv(engine, query, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDescriptor;
    use crate::engine::TableProps;
    use crate::row::Row;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn names_from_title() {
        assert_eq!(slug("Organization  Management"), "organization_management");
        assert_eq!(file_name("Work Orders", day()), "work_orders_export_2024-05-01.csv");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_field("plain"), "\"plain\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(wrap_cell_content("a,b"), "\"a,b\"");
        assert_eq!(wrap_cell_content("two words"), "two words");
        assert_eq!(csv_line(&["x", "y\nz"]), "x,\"y\nz\"");
    }

    #[test]
    fn export_skips_unexportable_columns() {
        let row: Row = json!({"name": "Pump, large", "secret": "s", "active": false})
            .as_object()
            .cloned()
            .unwrap();
        let engine = TableEngine::new(
            TableProps::default().title("Assets"),
            vec![
                ColumnDescriptor::new("name", "Name"),
                ColumnDescriptor::new("secret", "Secret").exportable(false),
                ColumnDescriptor::new("active", "Status"),
            ],
        )
        .with_data(vec![row]);
        let export = export_csv(&engine, &QueryState::default(), day());
        assert_eq!(export.file_name, "assets_export_2024-05-01.csv");
        assert_eq!(export.content, "Name,Status\n\"Pump, large\",\"Inactive\"");
        assert_eq!(export.rows, 1);
        assert_eq!(export.mime(), "text/csv;charset=utf-8");
    }
}
