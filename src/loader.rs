//! Loading row collections and column configurations from disk.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::{debug, info, warn};

use crate::column::{Accessor, ColumnDescriptor, Format};
use crate::domain::{TVConfig, TVError};
use crate::row::{Row, collapse_empty_relations, insert_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSV,
    PARQUET,
    ARROW,
    JSON,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, TVError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| TVError::LoadingFailed(format!("cannot expand {raw}: {e}")))
}

pub fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        Some("JSON") => Ok(FileType::JSON),
        _ => Err(TVError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }
    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

/// Loads every record of a data file. Dotted column names (`company.name`)
/// become nested relation objects.
pub fn load_rows(path: &Path) -> Result<Vec<Row>, TVError> {
    let file_info = get_file_info(path.to_path_buf())?;
    debug!("Loading {:?}", file_info);
    let start_time = Instant::now();

    let rows = match file_info.file_type {
        FileType::JSON => load_json(&file_info.path)?,
        FileType::CSV => rows_from_frame(load_csv(&file_info.path)?)?,
        FileType::PARQUET => rows_from_frame(load_parquet(&file_info.path)?)?,
        FileType::ARROW => rows_from_frame(load_arrow(&file_info.path)?)?,
    };

    info!(
        "Loaded {} rows ({} bytes) in {}ms ...",
        rows.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(rows)
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

/// Accepts a top level array of objects. Anything else counts as no data.
fn load_json(path: &Path) -> Result<Vec<Row>, TVError> {
    let reader = BufReader::new(File::open(path)?);
    let root: Value = serde_json::from_reader(reader)?;
    Ok(rows_from_json(root))
}

pub fn rows_from_json(root: Value) -> Vec<Row> {
    match root {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                Value::Object(row) => Some(row),
                other => {
                    warn!("Skipping record {idx}, not an object: {other}");
                    None
                }
            })
            .collect(),
        other => {
            warn!("Expected an array of records, got {}", kind_of(&other));
            Vec::new()
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn rows_from_frame(frame: LazyFrame) -> Result<Vec<Row>, TVError> {
    let df = Arc::new(frame.collect()?);

    // Each column is decoded in its own rayon task.
    let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let mut rows = Vec::with_capacity(df.height());
    for ridx in 0..df.height() {
        let mut row = Row::new();
        for (name, values) in columns.iter() {
            insert_path(&mut row, name, values[ridx].clone());
        }
        collapse_empty_relations(&mut row);
        rows.push(row);
    }
    Ok(rows)
}

fn is_integer_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn is_float_type(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<Value>), PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let mut data = Vec::with_capacity(series.len());

    for value in series.into_iter() {
        let value = match value {
            None => Value::Null,
            Some(s) => typed_value(s, &original_dtype),
        };
        data.push(value);
    }
    Ok((col_name.to_string(), data))
}

fn typed_value(text: &str, dtype: &DataType) -> Value {
    if is_integer_type(dtype) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(u) = text.parse::<u64>() {
            return Value::Number(u.into());
        }
    }
    if is_float_type(dtype) {
        return text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if matches!(dtype, DataType::Boolean) {
        match text {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    }
    Value::String(text.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatName {
    Text,
    Date,
    Datetime,
    Currency,
    Badge,
    DueStatus,
}

/// One entry of a column configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub key: String,
    pub label: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub full_name: bool,
    #[serde(default)]
    pub relation: bool,
    pub format: Option<FormatName>,
    pub pattern: Option<String>,
    pub currency: Option<String>,
    pub filterable: Option<bool>,
    pub searchable: Option<bool>,
    pub exportable: Option<bool>,
    pub sortable: Option<bool>,
}

impl ColumnConfig {
    pub fn into_descriptor(self, config: &TVConfig) -> Result<ColumnDescriptor, TVError> {
        if self.key.trim().is_empty() {
            return Err(TVError::InvalidColumnConfig("empty column key".into()));
        }
        let accessor_count =
            self.path.is_some() as u8 + self.full_name as u8 + self.relation as u8;
        if accessor_count > 1 {
            return Err(TVError::InvalidColumnConfig(format!(
                "column {} sets more than one of path, full_name and relation",
                self.key
            )));
        }

        let label = self.label.clone().unwrap_or_else(|| humanize(&self.key));
        let mut column = ColumnDescriptor::new(self.key.clone(), label);
        if let Some(path) = self.path {
            column = column.path(path);
        } else if self.full_name {
            column = column.accessor(Accessor::FullName);
        } else if self.relation {
            column = column.accessor(Accessor::relation(&self.key));
        }

        let format = match self.format {
            None | Some(FormatName::Text) => Format::Plain,
            Some(FormatName::Date) => {
                Format::Date(self.pattern.unwrap_or_else(|| config.date_format.clone()))
            }
            Some(FormatName::Datetime) => Format::DateTime(
                self.pattern
                    .unwrap_or_else(|| format!("{} %H:%M", config.date_format)),
            ),
            Some(FormatName::Currency) => {
                Format::Currency(self.currency.unwrap_or_else(|| "$".to_string()))
            }
            Some(FormatName::Badge) => Format::Badge,
            Some(FormatName::DueStatus) => Format::DueStatus(config.due_soon_days),
        };

        let mut column = column.format(format);
        if let Some(filterable) = self.filterable {
            column = column.filterable(filterable);
        }
        if let Some(searchable) = self.searchable {
            column = column.searchable(searchable);
        }
        if let Some(exportable) = self.exportable {
            column = column.exportable(exportable);
        }
        if let Some(sortable) = self.sortable {
            column = column.sortable(sortable);
        }
        Ok(column)
    }
}

pub fn parse_column_config(text: &str, config: &TVConfig) -> Result<Vec<ColumnDescriptor>, TVError> {
    let entries: Vec<ColumnConfig> = serde_json::from_str(text)
        .map_err(|e| TVError::InvalidColumnConfig(e.to_string()))?;
    if entries.is_empty() {
        return Err(TVError::InvalidColumnConfig("no columns configured".into()));
    }
    entries
        .into_iter()
        .map(|entry| entry.into_descriptor(config))
        .collect()
}

pub fn load_column_config(path: &Path, config: &TVConfig) -> Result<Vec<ColumnDescriptor>, TVError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    let columns = parse_column_config(&text, config)?;
    info!("Loaded {} column definitions from {}", columns.len(), path.display());
    Ok(columns)
}

/// Columns for data without a configuration: one filterable column per key of
/// the first record, relations shown through their name. Scalar values are
/// read directly, even under a relation name like `department`.
pub fn infer_columns(rows: &[Row], config: &TVConfig) -> Vec<ColumnDescriptor> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    first
        .iter()
        .map(|(key, value)| {
            // First non null value of the key decides between plain field and relation.
            let sample = rows
                .iter()
                .filter_map(|row| row.get(key))
                .find(|v| !v.is_null())
                .unwrap_or(value);
            let column = ColumnDescriptor::new(key.clone(), humanize(key)).filterable(true);
            let column = match sample {
                Value::Object(relation) => {
                    if let Some(field) = ["name", "username", "title"]
                        .iter()
                        .find(|field| relation.contains_key(**field))
                    {
                        column.path(format!("{key}.{field}"))
                    } else if relation.contains_key("first_name") {
                        column.accessor(Accessor::FullName)
                    } else {
                        column
                    }
                }
                Value::Null => column.accessor(Accessor::relation(key)),
                _ => column,
            };
            if key.ends_with("_at") || key.ends_with("_date") {
                column.format(Format::Date(config.date_format.clone()))
            } else {
                column
            }
        })
        .collect()
}

/// `created_at` -> `Created At`
pub fn humanize(key: &str) -> String {
    key.split(['_', '.'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_types_by_extension() {
        assert_eq!(detect_file_type(Path::new("a.CSV")).unwrap(), FileType::CSV);
        assert_eq!(detect_file_type(Path::new("a.pq")).unwrap(), FileType::PARQUET);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::ARROW);
        assert_eq!(detect_file_type(Path::new("a.json")).unwrap(), FileType::JSON);
        assert!(matches!(detect_file_type(Path::new("a.xlsx")), Err(TVError::UnknownFileType)));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            get_file_info(PathBuf::from("does/not/exist.csv")),
            Err(TVError::FileNotFound)
        ));
    }

    #[test]
    fn json_root_must_be_an_array() {
        assert!(rows_from_json(json!({"rows": []})).is_empty());
        assert!(rows_from_json(Value::Null).is_empty());
        let rows = rows_from_json(json!([{"a": 1}, 5, {"a": 2}]));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn typed_values_follow_dtype() {
        assert_eq!(typed_value("12", &DataType::Int64), json!(12));
        assert_eq!(typed_value("1.5", &DataType::Float64), json!(1.5));
        assert_eq!(typed_value("true", &DataType::Boolean), json!(true));
        assert_eq!(typed_value("12", &DataType::String), json!("12"));
    }

    #[test]
    fn column_config_entries() {
        let config = TVConfig::default();
        let columns = parse_column_config(
            r#"[
                {"key": "name", "filterable": true},
                {"key": "company", "relation": true},
                {"key": "owner", "path": "owner.email", "label": "Owner"},
                {"key": "created_at", "format": "date", "exportable": false}
            ]"#,
            &config,
        )
        .unwrap();
        assert_eq!(columns.len(), 4);
        assert!(columns[0].is_filterable());
        assert_eq!(columns[1].get_label(), "Company");
        assert_eq!(columns[2].direct_key(), None);
        assert_eq!(columns[3].get_label(), "Created At");
        assert!(!columns[3].is_exportable());
    }

    #[test]
    fn column_config_rejects_conflicts() {
        let config = TVConfig::default();
        let err = parse_column_config(r#"[{"key": "a", "path": "a.b", "full_name": true}]"#, &config);
        assert!(matches!(err, Err(TVError::InvalidColumnConfig(_))));
        let err = parse_column_config(r#"[{"key": "a", "colour": "red"}]"#, &config);
        assert!(matches!(err, Err(TVError::InvalidColumnConfig(_))));
        let err = parse_column_config("[]", &config);
        assert!(matches!(err, Err(TVError::InvalidColumnConfig(_))));
    }

    #[test]
    fn inferred_columns_follow_first_row() {
        let rows = rows_from_json(json!([{
            "name": "Pump",
            "company": {"id": 1, "name": "Acme"},
            "supervisor": {"first_name": "Ada", "last_name": "L"},
            "created_at": "2024-01-01"
        }]));
        let columns = infer_columns(&rows, &TVConfig::default());
        let keys: Vec<&str> = columns.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["name", "company", "supervisor", "created_at"]);
        assert_eq!(columns[1].resolve(&rows[0]), json!("Acme"));
        assert_eq!(columns[2].resolve(&rows[0]), json!("Ada L"));
        assert!(columns.iter().all(|c| c.is_filterable()));
    }

    #[test]
    fn relation_names_holding_text_stay_plain() {
        let rows = rows_from_json(json!([
            {"name": "Pump", "department": "Finance", "user": null},
            {"name": "Valve", "department": "Ops", "user": "kim"},
        ]));
        let columns = infer_columns(&rows, &TVConfig::default());
        assert_eq!(columns[1].direct_key(), Some("department"));
        assert_eq!(columns[1].display_text(&rows[0]), "Finance");
        assert_eq!(columns[2].display_text(&rows[1]), "kim");
        assert_eq!(columns[2].display_text(&rows[0]), "-");
    }

    #[test]
    fn humanized_labels() {
        assert_eq!(humanize("created_at"), "Created At");
        assert_eq!(humanize("company.name"), "Company Name");
    }
}
