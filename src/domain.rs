use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::query::PageSize;
use crate::schedule::DEFAULT_DUE_SOON_DAYS;

// Crate wide error type. The engine itself never fails, everything fallible sits around it.
#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidColumnConfig(String),
    ExportFailed(String),
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "io error: {e}"),
            TVError::PolarsError(e) => write!(f, "failed to read data: {e}"),
            TVError::JsonError(e) => write!(f, "invalid json: {e}"),
            TVError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            TVError::FileNotFound => write!(f, "file not found"),
            TVError::PermissionDenied => write!(f, "permission denied"),
            TVError::UnknownFileType => write!(f, "unknown file type"),
            TVError::InvalidColumnConfig(reason) => write!(f, "invalid column config: {reason}"),
            TVError::ExportFailed(reason) => write!(f, "export failed: {reason}"),
        }
    }
}

impl std::error::Error for TVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TVError::IoError(e) => Some(e),
            TVError::PolarsError(e) => Some(e),
            TVError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        TVError::IoError(err)
    }
}

impl From<PolarsError> for TVError {
    fn from(err: PolarsError) -> Self {
        TVError::PolarsError(err)
    }
}

impl From<serde_json::Error> for TVError {
    fn from(err: serde_json::Error) -> Self {
        TVError::JsonError(err)
    }
}

#[derive(Debug, Clone)]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub title: String,
    pub add_button_text: String,
    pub page_size: PageSize,
    pub export_dir: PathBuf,
    pub date_format: String,
    pub due_soon_days: i64,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            title: "Organization Management".to_string(),
            add_button_text: "Add New".to_string(),
            page_size: PageSize::default(),
            export_dir: PathBuf::from("."),
            date_format: "%Y-%m-%d".to_string(),
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    Search,
    Filter,
    NextFilterColumn,
    PrevFilterColumn,
    ClearFilters,
    SortAscending,
    SortDescending,
    Export,
    Edit,
    Delete,
    Add,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  j / Down        next row
  k / Up          previous row
  l / Right / n   next page
  h / Left / p    previous page
  g / Home        first page
  G / End         last page
  z               cycle page size (5, 10, 20, 50)

Query
  /               search all searchable columns
  f               filter the selected column
  Tab / BackTab   select column
  c               clear search and filters
  s / S           sort ascending / descending by selected column

Records
  Enter / e       edit selected record
  a               add a record
  d               delete selected record
  y               copy selected row to clipboard
  x               export filtered rows to csv

  ?               show this help
  Esc             close popup
  q               quit";
