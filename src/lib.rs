//! Generic tabular view engine.
//!
//! Feed a [`TableEngine`] rows and [`ColumnDescriptor`]s, drive it with a
//! [`QueryState`] and it yields the page to show (search, per column filters,
//! sorting, pagination) or a csv export of the whole filtered set.

pub mod column;
pub mod domain;
pub mod engine;
pub mod export;
pub mod loader;
pub mod pagination;
pub mod query;
pub mod render;
pub mod row;
pub mod schedule;

pub use column::{Accessor, ColumnDescriptor, Format};
pub use domain::{TVConfig, TVError};
pub use engine::{PageView, TableActions, TableEngine, TableProps, TableSnapshot};
pub use export::{CsvExport, export_csv};
pub use query::{PageSize, QueryState, Sort, SortDirection};
pub use render::Cell;
pub use row::Row;
