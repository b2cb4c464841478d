//! In-memory tables and their on-disk representations.
//!
//! Every processed or curated table is a [`Table`]: an ordered list of typed
//! columns plus row-major cells. Domain rows convert to and from tables through
//! the [`Record`] trait, usually generated with the [`record!`] macro. Tables
//! are written as parquet or CSV depending on [`OutputFormat`].

pub mod csv_store;
pub mod manifest;
pub mod parquet_store;
pub mod raw;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::error::Result;

/// Physical type of a table column. All columns are nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Parses a delimited-text cell according to the column kind.
    /// Empty cells and unparseable numbers are null.
    pub fn parse(cell: &str, kind: ColumnKind) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match kind {
            ColumnKind::Int => crate::pipeline::processing::normalize::ids::coerce_id(cell)
                .map(Value::Int)
                .unwrap_or(Value::Null),
            ColumnKind::Float => crate::pipeline::processing::normalize::ids::coerce_f64(cell)
                .map(Value::Float)
                .unwrap_or(Value::Null),
            ColumnKind::Text => Value::Text(cell.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_records<R: Record>(records: &[R]) -> Self {
        let mut table = Table::new(R::TABLE, R::schema());
        table.rows = records.iter().map(Record::to_row).collect();
        table
    }

    /// Converts rows back into records; rows missing a required cell are skipped.
    pub fn to_records<R: Record>(&self) -> Vec<R> {
        let positions: Vec<Option<usize>> = R::schema()
            .iter()
            .map(|spec| self.column_index(&spec.name))
            .collect();
        let null = Value::Null;
        self.rows
            .iter()
            .filter_map(|row| {
                let cells: Vec<&Value> = positions
                    .iter()
                    .map(|pos| pos.and_then(|i| row.get(i)).unwrap_or(&null))
                    .collect();
                R::from_cells(&cells)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Cells of one column; empty when the column does not exist.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().map(|row| &row[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Appends null columns for every name not already present.
    ///
    /// Returns the names from `required` that were missing, so callers can
    /// report a broken contract without failing.
    pub fn ensure_columns(
        &mut self,
        required: &[ColumnSpec],
        optional: &[ColumnSpec],
    ) -> Vec<String> {
        let missing_required: Vec<String> = required
            .iter()
            .filter(|spec| self.column_index(&spec.name).is_none())
            .map(|spec| spec.name.clone())
            .collect();
        for spec in required.iter().chain(optional) {
            if self.column_index(&spec.name).is_none() {
                self.columns.push(spec.clone());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
            }
        }
        missing_required
    }
}

/// Conversion between a single cell and a Rust field type.
pub trait Cell: Sized {
    const KIND: ColumnKind;

    fn to_value(&self) -> Value;

    /// `None` means the cell cannot populate this field.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Cell for i64 {
    const KIND: ColumnKind = ColumnKind::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl Cell for f64 {
    const KIND: ColumnKind = ColumnKind::Float;

    fn to_value(&self) -> Value {
        if self.is_finite() {
            Value::Float(*self)
        } else {
            Value::Null
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl Cell for String {
    const KIND: ColumnKind = ColumnKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl<T: Cell> Cell for Option<T> {
    const KIND: ColumnKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            Some(T::from_value(value))
        }
    }
}

/// A typed row of a named table.
pub trait Record: Sized {
    const TABLE: &'static str;

    fn schema() -> Vec<ColumnSpec>;

    fn to_row(&self) -> Vec<Value>;

    /// Builds a record from cells aligned with [`Record::schema`].
    fn from_cells(cells: &[&Value]) -> Option<Self>;
}

/// Declares a table row struct together with its [`Record`] implementation.
/// Column names and order follow the field declarations.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident => $table:tt {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $fty:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $fty,
            )+
        }

        impl $crate::pipeline::storage::Record for $name {
            const TABLE: &'static str = $table;

            fn schema() -> Vec<$crate::pipeline::storage::ColumnSpec> {
                vec![$(
                    $crate::pipeline::storage::ColumnSpec::new(
                        stringify!($field),
                        <$fty as $crate::pipeline::storage::Cell>::KIND,
                    )
                ),+]
            }

            fn to_row(&self) -> Vec<$crate::pipeline::storage::Value> {
                vec![$(
                    $crate::pipeline::storage::Cell::to_value(&self.$field)
                ),+]
            }

            fn from_cells(cells: &[&$crate::pipeline::storage::Value]) -> Option<Self> {
                let mut cells = cells.iter();
                Some(Self {
                    $(
                        $field: <$fty as $crate::pipeline::storage::Cell>::from_value(
                            cells.next()?,
                        )?,
                    )+
                })
            }
        }
    };
}

pub fn table_path(dir: &Path, name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", name, format.extension()))
}

/// Writes `table` into `dir` as `<name>.<ext>`, overwriting any previous file.
pub fn write_table(table: &Table, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = table_path(dir, &table.name, format);
    match format {
        OutputFormat::Parquet => parquet_store::write(table, &path)?,
        OutputFormat::Csv => csv_store::write(table, &path)?,
    }
    Ok(path)
}

/// Reads `<name>.<ext>` from `dir`, projected onto `schema`.
/// Columns absent from the file come back as null columns.
pub fn read_table(
    dir: &Path,
    name: &str,
    schema: &[ColumnSpec],
    format: OutputFormat,
) -> Result<Table> {
    let path = table_path(dir, name, format);
    match format {
        OutputFormat::Parquet => parquet_store::read(&path, name, schema),
        OutputFormat::Csv => csv_store::read(&path, name, schema),
    }
}

/// Column names stored in `<name>.<ext>`, in file order.
pub fn table_columns(dir: &Path, name: &str, format: OutputFormat) -> Result<Vec<String>> {
    let path = table_path(dir, name, format);
    match format {
        OutputFormat::Parquet => parquet_store::columns(&path),
        OutputFormat::Csv => csv_store::columns(&path),
    }
}

pub fn read_records<R: Record>(dir: &Path, format: OutputFormat) -> Result<Vec<R>> {
    let table = read_table(dir, R::TABLE, &R::schema(), format)?;
    Ok(table.to_records())
}
