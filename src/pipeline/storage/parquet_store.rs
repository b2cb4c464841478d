use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::types::{Type, TypePtr};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::{ColumnKind, ColumnSpec, Table, Value};
use crate::error::Result;

// Every column is OPTIONAL so nulls survive the round trip
fn build_schema(columns: &[ColumnSpec]) -> Result<TypePtr> {
    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        let field = match column.kind {
            ColumnKind::Int => Type::primitive_type_builder(&column.name, PhysicalType::INT64)
                .with_repetition(Repetition::OPTIONAL)
                .build()?,
            ColumnKind::Float => Type::primitive_type_builder(&column.name, PhysicalType::DOUBLE)
                .with_repetition(Repetition::OPTIONAL)
                .build()?,
            ColumnKind::Text => {
                Type::primitive_type_builder(&column.name, PhysicalType::BYTE_ARRAY)
                    .with_repetition(Repetition::OPTIONAL)
                    .with_logical_type(Some(LogicalType::String))
                    .build()?
            }
        };
        fields.push(Arc::new(field));
    }
    Ok(Arc::new(
        Type::group_type_builder("schema")
            .with_fields(fields)
            .build()?,
    ))
}

/// Definition levels for one optional column: 1 for a writable value, 0 for null.
fn definition_levels(table: &Table, col: usize) -> Vec<i16> {
    let kind = table.columns[col].kind;
    table
        .rows
        .iter()
        .map(|row| {
            let present = match kind {
                ColumnKind::Int => row[col].as_i64().is_some(),
                ColumnKind::Float => row[col].as_f64().is_some(),
                ColumnKind::Text => !row[col].is_null(),
            };
            i16::from(present)
        })
        .collect()
}

pub fn write(table: &Table, path: &Path) -> Result<()> {
    let schema = build_schema(&table.columns)?;
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    if !table.rows.is_empty() {
        let mut row_group = writer.next_row_group()?;
        let mut col_index = 0;
        while let Some(mut column) = row_group.next_column()? {
            let levels = definition_levels(table, col_index);
            match table.columns[col_index].kind {
                ColumnKind::Int => {
                    let values: Vec<i64> = table
                        .rows
                        .iter()
                        .filter_map(|row| row[col_index].as_i64())
                        .collect();
                    column
                        .typed::<Int64Type>()
                        .write_batch(&values, Some(levels.as_slice()), None)?;
                }
                ColumnKind::Float => {
                    let values: Vec<f64> = table
                        .rows
                        .iter()
                        .filter_map(|row| row[col_index].as_f64())
                        .collect();
                    column
                        .typed::<DoubleType>()
                        .write_batch(&values, Some(levels.as_slice()), None)?;
                }
                ColumnKind::Text => {
                    let values: Vec<ByteArray> = table
                        .rows
                        .iter()
                        .filter(|row| !row[col_index].is_null())
                        .map(|row| ByteArray::from(row[col_index].to_string().as_str()))
                        .collect();
                    column
                        .typed::<ByteArrayType>()
                        .write_batch(&values, Some(levels.as_slice()), None)?;
                }
            }
            column.close()?;
            col_index += 1;
        }
        row_group.close()?;
    }
    writer.close()?;
    Ok(())
}

fn field_to_value(field: &Field, kind: ColumnKind) -> Value {
    let value = match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Int(i64::from(*b)),
        Field::Byte(v) => Value::Int(i64::from(*v)),
        Field::Short(v) => Value::Int(i64::from(*v)),
        Field::Int(v) => Value::Int(i64::from(*v)),
        Field::Long(v) => Value::Int(*v),
        Field::UByte(v) => Value::Int(i64::from(*v)),
        Field::UShort(v) => Value::Int(i64::from(*v)),
        Field::UInt(v) => Value::Int(i64::from(*v)),
        Field::Float(v) => Value::Float(f64::from(*v)),
        Field::Double(v) => Value::Float(*v),
        Field::Str(s) => Value::Text(s.clone()),
        _ => Value::Null,
    };
    match (kind, value) {
        (_, Value::Null) => Value::Null,
        (ColumnKind::Int, v) => v.as_i64().map(Value::Int).unwrap_or(Value::Null),
        (ColumnKind::Float, v) => v.as_f64().map(Value::Float).unwrap_or(Value::Null),
        (ColumnKind::Text, v) => Value::Text(v.to_string()),
    }
}

pub fn columns(path: &Path) -> Result<Vec<String>> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let schema = reader.metadata().file_metadata().schema_descr_ptr();
    Ok(schema.columns().iter().map(|c| c.name().to_string()).collect())
}

pub fn read(path: &Path, name: &str, schema: &[ColumnSpec]) -> Result<Table> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let wanted: HashMap<&str, usize> = schema
        .iter()
        .enumerate()
        .map(|(i, spec)| (spec.name.as_str(), i))
        .collect();

    let mut table = Table::new(name, schema.to_vec());
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut cells = vec![Value::Null; schema.len()];
        for (column, field) in row.get_column_iter() {
            if let Some(&i) = wanted.get(column.as_str()) {
                cells[i] = field_to_value(field, schema[i].kind);
            }
        }
        table.rows.push(cells);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_table() -> Table {
        let mut table = Table::new(
            "dim_sample",
            vec![
                ColumnSpec::new("movie_id", ColumnKind::Int),
                ColumnSpec::new("title", ColumnKind::Text),
                ColumnSpec::new("roi", ColumnKind::Float),
            ],
        );
        table.rows.push(vec![
            Value::Int(862),
            Value::Text("Toy Story".into()),
            Value::Float(12.45),
        ]);
        table.rows.push(vec![Value::Int(8844), Value::Null, Value::Null]);
        table
    }

    #[test]
    fn test_parquet_round_trip_preserves_nulls_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dim_sample.parquet");
        let table = sample_table();
        write(&table, &path).unwrap();

        let read_back = read(&path, "dim_sample", &table.columns).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_parquet_empty_table_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        let table = Table::new("empty", vec![ColumnSpec::new("x", ColumnKind::Int)]);
        write(&table, &path).unwrap();
        let read_back = read(&path, "empty", &table.columns).unwrap();
        assert!(read_back.is_empty());
    }
}
