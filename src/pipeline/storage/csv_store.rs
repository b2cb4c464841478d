use std::path::Path;

use super::{ColumnSpec, Table, Value};
use crate::error::Result;

/// Writes a header row followed by one record per row; nulls become empty cells.
pub fn write(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Value::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn columns(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

pub fn read(path: &Path, name: &str, schema: &[ColumnSpec]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let positions: Vec<Option<usize>> = schema
        .iter()
        .map(|spec| headers.iter().position(|h| h == spec.name))
        .collect();

    let mut table = Table::new(name, schema.to_vec());
    for record in reader.records() {
        let record = record?;
        let row = schema
            .iter()
            .zip(&positions)
            .map(|(spec, pos)| match pos.and_then(|i| record.get(i)) {
                Some(cell) => Value::parse(cell, spec.kind),
                None => Value::Null,
            })
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::ColumnKind;
    use tempfile::tempdir;

    #[test]
    fn test_csv_read_back_projects_schema_and_keeps_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut table = Table::new(
            "t",
            vec![
                ColumnSpec::new("id", ColumnKind::Int),
                ColumnSpec::new("name", ColumnKind::Text),
                ColumnSpec::new("ratio", ColumnKind::Float),
            ],
        );
        table.rows.push(vec![
            Value::Int(1),
            Value::Text("Toy Story, the movie".into()),
            Value::Float(2.5),
        ]);
        table.rows.push(vec![Value::Int(2), Value::Null, Value::Null]);
        write(&table, &path).unwrap();

        let schema = vec![
            ColumnSpec::new("ratio", ColumnKind::Float),
            ColumnSpec::new("id", ColumnKind::Int),
            ColumnSpec::new("missing", ColumnKind::Text),
        ];
        let read_back = read(&path, "t", &schema).unwrap();
        assert_eq!(
            read_back.rows,
            vec![
                vec![Value::Float(2.5), Value::Int(1), Value::Null],
                vec![Value::Null, Value::Int(2), Value::Null],
            ]
        );
    }
}
