//! In-memory rental table and its CSV / Arrow representations.

use crate::error::Result;
use crate::types::{ListingRecord, CORE_COLUMNS};
use arrow_array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow_schema::{ArrowError, DataType, Field, Schema};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Rows of optional strings under an ordered column set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RentalDataset {
    /// An empty dataset with only the core columns
    pub fn empty() -> Self {
        Self {
            columns: CORE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Core columns first, then detail columns in first-seen order.
    pub fn from_records(records: &[ListingRecord]) -> Self {
        let mut dataset = Self::empty();
        for record in records {
            for (key, _) in &record.fields.details {
                if !dataset.columns.contains(key) {
                    dataset.columns.push(key.clone());
                }
            }
        }
        dataset.rows = records
            .iter()
            .map(|r| dataset.columns.iter().map(|c| r.value(c)).collect())
            .collect();
        dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Append `other`'s rows, widening the column set where needed.
    pub fn merge(&mut self, other: RentalDataset) {
        for column in &other.columns {
            if !self.columns.contains(column) {
                self.columns.push(column.clone());
            }
        }
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }

        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.columns.iter().position(|s| s == c))
            .collect();
        for row in other.rows {
            let mut widened = vec![None; width];
            for (value, &idx) in row.into_iter().zip(&mapping) {
                widened[idx] = value;
            }
            self.rows.push(widened);
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = (0..self.columns.len())
            .map(|idx| {
                Arc::new(StringArray::from(
                    self.rows
                        .iter()
                        .map(|row| row[idx].as_deref())
                        .collect::<Vec<_>>(),
                )) as ArrayRef
            })
            .collect();
        Ok(RecordBatch::try_new(Arc::new(self.schema()), arrays)?)
    }

    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let columns: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let mut arrays = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            let array = batch
                .column(idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    ArrowError::CastError(format!("column '{}' is not Utf8", name))
                })?;
            arrays.push(array);
        }

        let rows = (0..batch.num_rows())
            .map(|row| {
                arrays
                    .iter()
                    .map(|a| (!a.is_null(row)).then(|| a.value(row).to_string()))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let batch = self.to_record_batch()?;
        let mut buf = Vec::new();
        {
            let mut writer = arrow_csv::WriterBuilder::new()
                .with_header(true)
                .build(&mut buf);
            writer.write(&batch)?;
        }
        Ok(buf)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_csv_bytes()?)?;
        Ok(())
    }

    /// Parse CSV with a header row; every column is read as nullable Utf8, empty cells as null.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let (inferred, _) = arrow_csv::reader::Format::default()
            .with_header(true)
            .infer_schema(Cursor::new(bytes), Some(0))?;
        let schema = Schema::new(
            inferred
                .fields()
                .iter()
                .map(|f| Field::new(f.name(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        );
        let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        let reader = arrow_csv::ReaderBuilder::new(Arc::new(schema))
            .with_header(true)
            .build(Cursor::new(bytes))?;

        let mut dataset = Self {
            columns,
            rows: Vec::new(),
        };
        for batch in reader {
            let part = Self::from_record_batch(&batch?)?;
            dataset.rows.extend(part.rows);
        }
        Ok(dataset)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::from_csv(&fs::read(path)?)
    }
}

/// Fail unless every core column is present in `schema`.
pub fn check_core_columns(schema: &Schema) -> Result<()> {
    let missing: Vec<&str> = CORE_COLUMNS
        .iter()
        .copied()
        .filter(|c| schema.field_with_name(c).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArrowError::SchemaError(format!("missing columns: {}", missing.join(", "))).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ListingFields;

    fn record(id: &str, details: &[(&str, &str)]) -> ListingRecord {
        ListingRecord {
            fields: ListingFields {
                price: format!("S$ {},000 /mo", id),
                address: Some("1 Raffles Place, Singapore".into()),
                facilities: Some(vec!["Pool".into()]),
                details: details
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            },
            property_name: format!("Listing {}", id),
            district: "Boat Quay / Raffles Place / Marina".into(),
            listing_id: id.into(),
            url: format!("https://www.99.co/x-{}", id),
        }
    }

    #[test]
    fn test_columns_core_then_details() {
        let ds = RentalDataset::from_records(&[
            record("1", &[("tenure", "Freehold")]),
            record("2", &[("floor_level", "High"), ("tenure", "99-year")]),
        ]);
        assert_eq!(&ds.columns()[..14], &CORE_COLUMNS.map(String::from)[..]);
        assert_eq!(&ds.columns()[14..], &["tenure".to_string(), "floor_level".to_string()]);
        assert_eq!(ds.get(0, "floor_level"), None);
        assert_eq!(ds.get(1, "floor_level"), Some("High"));
        assert_eq!(ds.get(0, "bedroom"), None);
    }

    #[test]
    fn test_csv_round_trip_keeps_nulls_and_quotes() {
        let ds = RentalDataset::from_records(&[record("1", &[("tenure", "Freehold")])]);
        let bytes = ds.to_csv_bytes().unwrap();
        let back = RentalDataset::from_csv(&bytes).unwrap();
        assert_eq!(back, ds);
        assert_eq!(back.get(0, "address"), Some("1 Raffles Place, Singapore"));
        assert_eq!(back.get(0, "facilities"), Some(r#"["Pool"]"#));
    }

    #[test]
    fn test_merge_widens_columns() {
        let mut first = RentalDataset::from_records(&[record("1", &[("tenure", "Freehold")])]);
        let second = RentalDataset::from_records(&[record("2", &[("furnishing", "Fully")])]);
        first.merge(second);

        assert_eq!(first.len(), 2);
        assert_eq!(first.columns().len(), 16);
        assert_eq!(first.get(0, "furnishing"), None);
        assert_eq!(first.get(1, "furnishing"), Some("Fully"));
        assert_eq!(first.get(1, "tenure"), None);
        assert_eq!(first.get(1, "listing_id"), Some("2"));
    }

    #[test]
    fn test_check_core_columns() {
        assert!(check_core_columns(&RentalDataset::empty().schema()).is_ok());
        let partial = Schema::new(vec![Field::new("price", DataType::Utf8, true)]);
        assert!(check_core_columns(&partial).is_err());
    }
}
