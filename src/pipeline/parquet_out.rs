use crate::error::Result;
use arrow_array::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;

/// Encode `batch` as a single GZIP-compressed Parquet file held in memory.
pub fn encode_parquet(batch: &RecordBatch) -> Result<Vec<u8>> {
    let props = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::default()))
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RentalDataset;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::file::reader::FileReader;
    use parquet::file::serialized_reader::SerializedFileReader;

    fn sample_batch() -> RecordBatch {
        let csv = concat!(
            "price,district,url\n",
            "\"S$ 3,200/mo\",Raffles Place,https://www.99.co/a-1\n",
            ",Orchard,https://www.99.co/b-2\n"
        );
        RentalDataset::from_csv(csv.as_bytes())
            .unwrap()
            .to_record_batch()
            .unwrap()
    }

    #[test]
    fn test_encode_is_readable() {
        let bytes = encode_parquet(&sample_batch()).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
        assert_eq!(batches[0].schema().field(0).name(), "price");
        assert_eq!(batches[0].num_columns(), 3);
    }

    #[test]
    fn test_columns_are_gzip_compressed() {
        let bytes = encode_parquet(&sample_batch()).unwrap();
        let reader = SerializedFileReader::new(bytes::Bytes::from(bytes)).unwrap();
        let row_group = reader.metadata().row_group(0);
        for column in row_group.columns() {
            assert!(matches!(column.compression(), Compression::GZIP(_)));
        }
    }
}
